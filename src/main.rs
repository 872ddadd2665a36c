//! Harness CLI: drive one worker end-to-end from the command line.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use media_harness::config::{
    HarnessSettings, Role, SettingsLoader, VideoCodecType, WorkerConfig,
};
use media_harness::display;
use media_harness::resolver::ExecutableResolver;
use media_harness::supervisor::{
    HarnessError, LaunchOptions, PortAllocator, Worker,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Sendonly,
    Recvonly,
    Sendrecv,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Sendonly => Role::Sendonly,
            RoleArg::Recvonly => Role::Recvonly,
            RoleArg::Sendrecv => Role::Sendrecv,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VideoCodecArg {
    Vp8,
    Vp9,
    Av1,
    H264,
    H265,
}

impl From<VideoCodecArg> for VideoCodecType {
    fn from(arg: VideoCodecArg) -> Self {
        match arg {
            VideoCodecArg::Vp8 => VideoCodecType::Vp8,
            VideoCodecArg::Vp9 => VideoCodecType::Vp9,
            VideoCodecArg::Av1 => VideoCodecType::Av1,
            VideoCodecArg::H264 => VideoCodecType::H264,
            VideoCodecArg::H265 => VideoCodecType::H265,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "media-harness",
    about = "End-to-end test harness for the native media worker",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a harness settings file (default: .media-harness.toml).
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a worker, wait for readiness, fetch stats, and tear down.
    Run(RunArgs),
    /// Locate the worker binary without launching it.
    Resolve {
        /// Build root containing per-target output.
        #[arg(long)]
        build_root: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Signaling URL (falls back to the settings file).
    #[arg(long)]
    signaling_url: Option<String>,

    /// Channel id (generated from the configured prefix if omitted).
    #[arg(long)]
    channel_id: Option<String>,

    /// Connection role.
    #[arg(long, value_enum, default_value_t = RoleArg::Sendonly)]
    role: RoleArg,

    /// HTTP stats port (allocated from the ephemeral base if omitted).
    #[arg(long)]
    http_port: Option<u16>,

    /// Signaling metadata as a JSON object.
    #[arg(long)]
    metadata: Option<String>,

    /// Video codec.
    #[arg(long, value_enum)]
    video_codec: Option<VideoCodecArg>,

    /// Capture worker output in real time.
    #[arg(long)]
    capture: bool,

    /// Explicit worker executable, bypassing build-root resolution.
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Build root containing per-target output.
    #[arg(long)]
    build_root: Option<PathBuf>,

    /// Readiness budget in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Print a redacted diagnostics snapshot after the run.
    #[arg(long)]
    snapshot: bool,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_settings(path: Option<PathBuf>) -> HarnessSettings {
    let loader = match path {
        Some(path) => SettingsLoader::with_path(path),
        None => SettingsLoader::new(),
    };
    match loader.load() {
        Ok(settings) => settings,
        Err(e) => {
            display::print_error(&e.to_string());
            std::process::exit(2);
        }
    }
}

/// Generate a channel id from the configured prefix and a random suffix.
fn generate_channel_id(prefix: Option<&str>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix.unwrap_or("harness-"), &suffix[..8])
}

fn build_config(args: &RunArgs, settings: &HarnessSettings) -> Result<WorkerConfig, String> {
    let signaling_url = args
        .signaling_url
        .clone()
        .or_else(|| settings.signaling_url.clone())
        .ok_or("no signaling URL given (use --signaling-url or the settings file)")?;

    let channel_id = args
        .channel_id
        .clone()
        .unwrap_or_else(|| generate_channel_id(settings.channel_id_prefix.as_deref()));

    let http_port = args.http_port.unwrap_or_else(|| {
        PortAllocator::with_base(settings.port_base).next()
    });

    let mut builder = WorkerConfig::builder(signaling_url, channel_id, args.role.into())
        .http_port(http_port)
        .initial_wait(settings.initial_wait());

    if let Some(codec) = args.video_codec {
        builder = builder.video_codec_type(codec.into());
    }
    if let Some(ref metadata) = args.metadata {
        let metadata: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(metadata).map_err(|e| format!("invalid --metadata JSON: {e}"))?;
        builder = builder.metadata(metadata);
    }

    builder.build().map_err(|e| e.to_string())
}

async fn run_worker(args: RunArgs, settings: HarnessSettings) -> Result<(), ()> {
    let config = match build_config(&args, &settings) {
        Ok(config) => config,
        Err(message) => {
            display::print_error(&message);
            return Err(());
        }
    };

    let options = LaunchOptions {
        build_root: args.build_root.clone().unwrap_or_else(|| settings.build_root.clone()),
        executable: args.executable.clone(),
        binary_name: settings.binary_name.clone(),
        capture: args.capture || settings.capture,
        ready_timeout: args
            .timeout
            .map_or_else(|| settings.ready_timeout(), Duration::from_secs),
        grace: settings.grace(),
        ..Default::default()
    };

    let mut worker = match Worker::launch(config, options) {
        Ok(worker) => worker,
        Err(e) => {
            display::print_error(&e.to_string());
            return Err(());
        }
    };
    display::print_launch(&worker.config().preview_command(worker.executable()));

    let result = drive(&mut worker, args.snapshot).await;

    // Teardown runs on every exit path.
    worker.shutdown().await;
    display::print_teardown(worker.id());
    result
}

async fn drive(worker: &mut Worker, print_snapshot: bool) -> Result<(), ()> {
    match worker.wait_ready().await {
        Ok(elapsed) => display::print_ready(elapsed),
        Err(e) => {
            display::print_error(&e.to_string());
            report_failure_tails(&e);
            return Err(());
        }
    }

    match worker.stats().await {
        Ok(reports) => {
            let kinds: BTreeSet<String> = reports
                .iter()
                .filter_map(|r| r.kind().map(ToString::to_string))
                .collect();
            let kinds: Vec<String> = kinds.into_iter().collect();
            display::print_stats(reports.len(), &kinds);
        }
        Err(e) => {
            display::print_error(&e.to_string());
            return Err(());
        }
    }

    if print_snapshot {
        let snapshot = worker.snapshot();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => tracing::warn!(error = %e, "Failed to render snapshot"),
        }
    }

    Ok(())
}

fn report_failure_tails(error: &HarnessError) {
    match error {
        HarnessError::ReadinessTimeout {
            stdout_tail,
            stderr_tail,
            ..
        }
        | HarnessError::WorkerExited {
            stdout_tail,
            stderr_tail,
            ..
        } => {
            display::print_tail("stdout", stdout_tail);
            display::print_tail("stderr", stderr_tail);
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(cli.settings);

    match cli.command {
        Commands::Run(args) => {
            if run_worker(args, settings).await.is_err() {
                std::process::exit(1);
            }
        }
        Commands::Resolve { build_root } => {
            let build_root = build_root.unwrap_or_else(|| settings.build_root.clone());
            let resolver = ExecutableResolver::new(settings.binary_name.as_str());
            match resolver.resolve(&build_root) {
                Ok(resolved) => {
                    println!("{}", resolved.path.display());
                }
                Err(e) => {
                    display::print_error(&e.to_string());
                    std::process::exit(1);
                }
            }
        }
    }
}
