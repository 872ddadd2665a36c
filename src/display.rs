//! Colored CLI output for harness runs.

use chrono::Utc;
use owo_colors::OwoColorize;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Print the launch command line.
pub fn print_launch(command: &str) {
    println!(
        "{} {} {command}",
        timestamp().dimmed(),
        "[LAUNCH]".blue().bold()
    );
}

/// Print readiness confirmation.
pub fn print_ready(elapsed: std::time::Duration) {
    println!(
        "{} {} worker ready after {:.1}s",
        timestamp().dimmed(),
        "[READY]".green().bold(),
        elapsed.as_secs_f64()
    );
}

/// Print a stats retrieval summary.
pub fn print_stats(entries: usize, kinds: &[String]) {
    println!(
        "{} {} {entries} reports ({})",
        timestamp().dimmed(),
        "[STATS]".cyan().bold(),
        kinds.join(", ")
    );
}

/// Print teardown confirmation.
pub fn print_teardown(pid: Option<u32>) {
    println!(
        "{} {} worker stopped (pid {})",
        timestamp().dimmed(),
        "[DONE]".blue().bold(),
        pid.map_or_else(|| "?".to_string(), |p| p.to_string())
    );
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!(
        "{} {} {}",
        timestamp().dimmed(),
        "[ERROR]".red().bold(),
        message.red()
    );
}

/// Print a captured output tail, line by line.
pub fn print_tail(stream_name: &str, tail: &str) {
    if tail.is_empty() {
        return;
    }
    let ts = timestamp();
    for line in tail.lines() {
        eprintln!("{} {} {line}", ts.dimmed(), format!("[{stream_name}]").yellow());
    }
}
