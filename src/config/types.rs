//! Worker configuration record and validating builder.
//!
//! A [`WorkerConfig`] captures every command-line option the media worker
//! accepts. It is built once, validated, and never mutated after the worker
//! process is spawned.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default HTTP host the worker binds its stats endpoint to.
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Default bootstrap grace period before the readiness probe starts polling.
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(2);

/// Error type for configuration validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The signaling URL could not be parsed or has the wrong scheme.
    #[error("invalid signaling URL {url:?}: {reason}")]
    InvalidSignalingUrl { url: String, reason: String },
    /// The channel id was empty.
    #[error("channel id must not be empty")]
    EmptyChannelId,
    /// `http_port` was set to zero.
    #[error("http port must be greater than zero")]
    InvalidHttpPort,
    /// Video bit rate outside the worker's accepted range.
    #[error("video bit rate {0} out of range 0-30000")]
    VideoBitRateOutOfRange(u32),
    /// Audio bit rate outside the worker's accepted range.
    #[error("audio bit rate {0} out of range 0-510")]
    AudioBitRateOutOfRange(u32),
    /// Spotlight number outside the worker's accepted range.
    #[error("spotlight number {0} out of range 0-8")]
    SpotlightNumberOutOfRange(u32),
    /// Resolution is neither a known name nor `WIDTHxHEIGHT`.
    #[error("invalid resolution {0:?}")]
    InvalidResolution(String),
}

/// Connection role for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sendonly,
    Recvonly,
    Sendrecv,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sendonly => "sendonly",
            Self::Recvonly => "recvonly",
            Self::Sendrecv => "sendrecv",
        };
        f.write_str(s)
    }
}

/// Video codec selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoCodecType {
    Vp8,
    Vp9,
    Av1,
    H264,
    H265,
}

impl std::fmt::Display for VideoCodecType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Vp8 => "VP8",
            Self::Vp9 => "VP9",
            Self::Av1 => "AV1",
            Self::H264 => "H264",
            Self::H265 => "H265",
        };
        f.write_str(s)
    }
}

/// Audio codec selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AudioCodecType {
    Opus,
}

impl std::fmt::Display for AudioCodecType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OPUS")
    }
}

/// Encoder/decoder engine selection for a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecEngine {
    Internal,
    CiscoOpenh264,
    IntelVpl,
    NvidiaVideoCodec,
    AmdAmf,
    RaspiV4l2m2m,
}

impl std::fmt::Display for CodecEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Internal => "internal",
            Self::CiscoOpenh264 => "cisco_openh264",
            Self::IntelVpl => "intel_vpl",
            Self::NvidiaVideoCodec => "nvidia_video_codec",
            Self::AmdAmf => "amd_amf",
            Self::RaspiV4l2m2m => "raspi_v4l2m2m",
        };
        f.write_str(s)
    }
}

/// Degradation preference under constrained resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationPreference {
    Disabled,
    MaintainFramerate,
    MaintainResolution,
    Balanced,
}

impl std::fmt::Display for DegradationPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disabled => "disabled",
            Self::MaintainFramerate => "maintain_framerate",
            Self::MaintainResolution => "maintain_resolution",
            Self::Balanced => "balanced",
        };
        f.write_str(s)
    }
}

/// Worker log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerLogLevel {
    Verbose,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for WorkerLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Immutable worker configuration.
///
/// Built via [`WorkerConfigBuilder`]; the builder's `build()` is the single
/// validation point. Fields mirror the worker's command-line surface, so most
/// are optional and omitted entirely when unset.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerConfig {
    pub(crate) signaling_url: String,
    pub(crate) channel_id: String,
    pub(crate) role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video_codec_type: Option<VideoCodecType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) audio_codec_type: Option<AudioCodecType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) hw_mjpeg_decoder: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video_bit_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) audio_bit_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video_h264_params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video_h265_params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) spotlight: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) spotlight_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) simulcast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data_channel_signaling: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ignore_disconnect_websocket: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) proxy_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) proxy_password: Option<String>,
    pub(crate) insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) client_cert: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) client_key: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ca_cert: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) http_port: Option<u16>,
    pub(crate) http_host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) degradation_preference: Option<DegradationPreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cpu_adaptation: Option<bool>,
    pub(crate) fake_capture_device: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) audio_recording_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) audio_playout_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) openh264: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) vp8_encoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) vp8_decoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) vp9_encoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) vp9_decoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) h264_encoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) h264_decoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) h265_encoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) h265_decoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) av1_encoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) av1_decoder: Option<CodecEngine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) worker_log_level: Option<WorkerLogLevel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) extra_args: Vec<String>,
    #[serde(skip)]
    pub(crate) initial_wait: Duration,
}

impl WorkerConfig {
    /// Start building a configuration from the three required fields.
    #[must_use]
    pub fn builder(
        signaling_url: impl Into<String>,
        channel_id: impl Into<String>,
        role: Role,
    ) -> WorkerConfigBuilder {
        WorkerConfigBuilder::new(signaling_url, channel_id, role)
    }

    /// The signaling endpoint the worker connects to.
    #[must_use]
    pub fn signaling_url(&self) -> &str {
        &self.signaling_url
    }

    /// The channel id the worker joins.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// The configured role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The HTTP stats port, if one was configured.
    #[must_use]
    pub fn http_port(&self) -> Option<u16> {
        self.http_port
    }

    /// The HTTP host the stats endpoint binds to.
    #[must_use]
    pub fn http_host(&self) -> &str {
        &self.http_host
    }

    /// Bootstrap grace period before readiness polling starts.
    #[must_use]
    pub fn initial_wait(&self) -> Duration {
        self.initial_wait
    }
}

/// Builder for [`WorkerConfig`].
#[derive(Debug, Clone)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Create a new builder with the required fields.
    #[must_use]
    pub fn new(
        signaling_url: impl Into<String>,
        channel_id: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            config: WorkerConfig {
                signaling_url: signaling_url.into(),
                channel_id: channel_id.into(),
                role,
                client_id: None,
                video: None,
                audio: None,
                video_device: None,
                video_codec_type: None,
                audio_codec_type: None,
                resolution: None,
                hw_mjpeg_decoder: None,
                video_bit_rate: None,
                audio_bit_rate: None,
                video_h264_params: None,
                video_h265_params: None,
                metadata: None,
                spotlight: None,
                spotlight_number: None,
                simulcast: None,
                data_channel_signaling: None,
                ignore_disconnect_websocket: None,
                proxy_url: None,
                proxy_username: None,
                proxy_password: None,
                insecure: false,
                client_cert: None,
                client_key: None,
                ca_cert: None,
                http_port: None,
                http_host: DEFAULT_HTTP_HOST.to_string(),
                degradation_preference: None,
                cpu_adaptation: None,
                // Headless by default; real devices are opt-in.
                fake_capture_device: true,
                audio_recording_device: None,
                audio_playout_device: None,
                openh264: None,
                vp8_encoder: None,
                vp8_decoder: None,
                vp9_encoder: None,
                vp9_decoder: None,
                h264_encoder: None,
                h264_decoder: None,
                h265_encoder: None,
                h265_decoder: None,
                av1_encoder: None,
                av1_decoder: None,
                worker_log_level: None,
                extra_args: Vec::new(),
                initial_wait: DEFAULT_INITIAL_WAIT,
            },
        }
    }

    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn video(mut self, enabled: bool) -> Self {
        self.config.video = Some(enabled);
        self
    }

    #[must_use]
    pub fn audio(mut self, enabled: bool) -> Self {
        self.config.audio = Some(enabled);
        self
    }

    #[must_use]
    pub fn video_device(mut self, device: impl Into<String>) -> Self {
        self.config.video_device = Some(device.into());
        self
    }

    #[must_use]
    pub fn video_codec_type(mut self, codec: VideoCodecType) -> Self {
        self.config.video_codec_type = Some(codec);
        self
    }

    #[must_use]
    pub fn audio_codec_type(mut self, codec: AudioCodecType) -> Self {
        self.config.audio_codec_type = Some(codec);
        self
    }

    /// Set the capture resolution: `QVGA`, `VGA`, `HD`, `FHD`, `4K`, or
    /// `WIDTHxHEIGHT`.
    #[must_use]
    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.config.resolution = Some(resolution.into());
        self
    }

    #[must_use]
    pub fn hw_mjpeg_decoder(mut self, enabled: bool) -> Self {
        self.config.hw_mjpeg_decoder = Some(enabled);
        self
    }

    /// Video bit rate in kbps (0-30000).
    #[must_use]
    pub fn video_bit_rate(mut self, kbps: u32) -> Self {
        self.config.video_bit_rate = Some(kbps);
        self
    }

    /// Audio bit rate in kbps (0-510).
    #[must_use]
    pub fn audio_bit_rate(mut self, kbps: u32) -> Self {
        self.config.audio_bit_rate = Some(kbps);
        self
    }

    #[must_use]
    pub fn video_h264_params(mut self, params: Map<String, Value>) -> Self {
        self.config.video_h264_params = Some(params);
        self
    }

    #[must_use]
    pub fn video_h265_params(mut self, params: Map<String, Value>) -> Self {
        self.config.video_h265_params = Some(params);
        self
    }

    /// Signaling metadata, passed to the worker as one JSON argument.
    #[must_use]
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn spotlight(mut self, enabled: bool) -> Self {
        self.config.spotlight = Some(enabled);
        self
    }

    #[must_use]
    pub fn spotlight_number(mut self, n: u32) -> Self {
        self.config.spotlight_number = Some(n);
        self
    }

    #[must_use]
    pub fn simulcast(mut self, enabled: bool) -> Self {
        self.config.simulcast = Some(enabled);
        self
    }

    #[must_use]
    pub fn data_channel_signaling(mut self, enabled: bool) -> Self {
        self.config.data_channel_signaling = Some(enabled);
        self
    }

    #[must_use]
    pub fn ignore_disconnect_websocket(mut self, enabled: bool) -> Self {
        self.config.ignore_disconnect_websocket = Some(enabled);
        self
    }

    #[must_use]
    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.config.proxy_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn proxy_username(mut self, username: impl Into<String>) -> Self {
        self.config.proxy_username = Some(username.into());
        self
    }

    #[must_use]
    pub fn proxy_password(mut self, password: impl Into<String>) -> Self {
        self.config.proxy_password = Some(password.into());
        self
    }

    /// Skip TLS certificate verification.
    #[must_use]
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.config.insecure = insecure;
        self
    }

    #[must_use]
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_cert = Some(path.into());
        self
    }

    #[must_use]
    pub fn client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_key = Some(path.into());
        self
    }

    #[must_use]
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_cert = Some(path.into());
        self
    }

    /// Port for the worker's HTTP stats endpoint. Must be non-zero; callers
    /// are responsible for allocating a unique port per concurrent worker.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = Some(port);
        self
    }

    /// Override the loopback host the stats endpoint binds to.
    #[must_use]
    pub fn http_host(mut self, host: impl Into<String>) -> Self {
        self.config.http_host = host.into();
        self
    }

    #[must_use]
    pub fn degradation_preference(mut self, pref: DegradationPreference) -> Self {
        self.config.degradation_preference = Some(pref);
        self
    }

    #[must_use]
    pub fn cpu_adaptation(mut self, enabled: bool) -> Self {
        self.config.cpu_adaptation = Some(enabled);
        self
    }

    /// Use a synthetic capture device instead of a real camera/microphone.
    /// Defaults to `true`.
    #[must_use]
    pub fn fake_capture_device(mut self, enabled: bool) -> Self {
        self.config.fake_capture_device = enabled;
        self
    }

    #[must_use]
    pub fn audio_recording_device(mut self, device: impl Into<String>) -> Self {
        self.config.audio_recording_device = Some(device.into());
        self
    }

    #[must_use]
    pub fn audio_playout_device(mut self, device: impl Into<String>) -> Self {
        self.config.audio_playout_device = Some(device.into());
        self
    }

    /// Path to an OpenH264 shared library.
    #[must_use]
    pub fn openh264(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.openh264 = Some(path.into());
        self
    }

    #[must_use]
    pub fn vp8_encoder(mut self, engine: CodecEngine) -> Self {
        self.config.vp8_encoder = Some(engine);
        self
    }

    #[must_use]
    pub fn vp8_decoder(mut self, engine: CodecEngine) -> Self {
        self.config.vp8_decoder = Some(engine);
        self
    }

    #[must_use]
    pub fn vp9_encoder(mut self, engine: CodecEngine) -> Self {
        self.config.vp9_encoder = Some(engine);
        self
    }

    #[must_use]
    pub fn vp9_decoder(mut self, engine: CodecEngine) -> Self {
        self.config.vp9_decoder = Some(engine);
        self
    }

    #[must_use]
    pub fn h264_encoder(mut self, engine: CodecEngine) -> Self {
        self.config.h264_encoder = Some(engine);
        self
    }

    #[must_use]
    pub fn h264_decoder(mut self, engine: CodecEngine) -> Self {
        self.config.h264_decoder = Some(engine);
        self
    }

    #[must_use]
    pub fn h265_encoder(mut self, engine: CodecEngine) -> Self {
        self.config.h265_encoder = Some(engine);
        self
    }

    #[must_use]
    pub fn h265_decoder(mut self, engine: CodecEngine) -> Self {
        self.config.h265_decoder = Some(engine);
        self
    }

    #[must_use]
    pub fn av1_encoder(mut self, engine: CodecEngine) -> Self {
        self.config.av1_encoder = Some(engine);
        self
    }

    #[must_use]
    pub fn av1_decoder(mut self, engine: CodecEngine) -> Self {
        self.config.av1_decoder = Some(engine);
        self
    }

    #[must_use]
    pub fn worker_log_level(mut self, level: WorkerLogLevel) -> Self {
        self.config.worker_log_level = Some(level);
        self
    }

    /// Additional raw arguments appended verbatim after all rendered flags.
    #[must_use]
    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Override the bootstrap grace period before readiness polling starts.
    #[must_use]
    pub fn initial_wait(mut self, wait: Duration) -> Self {
        self.config.initial_wait = wait;
        self
    }

    /// Validate and produce the immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any field is out of range or malformed.
    pub fn build(self) -> Result<WorkerConfig, ConfigError> {
        let config = self.config;

        match url::Url::parse(&config.signaling_url) {
            Ok(parsed) if parsed.scheme() == "ws" || parsed.scheme() == "wss" => {}
            Ok(parsed) => {
                return Err(ConfigError::InvalidSignalingUrl {
                    reason: format!("expected ws or wss scheme, got {:?}", parsed.scheme()),
                    url: config.signaling_url,
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidSignalingUrl {
                    reason: e.to_string(),
                    url: config.signaling_url,
                });
            }
        }

        if config.channel_id.is_empty() {
            return Err(ConfigError::EmptyChannelId);
        }
        if config.http_port == Some(0) {
            return Err(ConfigError::InvalidHttpPort);
        }
        if let Some(rate) = config.video_bit_rate {
            if rate > 30000 {
                return Err(ConfigError::VideoBitRateOutOfRange(rate));
            }
        }
        if let Some(rate) = config.audio_bit_rate {
            if rate > 510 {
                return Err(ConfigError::AudioBitRateOutOfRange(rate));
            }
        }
        if let Some(n) = config.spotlight_number {
            if n > 8 {
                return Err(ConfigError::SpotlightNumberOutOfRange(n));
            }
        }
        if let Some(ref resolution) = config.resolution {
            if !is_valid_resolution(resolution) {
                return Err(ConfigError::InvalidResolution(resolution.clone()));
            }
        }

        Ok(config)
    }
}

/// Named resolutions the worker accepts alongside `WIDTHxHEIGHT`.
const NAMED_RESOLUTIONS: &[&str] = &["QVGA", "VGA", "HD", "FHD", "4K"];

fn is_valid_resolution(resolution: &str) -> bool {
    if NAMED_RESOLUTIONS.contains(&resolution) {
        return true;
    }
    match resolution.split_once('x') {
        Some((w, h)) => {
            w.parse::<u32>().is_ok_and(|w| w > 0) && h.parse::<u32>().is_ok_and(|h| h > 0)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> WorkerConfigBuilder {
        WorkerConfig::builder(
            "wss://media.example.com/signaling",
            "test-channel",
            Role::Sendonly,
        )
    }

    #[test]
    fn test_minimal_config_builds() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.signaling_url(), "wss://media.example.com/signaling");
        assert_eq!(config.channel_id(), "test-channel");
        assert_eq!(config.role(), Role::Sendonly);
        assert_eq!(config.http_port(), None);
        assert_eq!(config.http_host(), DEFAULT_HTTP_HOST);
        assert!(config.fake_capture_device);
        assert_eq!(config.initial_wait(), DEFAULT_INITIAL_WAIT);
    }

    #[test]
    fn test_rejects_non_websocket_signaling_url() {
        let err = WorkerConfig::builder("https://media.example.com", "ch", Role::Sendonly)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSignalingUrl { .. }));
    }

    #[test]
    fn test_rejects_unparseable_signaling_url() {
        let err = WorkerConfig::builder("not a url", "ch", Role::Sendonly)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSignalingUrl { .. }));
    }

    #[test]
    fn test_rejects_empty_channel_id() {
        let err = WorkerConfig::builder("wss://x.example.com", "", Role::Recvonly)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyChannelId));
    }

    #[test]
    fn test_rejects_zero_http_port() {
        let err = base_builder().http_port(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHttpPort));
    }

    #[test]
    fn test_rejects_out_of_range_bit_rates() {
        let err = base_builder().video_bit_rate(30001).build().unwrap_err();
        assert!(matches!(err, ConfigError::VideoBitRateOutOfRange(30001)));

        let err = base_builder().audio_bit_rate(511).build().unwrap_err();
        assert!(matches!(err, ConfigError::AudioBitRateOutOfRange(511)));

        assert!(base_builder().video_bit_rate(30000).build().is_ok());
        assert!(base_builder().audio_bit_rate(510).build().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_spotlight_number() {
        let err = base_builder().spotlight_number(9).build().unwrap_err();
        assert!(matches!(err, ConfigError::SpotlightNumberOutOfRange(9)));
        assert!(base_builder().spotlight_number(8).build().is_ok());
    }

    #[test]
    fn test_resolution_validation() {
        assert!(base_builder().resolution("VGA").build().is_ok());
        assert!(base_builder().resolution("1920x1080").build().is_ok());
        assert!(matches!(
            base_builder().resolution("huge").build().unwrap_err(),
            ConfigError::InvalidResolution(_)
        ));
        assert!(matches!(
            base_builder().resolution("0x480").build().unwrap_err(),
            ConfigError::InvalidResolution(_)
        ));
    }

    #[test]
    fn test_codec_engine_display_matches_worker_cli() {
        assert_eq!(CodecEngine::CiscoOpenh264.to_string(), "cisco_openh264");
        assert_eq!(CodecEngine::RaspiV4l2m2m.to_string(), "raspi_v4l2m2m");
        assert_eq!(VideoCodecType::H265.to_string(), "H265");
        assert_eq!(Role::Sendrecv.to_string(), "sendrecv");
        assert_eq!(
            DegradationPreference::MaintainFramerate.to_string(),
            "maintain_framerate"
        );
    }
}
