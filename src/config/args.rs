//! Command-line argument rendering for the worker.
//!
//! The mapping is deterministic: a fixed field order, and identical logical
//! configurations always produce byte-identical argument vectors. Unset
//! optional fields never emit a flag.

use std::borrow::Cow;
use std::path::Path;

use serde_json::{Map, Value};

use super::WorkerConfig;

/// Render `true`/`false` for a boolean-valued option (as opposed to a pure
/// toggle, which emits a bare flag or nothing).
fn bool_str(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}

/// Serialize a structured field as one canonical JSON argument.
///
/// `serde_json`'s map type keeps keys sorted, so equal maps always render to
/// the same bytes.
fn json_arg(map: &Map<String, Value>) -> String {
    Value::Object(map.clone()).to_string()
}

fn push_pair(args: &mut Vec<String>, flag: &str, value: String) {
    args.push(flag.to_string());
    args.push(value);
}

impl WorkerConfig {
    /// Build the worker's command-line argument vector.
    ///
    /// Pure and deterministic; see the module docs for the rendering rules.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if let Some(level) = self.worker_log_level {
            push_pair(&mut args, "--log-level", level.to_string());
        }
        if let Some(ref resolution) = self.resolution {
            push_pair(&mut args, "--resolution", resolution.clone());
        }
        if let Some(v) = self.hw_mjpeg_decoder {
            push_pair(&mut args, "--hw-mjpeg-decoder", bool_str(v).to_string());
        }

        push_pair(&mut args, "--signaling-url", self.signaling_url.clone());
        push_pair(&mut args, "--channel-id", self.channel_id.clone());
        push_pair(&mut args, "--role", self.role.to_string());
        if let Some(ref id) = self.client_id {
            push_pair(&mut args, "--client-id", id.clone());
        }

        if let Some(v) = self.video {
            push_pair(&mut args, "--video", bool_str(v).to_string());
        }
        if let Some(v) = self.audio {
            push_pair(&mut args, "--audio", bool_str(v).to_string());
        }
        if let Some(ref device) = self.video_device {
            push_pair(&mut args, "--video-device", device.clone());
        }
        if let Some(codec) = self.video_codec_type {
            push_pair(&mut args, "--video-codec-type", codec.to_string());
        }
        if let Some(codec) = self.audio_codec_type {
            push_pair(&mut args, "--audio-codec-type", codec.to_string());
        }

        if let Some(rate) = self.video_bit_rate {
            push_pair(&mut args, "--video-bit-rate", rate.to_string());
        }
        if let Some(rate) = self.audio_bit_rate {
            push_pair(&mut args, "--audio-bit-rate", rate.to_string());
        }

        if let Some(ref params) = self.video_h264_params {
            push_pair(&mut args, "--video-h264-params", json_arg(params));
        }
        if let Some(ref params) = self.video_h265_params {
            push_pair(&mut args, "--video-h265-params", json_arg(params));
        }
        if let Some(ref metadata) = self.metadata {
            push_pair(&mut args, "--metadata", json_arg(metadata));
        }

        if let Some(v) = self.spotlight {
            push_pair(&mut args, "--spotlight", bool_str(v).to_string());
        }
        if let Some(n) = self.spotlight_number {
            push_pair(&mut args, "--spotlight-number", n.to_string());
        }
        if let Some(v) = self.simulcast {
            push_pair(&mut args, "--simulcast", bool_str(v).to_string());
        }
        if let Some(v) = self.data_channel_signaling {
            push_pair(&mut args, "--data-channel-signaling", bool_str(v).to_string());
        }
        if let Some(v) = self.ignore_disconnect_websocket {
            push_pair(&mut args, "--ignore-disconnect-websocket", bool_str(v).to_string());
        }

        if let Some(ref url) = self.proxy_url {
            push_pair(&mut args, "--proxy-url", url.clone());
        }
        if let Some(ref username) = self.proxy_username {
            push_pair(&mut args, "--proxy-username", username.clone());
        }
        if let Some(ref password) = self.proxy_password {
            push_pair(&mut args, "--proxy-password", password.clone());
        }

        if self.insecure {
            args.push("--insecure".to_string());
        }
        if let Some(ref path) = self.client_cert {
            push_pair(&mut args, "--client-cert", path.display().to_string());
        }
        if let Some(ref path) = self.client_key {
            push_pair(&mut args, "--client-key", path.display().to_string());
        }
        if let Some(ref path) = self.ca_cert {
            push_pair(&mut args, "--ca-cert", path.display().to_string());
        }

        if let Some(port) = self.http_port {
            push_pair(&mut args, "--http-port", port.to_string());
        }
        push_pair(&mut args, "--http-host", self.http_host.clone());

        if let Some(pref) = self.degradation_preference {
            push_pair(&mut args, "--degradation-preference", pref.to_string());
        }
        if let Some(v) = self.cpu_adaptation {
            push_pair(&mut args, "--cpu-adaptation", bool_str(v).to_string());
        }

        if self.fake_capture_device {
            args.push("--fake-capture-device".to_string());
        }

        if let Some(ref device) = self.audio_recording_device {
            push_pair(&mut args, "--audio-recording-device", device.clone());
        }
        if let Some(ref device) = self.audio_playout_device {
            push_pair(&mut args, "--audio-playout-device", device.clone());
        }

        if let Some(ref path) = self.openh264 {
            push_pair(&mut args, "--openh264", path.display().to_string());
        }
        if let Some(engine) = self.vp8_encoder {
            push_pair(&mut args, "--vp8-encoder", engine.to_string());
        }
        if let Some(engine) = self.vp8_decoder {
            push_pair(&mut args, "--vp8-decoder", engine.to_string());
        }
        if let Some(engine) = self.vp9_encoder {
            push_pair(&mut args, "--vp9-encoder", engine.to_string());
        }
        if let Some(engine) = self.vp9_decoder {
            push_pair(&mut args, "--vp9-decoder", engine.to_string());
        }
        if let Some(engine) = self.h264_encoder {
            push_pair(&mut args, "--h264-encoder", engine.to_string());
        }
        if let Some(engine) = self.h264_decoder {
            push_pair(&mut args, "--h264-decoder", engine.to_string());
        }
        if let Some(engine) = self.h265_encoder {
            push_pair(&mut args, "--h265-encoder", engine.to_string());
        }
        if let Some(engine) = self.h265_decoder {
            push_pair(&mut args, "--h265-decoder", engine.to_string());
        }
        if let Some(engine) = self.av1_encoder {
            push_pair(&mut args, "--av1-encoder", engine.to_string());
        }
        if let Some(engine) = self.av1_decoder {
            push_pair(&mut args, "--av1-decoder", engine.to_string());
        }

        args.extend(self.extra_args.iter().cloned());

        args
    }

    /// Render the full launch command as a single shell-quoted line.
    ///
    /// JSON arguments and paths with spaces stay readable in logs.
    #[must_use]
    pub fn preview_command(&self, executable: &Path) -> String {
        let mut parts = vec![shell_escape::escape(Cow::from(executable.display().to_string())).into_owned()];
        parts.extend(
            self.to_args()
                .into_iter()
                .map(|arg| shell_escape::escape(Cow::from(arg)).into_owned()),
        );
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use crate::config::{CodecEngine, Role, VideoCodecType, WorkerConfig, WorkerLogLevel};

    fn sample_config() -> WorkerConfig {
        WorkerConfig::builder("wss://media.example.com/signaling", "ch-1", Role::Sendonly)
            .http_port(55001)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = sample_config();
        let first = config.to_args();
        for _ in 0..5 {
            assert_eq!(config.to_args(), first);
        }
    }

    #[test]
    fn test_identical_logical_inputs_render_identically() {
        let make = || {
            let mut metadata = serde_json::Map::new();
            metadata.insert("b".to_string(), json!(2));
            metadata.insert("a".to_string(), json!(1));
            WorkerConfig::builder("wss://media.example.com/signaling", "ch-1", Role::Sendrecv)
                .metadata(metadata)
                .http_port(55002)
                .build()
                .unwrap()
        };
        assert_eq!(make().to_args(), make().to_args());
    }

    #[test]
    fn test_unset_fields_emit_no_flags() {
        let args = sample_config().to_args();
        assert!(!args.iter().any(|a| a == "--video"));
        assert!(!args.iter().any(|a| a == "--metadata"));
        assert!(!args.iter().any(|a| a == "--spotlight"));
        assert!(!args.iter().any(|a| a == "--insecure"));
        assert!(!args.iter().any(|a| a == "--vp8-encoder"));
    }

    #[test]
    fn test_boolean_valued_options_render_true_false() {
        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Sendonly)
            .video(true)
            .audio(false)
            .simulcast(true)
            .build()
            .unwrap();
        let args = config.to_args();
        let video_pos = args.iter().position(|a| a == "--video").unwrap();
        assert_eq!(args[video_pos + 1], "true");
        let audio_pos = args.iter().position(|a| a == "--audio").unwrap();
        assert_eq!(args[audio_pos + 1], "false");
        let simulcast_pos = args.iter().position(|a| a == "--simulcast").unwrap();
        assert_eq!(args[simulcast_pos + 1], "true");
    }

    #[test]
    fn test_toggle_options_render_bare_flag() {
        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Sendonly)
            .insecure(true)
            .build()
            .unwrap();
        let args = config.to_args();
        let insecure_pos = args.iter().position(|a| a == "--insecure").unwrap();
        // Bare flag: the next element is another flag, not a value.
        assert!(args[insecure_pos + 1].starts_with("--"));
        // fake_capture_device defaults on and is a toggle too.
        assert!(args.iter().any(|a| a == "--fake-capture-device"));

        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Sendonly)
            .fake_capture_device(false)
            .build()
            .unwrap();
        assert!(!config.to_args().iter().any(|a| a == "--fake-capture-device"));
    }

    #[test]
    fn test_structured_fields_render_canonical_json() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("zeta".to_string(), json!("z"));
        metadata.insert("alpha".to_string(), json!({"nested": true}));
        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Sendonly)
            .metadata(metadata)
            .build()
            .unwrap();
        let args = config.to_args();
        let pos = args.iter().position(|a| a == "--metadata").unwrap();
        assert_eq!(args[pos + 1], r#"{"alpha":{"nested":true},"zeta":"z"}"#);
    }

    #[test]
    fn test_numeric_fields_render_decimal() {
        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Sendonly)
            .video_bit_rate(2500)
            .audio_bit_rate(64)
            .http_port(55003)
            .build()
            .unwrap();
        let args = config.to_args();
        let pos = args.iter().position(|a| a == "--video-bit-rate").unwrap();
        assert_eq!(args[pos + 1], "2500");
        let pos = args.iter().position(|a| a == "--http-port").unwrap();
        assert_eq!(args[pos + 1], "55003");
    }

    #[test]
    fn test_http_host_always_rendered() {
        let args = sample_config().to_args();
        let pos = args.iter().position(|a| a == "--http-host").unwrap();
        assert_eq!(args[pos + 1], "127.0.0.1");
    }

    #[test]
    fn test_required_fields_and_codecs() {
        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Recvonly)
            .video_codec_type(VideoCodecType::Av1)
            .av1_decoder(CodecEngine::NvidiaVideoCodec)
            .worker_log_level(WorkerLogLevel::Warning)
            .build()
            .unwrap();
        let args = config.to_args();
        // Log level renders first.
        assert_eq!(args[0], "--log-level");
        assert_eq!(args[1], "warning");
        let pos = args.iter().position(|a| a == "--role").unwrap();
        assert_eq!(args[pos + 1], "recvonly");
        let pos = args.iter().position(|a| a == "--video-codec-type").unwrap();
        assert_eq!(args[pos + 1], "AV1");
        let pos = args.iter().position(|a| a == "--av1-decoder").unwrap();
        assert_eq!(args[pos + 1], "nvidia_video_codec");
    }

    #[test]
    fn test_extra_args_appended_last() {
        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Sendonly)
            .extra_args(["--experimental-flag", "on"])
            .build()
            .unwrap();
        let args = config.to_args();
        assert_eq!(args[args.len() - 2], "--experimental-flag");
        assert_eq!(args[args.len() - 1], "on");
    }

    #[test]
    fn test_preview_command_quotes_json() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("access_token".to_string(), json!("abc"));
        let config = WorkerConfig::builder("wss://x.example.com", "ch", Role::Sendonly)
            .metadata(metadata)
            .build()
            .unwrap();
        let preview = config.preview_command(Path::new("/opt/worker/media-worker"));
        assert!(preview.starts_with("/opt/worker/media-worker "));
        // The JSON argument must be a single shell word.
        assert!(preview.contains(r#"'{"access_token":"abc"}'"#));
    }
}
