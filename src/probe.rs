use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::error::{VvError, VvResult};
use crate::model::{AudioAsset, FormatSpec, ValidationReport};
use crate::process::{duration_from_env, run_command_with_timeout};

/// Below this the engines have too little voiced material to score reliably.
const MIN_RECOMMENDED_SECONDS: f64 = 3.0;
/// Above this scoring slows down noticeably.
const MAX_RECOMMENDED_SECONDS: f64 = 300.0;

/// Probe a media file with ffprobe and return its audio properties.
///
/// Requires at least one audio stream; files without one (or files ffprobe
/// cannot read at all) fail with `ProbeFailed`.
pub fn probe(input: &Path) -> VvResult<AudioAsset> {
    probe_with_timeout(input, probe_timeout())
}

pub(crate) fn probe_with_timeout(input: &Path, timeout: Duration) -> VvResult<AudioAsset> {
    if !input.is_file() {
        return Err(VvError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    let args = vec![
        "-v".to_owned(),
        "quiet".to_owned(),
        "-print_format".to_owned(),
        "json".to_owned(),
        "-show_format".to_owned(),
        "-show_streams".to_owned(),
        input.display().to_string(),
    ];

    let output =
        run_command_with_timeout("ffprobe", &args, None, Some(timeout)).map_err(|err| match err {
            // A missing ffprobe is an installation problem, not a property of
            // the probed file.
            VvError::CommandMissing { .. } => err,
            other => VvError::ProbeFailed(other.to_string()),
        })?;

    parse_probe_output(input, &output.stdout)
}

/// Probe a file and grade it against what the scoring engines accept.
///
/// Hard failures (wrong sample rate, not mono) land in `errors` and clear
/// `is_valid`; advisory findings (duration, container) land in `warnings`.
pub fn validate(input: &Path) -> VvResult<ValidationReport> {
    let asset = probe(input)?;
    Ok(evaluate(asset))
}

fn parse_probe_output(input: &Path, stdout: &[u8]) -> VvResult<AudioAsset> {
    let root: Value = serde_json::from_slice(stdout).map_err(|err| {
        VvError::ProbeFailed(format!("ffprobe emitted unparseable JSON: {err}"))
    })?;

    let audio_stream = root
        .get("streams")
        .and_then(Value::as_array)
        .and_then(|streams| {
            streams
                .iter()
                .find(|stream| stream.get("codec_type").and_then(Value::as_str) == Some("audio"))
        })
        .ok_or_else(|| {
            VvError::ProbeFailed(format!("no audio stream found in {}", input.display()))
        })?;

    let format = root.get("format");

    Ok(AudioAsset {
        path: input.to_path_buf(),
        duration_seconds: format
            .and_then(|f| f.get("duration"))
            .and_then(value_as_f64)
            .unwrap_or(0.0),
        sample_rate_hz: audio_stream
            .get("sample_rate")
            .and_then(value_as_u64)
            .and_then(|rate| u32::try_from(rate).ok())
            .unwrap_or(0),
        channels: audio_stream
            .get("channels")
            .and_then(value_as_u64)
            .and_then(|channels| u32::try_from(channels).ok())
            .unwrap_or(0),
        codec_name: audio_stream
            .get("codec_name")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_owned(),
        bit_rate: audio_stream
            .get("bit_rate")
            .and_then(value_as_u64)
            .unwrap_or(0),
        container_size_bytes: format
            .and_then(|f| f.get("size"))
            .and_then(value_as_u64)
            .unwrap_or(0),
    })
}

fn evaluate(asset: AudioAsset) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !FormatSpec::is_accepted_rate(asset.sample_rate_hz) {
        errors.push(format!(
            "Sample rate {} not supported (need 16000 or 22050)",
            asset.sample_rate_hz
        ));
    }
    if asset.channels != 1 {
        errors.push(format!(
            "Must be mono (1 channel), found {} channels",
            asset.channels
        ));
    }

    if asset.duration_seconds < MIN_RECOMMENDED_SECONDS {
        warnings.push(format!(
            "Duration {:.1}s is short (recommend >3s)",
            asset.duration_seconds
        ));
    } else if asset.duration_seconds > MAX_RECOMMENDED_SECONDS {
        warnings.push(format!(
            "Duration {:.1}s is long (may be slow to process)",
            asset.duration_seconds
        ));
    }

    // Container check stays on the extension: probe data reports the codec,
    // and a correctly coded stream in an odd container still deserves the nudge.
    if !has_wav_extension(&asset.path) {
        warnings.push("WAV format is preferred for best compatibility".to_owned());
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        asset,
    }
}

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

/// ffprobe renders most numerics as JSON strings; accept both forms.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn probe_timeout() -> Duration {
    duration_from_env("VERIVOICE_PROBE_TIMEOUT_MS", Duration::from_secs(10))
}
