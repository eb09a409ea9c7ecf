use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{VvError, VvResult};
use crate::model::{BatchConversionEntry, ConversionOptions, ConversionRequest, FormatSpec};
use crate::probe;
use crate::process::{duration_from_env, run_command_with_timeout, saturating_duration_ms};

/// Suffix appended to the source stem when no destination is given.
pub const CONVERTED_SUFFIX: &str = "_converted";

/// Trims leading silence; applied twice around `areverse` so the second pass
/// trims what was originally trailing silence.
const SILENCE_TRIM_FILTER: &str =
    "silenceremove=start_periods=1:start_silence=0.1:start_threshold=-50dB";

/// EBU R128 loudness normalization to -16 LUFS integrated.
const LOUDNESS_FILTER: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

/// Convert one recording into engine-ready WAV: optional silence trim and
/// loudness normalization, then an unconditional mono/rate/16-bit PCM stage.
/// Returns the destination path on success.
pub fn convert_file(request: &ConversionRequest) -> VvResult<PathBuf> {
    convert_file_with_timeout(request, convert_timeout())
}

pub(crate) fn convert_file_with_timeout(
    request: &ConversionRequest,
    timeout: Duration,
) -> VvResult<PathBuf> {
    if !request.source.is_file() {
        return Err(VvError::InputNotFound {
            path: request.source.clone(),
        });
    }

    let destination = resolve_destination(request);
    if destination.exists() && !request.allow_overwrite {
        return Err(VvError::OutputAlreadyExists { path: destination });
    }

    if !FormatSpec::is_accepted_rate(request.target_sample_rate) {
        tracing::warn!(
            rate = request.target_sample_rate,
            "target sample rate is outside the engine-supported set (16000, 22050)"
        );
    }

    tracing::info!(
        source = %request.source.display(),
        destination = %destination.display(),
        "converting audio"
    );

    let args = build_ffmpeg_args(request, &destination);
    if let Err(err) = run_command_with_timeout("ffmpeg", &args, None, Some(timeout)) {
        remove_partial_output(&destination);
        return Err(map_conversion_error(err, &request.source, timeout));
    }

    // ffmpeg can exit 0 without writing anything, e.g. for zero-length input.
    if !destination.is_file() {
        return Err(VvError::ConversionFailed(format!(
            "conversion completed but output file not found: {}",
            destination.display()
        )));
    }

    if let Ok(asset) = probe::probe(&destination) {
        tracing::info!(
            duration_seconds = asset.duration_seconds,
            size_bytes = asset.container_size_bytes,
            "conversion complete"
        );
    }

    Ok(destination)
}

/// Convert many files sequentially. With `output_dir` set, every output lands
/// there as `<stem>_converted.wav`; otherwise each output sits next to its
/// source. A failed file is logged and recorded, never fatal for the batch;
/// the returned entries match the input order and length.
pub fn convert_batch(
    sources: &[PathBuf],
    output_dir: Option<&Path>,
    options: &ConversionOptions,
) -> VvResult<Vec<BatchConversionEntry>> {
    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)?;
    }

    let mut entries = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        tracing::info!(
            source = %source.display(),
            "processing {}/{}",
            index + 1,
            sources.len()
        );

        let destination = output_dir.map(|dir| dir.join(derived_file_name(source)));
        let request = ConversionRequest::with_options(source.clone(), destination, options);
        match convert_file(&request) {
            Ok(path) => entries.push(BatchConversionEntry {
                source: source.clone(),
                destination: Some(path),
                error_message: None,
            }),
            Err(err) => {
                tracing::error!(
                    source = %source.display(),
                    code = err.error_code(),
                    "conversion failed: {err}"
                );
                entries.push(BatchConversionEntry {
                    source: source.clone(),
                    destination: None,
                    error_message: Some(err.to_string()),
                });
            }
        }
    }

    Ok(entries)
}

/// Explicit destination wins; otherwise `<stem>_converted.wav` beside the source.
fn resolve_destination(request: &ConversionRequest) -> PathBuf {
    request
        .destination
        .clone()
        .unwrap_or_else(|| request.source.with_file_name(derived_file_name(&request.source)))
}

fn derived_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    format!("{stem}{CONVERTED_SUFFIX}.wav")
}

/// Filter order is load-bearing: both silence trims run before loudness
/// normalization so the measured program loudness excludes dead air. The
/// output stage is applied regardless of which filters are enabled.
fn build_ffmpeg_args(request: &ConversionRequest, destination: &Path) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_owned(),
        "-loglevel".to_owned(),
        "error".to_owned(),
        "-y".to_owned(),
        "-i".to_owned(),
        request.source.display().to_string(),
    ];

    let mut filters: Vec<&str> = Vec::new();
    if request.remove_silence {
        filters.push(SILENCE_TRIM_FILTER);
        filters.push("areverse");
        filters.push(SILENCE_TRIM_FILTER);
        filters.push("areverse");
    }
    if request.normalize_loudness {
        filters.push(LOUDNESS_FILTER);
    }
    if !filters.is_empty() {
        args.push("-af".to_owned());
        args.push(filters.join(","));
    }

    args.extend([
        "-ac".to_owned(),
        "1".to_owned(),
        "-ar".to_owned(),
        request.target_sample_rate.to_string(),
        "-acodec".to_owned(),
        FormatSpec::CODEC.to_owned(),
        "-f".to_owned(),
        FormatSpec::CONTAINER.to_owned(),
        destination.display().to_string(),
    ]);

    args
}

fn map_conversion_error(err: VvError, source: &Path, timeout: Duration) -> VvError {
    match err {
        VvError::CommandTimedOut { .. } => VvError::ConversionTimeout {
            path: source.to_path_buf(),
            timeout_ms: saturating_duration_ms(timeout),
        },
        VvError::CommandFailed {
            status,
            stderr_suffix,
            ..
        } => VvError::ConversionFailed(format!("ffmpeg exited with status {status}{stderr_suffix}")),
        other => other,
    }
}

fn remove_partial_output(destination: &Path) {
    if destination.exists() {
        if let Err(err) = fs::remove_file(destination) {
            tracing::warn!(
                destination = %destination.display(),
                "failed to remove partial output: {err}"
            );
        }
    }
}

fn convert_timeout() -> Duration {
    duration_from_env("VERIVOICE_CONVERT_TIMEOUT_MS", Duration::from_secs(300))
}
