use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Audio format contract
// ---------------------------------------------------------------------------

/// Sample rates the scoring engine accepts without resampling artifacts.
pub const ACCEPTED_SAMPLE_RATES: [u32; 2] = [16_000, 22_050];

/// Default target sample rate for conversions.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default decision threshold used by the vendor tutorial binaries.
pub const DEFAULT_THRESHOLD: i32 = 48;

/// Audio format the scoring engine accepts. Channel count and bit depth are
/// fixed by the engine; only the sample rate is negotiable, and then only
/// between the two accepted rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl FormatSpec {
    pub const CODEC: &'static str = "pcm_s16le";
    pub const CONTAINER: &'static str = "wav";

    #[must_use]
    pub fn is_accepted_rate(rate: u32) -> bool {
        ACCEPTED_SAMPLE_RATES.contains(&rate)
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE,
            channels: 1,
            bit_depth: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion request
// ---------------------------------------------------------------------------

/// One audio conversion job. `destination: None` derives the output path from
/// the source stem (`<stem>_converted.wav` next to the source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    #[serde(default = "default_sample_rate")]
    pub target_sample_rate: u32,
    #[serde(default = "default_true")]
    pub remove_silence: bool,
    #[serde(default = "default_true")]
    pub normalize_loudness: bool,
    #[serde(default)]
    pub allow_overwrite: bool,
}

impl ConversionRequest {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            target_sample_rate: DEFAULT_SAMPLE_RATE,
            remove_silence: true,
            normalize_loudness: true,
            allow_overwrite: false,
        }
    }

    #[must_use]
    pub fn with_options(
        source: impl Into<PathBuf>,
        destination: Option<PathBuf>,
        options: &ConversionOptions,
    ) -> Self {
        Self {
            source: source.into(),
            destination,
            target_sample_rate: options.target_sample_rate,
            remove_silence: options.remove_silence,
            normalize_loudness: options.normalize_loudness,
            allow_overwrite: options.allow_overwrite,
        }
    }
}

/// Conversion knobs shared by every file of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOptions {
    #[serde(default = "default_sample_rate")]
    pub target_sample_rate: u32,
    #[serde(default = "default_true")]
    pub remove_silence: bool,
    #[serde(default = "default_true")]
    pub normalize_loudness: bool,
    #[serde(default)]
    pub allow_overwrite: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            target_sample_rate: DEFAULT_SAMPLE_RATE,
            remove_silence: true,
            normalize_loudness: true,
            allow_overwrite: false,
        }
    }
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Probe and validation
// ---------------------------------------------------------------------------

/// Stream/container facts probed from a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub sample_rate_hz: u32,
    pub channels: u32,
    pub codec_name: String,
    pub bit_rate: u64,
    pub container_size_bytes: u64,
}

/// Outcome of the fitness rules. Errors block verification; warnings are
/// advisory and never flip `is_valid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub asset: AudioAsset,
}

// ---------------------------------------------------------------------------
// Scoring engines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// SDK tutorial C++ binary, linked directly against the vendor libraries.
    Native,
    /// JVM wrapper around the vendor's Java bindings.
    Managed,
}

impl EngineKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Managed => "managed",
        }
    }
}

/// Raw outcome of one scoring-engine run. A nonzero `exit_code` and
/// `timed_out == true` are ordinary data here; nothing in this struct implies
/// an error was raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringInvocation {
    pub reference_path: PathBuf,
    pub candidate_path: PathBuf,
    pub exit_code: i32,
    pub stdout_text: String,
    pub stderr_text: String,
    pub timed_out: bool,
    pub wall_clock_seconds: f64,
}

// ---------------------------------------------------------------------------
// Verdicts and confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Succeeded,
    Failed,
    Error,
    /// Engine printed a score but no verdict line. Not a failure.
    Unknown,
}

impl VerificationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

/// Typed extraction from engine stdout: the score plus the verdict token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedVerdict {
    pub score: i32,
    pub status: VerificationStatus,
}

// ---------------------------------------------------------------------------
// Verification result (stable exchange record)
// ---------------------------------------------------------------------------

/// One pair's verification outcome. Constructed exactly once per pair by the
/// orchestrator and never mutated afterwards.
///
/// `success` means the engine ran and its output parsed; a non-matching pair
/// still has `success == true` with `verification_status == Failed`. The
/// serialized names of the path fields follow the exchange contract
/// (`reference_filename` / `candidate_filename`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    pub score: Option<i32>,
    pub threshold: i32,
    pub verification_status: VerificationStatus,
    pub far_percentage: f64,
    pub confidence_level: ConfidenceLevel,
    #[serde(rename = "reference_filename")]
    pub reference_file: String,
    #[serde(rename = "candidate_filename")]
    pub candidate_file: String,
    pub raw_output: String,
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator configuration and reports
// ---------------------------------------------------------------------------

/// Everything an orchestrator instance needs, injected at construction.
/// No constant in the verification path is read from a global.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub sdk_root: Option<PathBuf>,
    pub engine: EngineKind,
    pub threshold: i32,
    pub format: FormatSpec,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            sdk_root: None,
            engine: EngineKind::Native,
            threshold: DEFAULT_THRESHOLD,
            format: FormatSpec::default(),
        }
    }
}

impl VerifierConfig {
    #[must_use]
    pub fn with_sdk_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sdk_root = Some(root.into());
        self
    }
}

/// SDK/engine environment report backing the `--info` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineReport {
    pub generated_at_rfc3339: String,
    pub sdk_root: String,
    pub engine: EngineKind,
    pub engine_binary: String,
    pub binary_exists: bool,
    pub library_path: Option<String>,
    pub library_exists: bool,
    pub threshold: i32,
    pub far_percentage: f64,
}

/// Per-file outcome of a batch conversion. `destination: None` records a
/// failed conversion; the batch itself always runs to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConversionEntry {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub error_message: Option<String>,
}

pub(crate) fn display_path(path: &Path) -> String {
    path.display().to_string()
}
