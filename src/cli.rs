use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::{VvError, VvResult};
use crate::model::{
    ConversionOptions, DEFAULT_SAMPLE_RATE, DEFAULT_THRESHOLD, EngineKind, VerifierConfig,
};

#[derive(Debug, Parser)]
#[command(name = "verivoice")]
#[command(about = "Voice verification front end: ffmpeg normalization plus SDK scoring")]
pub struct Cli {
    /// Raise the default log filter from info to debug.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score two recordings against each other.
    Verify(VerifyArgs),
    /// Verify every reference/candidate pair listed in a file.
    Batch(BatchArgs),
    /// Convert audio into the scoring engine's input format.
    Convert(ConvertArgs),
    /// Check files against the engine's format rules.
    Validate(ValidateArgs),
    /// Print stream facts for one media file.
    Probe(ProbeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// Reference recording (the enrolled speaker).
    pub reference: Option<PathBuf>,

    /// Candidate recording to check against the reference.
    pub candidate: Option<PathBuf>,

    /// Biometric SDK root directory (skips discovery).
    #[arg(short = 's', long)]
    pub sdk_root: Option<PathBuf>,

    /// Scoring engine to run.
    #[arg(long, value_enum, default_value_t = EngineKind::Native)]
    pub engine: EngineKind,

    /// Decision threshold; scores at or above it count as a match.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: i32,

    /// Print the full JSON result instead of the plain summary.
    #[arg(long)]
    pub json: bool,

    /// Print the engine/SDK environment report and exit.
    #[arg(long)]
    pub info: bool,
}

impl VerifyArgs {
    #[must_use]
    pub fn to_config(&self) -> VerifierConfig {
        VerifierConfig {
            sdk_root: self.sdk_root.clone(),
            engine: self.engine,
            threshold: self.threshold,
            ..VerifierConfig::default()
        }
    }

    /// Both positional paths, required unless `--info` short-circuits.
    pub fn pair(&self) -> VvResult<(&Path, &Path)> {
        match (self.reference.as_deref(), self.candidate.as_deref()) {
            (Some(reference), Some(candidate)) => Ok((reference, candidate)),
            _ => Err(VvError::InvalidRequest(
                "verify needs <REFERENCE> and <CANDIDATE> unless --info is set".to_owned(),
            )),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// File with one `reference candidate` pair per line, whitespace
    /// separated; blank lines and `#` comments are skipped.
    pub pairs_file: PathBuf,

    /// Biometric SDK root directory (skips discovery).
    #[arg(short = 's', long)]
    pub sdk_root: Option<PathBuf>,

    /// Scoring engine to run.
    #[arg(long, value_enum, default_value_t = EngineKind::Native)]
    pub engine: EngineKind,

    /// Decision threshold; scores at or above it count as a match.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: i32,

    /// Print the full JSON result array instead of the plain summary.
    #[arg(long)]
    pub json: bool,
}

impl BatchArgs {
    #[must_use]
    pub fn to_config(&self) -> VerifierConfig {
        VerifierConfig {
            sdk_root: self.sdk_root.clone(),
            engine: self.engine,
            threshold: self.threshold,
            ..VerifierConfig::default()
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ConvertArgs {
    /// Input audio files (any container ffmpeg reads).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output path (single input only; default `<stem>_converted.wav`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for converted files, created if missing.
    #[arg(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Target sample rate in Hz.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Keep leading and trailing silence.
    #[arg(long)]
    pub no_silence_removal: bool,

    /// Skip loudness normalization.
    #[arg(long)]
    pub no_normalize: bool,

    /// Replace existing output files.
    #[arg(long)]
    pub overwrite: bool,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ConvertArgs {
    #[must_use]
    pub fn to_options(&self) -> ConversionOptions {
        ConversionOptions {
            target_sample_rate: self.sample_rate,
            remove_silence: !self.no_silence_removal,
            normalize_loudness: !self.no_normalize,
            allow_overwrite: self.overwrite,
        }
    }

    /// Reject flag combinations the conversion layer cannot honor.
    pub fn check(&self) -> VvResult<()> {
        if self.output.is_some() && self.inputs.len() > 1 {
            return Err(VvError::InvalidRequest(
                "--output takes a single input; use --output-dir for several".to_owned(),
            ));
        }
        if self.output.is_some() && self.output_dir.is_some() {
            return Err(VvError::InvalidRequest(
                "--output and --output-dir are mutually exclusive".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Audio files to check.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print reports as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ProbeArgs {
    /// Media file to inspect.
    pub input: PathBuf,

    /// Print the asset as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Parse a pairs file into `(reference, candidate)` tuples. Lines are split
/// on whitespace; a line with any field count other than two is rejected
/// with its line number.
pub fn read_pairs_file(path: &Path) -> VvResult<Vec<(PathBuf, PathBuf)>> {
    if !path.is_file() {
        return Err(VvError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)?;

    let mut pairs = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(VvError::InvalidRequest(format!(
                "{}:{}: expected `reference candidate`, found {} fields",
                path.display(),
                index + 1,
                fields.len()
            )));
        }
        pairs.push((PathBuf::from(fields[0]), PathBuf::from(fields[1])));
    }
    Ok(pairs)
}
