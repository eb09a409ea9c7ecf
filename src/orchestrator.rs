use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::classify;
use crate::engine::{self, ScoringEngine};
use crate::error::{VvError, VvResult};
use crate::model::{
    ConfidenceLevel, EngineReport, ScoringInvocation, VerificationResult, VerificationStatus,
    VerifierConfig, display_path,
};
use crate::parse;
use crate::process::saturating_duration_ms;
use crate::sdk::SdkLayout;

// ---------------------------------------------------------------------------
// Per-pair stage progression
// ---------------------------------------------------------------------------

/// Progression of one scoring pair, surfaced through stage-labeled logs.
/// Terminal stages are `Classified` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairStage {
    Pending,
    Invoking,
    Parsing,
    Classified,
    Failed,
}

impl PairStage {
    fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Invoking => "invoking",
            Self::Parsing => "parsing",
            Self::Classified => "classified",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PairStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// VoiceVerifier
// ---------------------------------------------------------------------------

/// Orchestrates one verification flow: resolve inputs, run the scoring
/// engine, parse its output, classify the score, and assemble the result.
pub struct VoiceVerifier {
    config: VerifierConfig,
    layout: SdkLayout,
    engine: Box<dyn ScoringEngine>,
}

impl VoiceVerifier {
    /// Locate the SDK and bind the configured engine. SDK discovery is the
    /// only constructor failure; a missing engine binary is reported per
    /// call, not here.
    pub fn new(config: VerifierConfig) -> VvResult<Self> {
        let layout = SdkLayout::locate(config.sdk_root.as_deref())?;
        let engine = engine::engine_for(config.engine, &layout);
        tracing::info!(
            root = %layout.root().display(),
            engine = engine.name(),
            "verifier ready"
        );
        tracing::debug!(
            threshold = config.threshold,
            sample_rate = config.format.sample_rate_hz,
            channels = config.format.channels,
            "verifier configuration"
        );
        Ok(Self {
            config,
            layout,
            engine,
        })
    }

    /// Like [`VoiceVerifier::new`] but with a caller-supplied engine. This is
    /// the substitution seam: a stub engine slots in here without touching
    /// any verification logic.
    #[must_use]
    pub fn with_engine(
        config: VerifierConfig,
        layout: SdkLayout,
        engine: Box<dyn ScoringEngine>,
    ) -> Self {
        Self {
            config,
            layout,
            engine,
        }
    }

    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    #[must_use]
    pub fn sdk_root(&self) -> &Path {
        self.layout.root()
    }

    /// Score one reference/candidate pair.
    ///
    /// Missing input files are the only `Err` returns, raised before any
    /// process launch. Every downstream problem (unavailable engine, spawn
    /// failure, timeout, nonzero exit, unparseable output) comes back as an
    /// error-shaped `VerificationResult` instead, so callers always get one
    /// result per launched attempt. `success = true` means the engine ran
    /// and its output parsed; a failed match is a successful verification
    /// attempt whose outcome lives in `verification_status`.
    pub fn verify_pair(&self, reference: &Path, candidate: &Path) -> VvResult<VerificationResult> {
        let reference = absolutize(reference);
        let candidate = absolutize(candidate);

        if !reference.is_file() {
            return Err(VvError::ReferenceNotFound { path: reference });
        }
        if !candidate.is_file() {
            return Err(VvError::CandidateNotFound { path: candidate });
        }

        let pair_id = Uuid::new_v4().to_string();
        tracing::info!(
            pair_id = %pair_id,
            stage = %PairStage::Pending,
            reference = %reference.display(),
            candidate = %candidate.display(),
            engine = self.engine.name(),
            "starting verification"
        );

        if !self.engine.is_available() {
            let err = VvError::EngineUnavailable(format!(
                "engine `{}` is not usable (missing binary or runtime)",
                self.engine.name()
            ));
            tracing::warn!(pair_id = %pair_id, stage = %PairStage::Failed, "{err}");
            return Ok(self.error_result(&reference, &candidate, String::new(), err.to_string()));
        }

        tracing::debug!(pair_id = %pair_id, stage = %PairStage::Invoking, "launching scoring engine");
        let invocation = match self.engine.invoke(&reference, &candidate) {
            Ok(invocation) => invocation,
            Err(err) => {
                tracing::warn!(
                    pair_id = %pair_id,
                    stage = %PairStage::Failed,
                    code = err.error_code(),
                    "engine launch failed: {err}"
                );
                return Ok(self.error_result(
                    &reference,
                    &candidate,
                    String::new(),
                    err.to_string(),
                ));
            }
        };

        if invocation.timed_out {
            let err = VvError::ProcessTimeout {
                engine: self.engine.name().to_owned(),
                timeout_ms: saturating_duration_ms(self.engine.timeout()),
            };
            tracing::warn!(pair_id = %pair_id, stage = %PairStage::Failed, "{err}");
            // Partial output is kept; it often names the file the engine
            // was stuck on.
            return Ok(self.error_result(
                &reference,
                &candidate,
                combined_output(&invocation),
                err.to_string(),
            ));
        }

        tracing::debug!(
            pair_id = %pair_id,
            stage = %PairStage::Parsing,
            exit_code = invocation.exit_code,
            "parsing engine output"
        );
        let verdict = match parse::parse(&invocation) {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::warn!(
                    pair_id = %pair_id,
                    stage = %PairStage::Failed,
                    code = err.error_code(),
                    "engine output rejected: {err}"
                );
                return Ok(self.error_result(
                    &reference,
                    &candidate,
                    raw_output_for_error(&invocation, &err),
                    err.to_string(),
                ));
            }
        };

        let threshold = self.config.threshold;
        let confidence = classify::classify(verdict.score, threshold);
        tracing::info!(
            pair_id = %pair_id,
            stage = %PairStage::Classified,
            score = verdict.score,
            status = verdict.status.as_str(),
            confidence = confidence.as_str(),
            "verification complete in {:.2}s",
            invocation.wall_clock_seconds
        );

        Ok(VerificationResult {
            success: true,
            score: Some(verdict.score),
            threshold,
            verification_status: verdict.status,
            far_percentage: classify::far_percentage(threshold),
            confidence_level: confidence,
            reference_file: display_path(&reference),
            candidate_file: display_path(&candidate),
            raw_output: invocation.stdout_text,
            error_message: None,
        })
    }

    /// Score many pairs. Strictly sequential: the vendor license file is
    /// exclusive, so pairs never run concurrently. Returns one result per
    /// input pair in input order; the fail-fast errors `verify_pair` raises
    /// are folded into error-shaped results here so one bad pair never
    /// aborts the rest.
    pub fn verify_batch(&self, pairs: &[(PathBuf, PathBuf)]) -> Vec<VerificationResult> {
        let batch_id = Uuid::new_v4().to_string();
        tracing::info!(batch_id = %batch_id, pairs = pairs.len(), "starting verification batch");

        let mut results = Vec::with_capacity(pairs.len());
        for (index, (reference, candidate)) in pairs.iter().enumerate() {
            tracing::info!(
                batch_id = %batch_id,
                "processing pair {}/{}: {} vs {}",
                index + 1,
                pairs.len(),
                file_label(reference),
                file_label(candidate)
            );
            let result = match self.verify_pair(reference, candidate) {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(
                        batch_id = %batch_id,
                        code = err.error_code(),
                        "pair rejected: {err}"
                    );
                    self.error_result(
                        &absolutize(reference),
                        &absolutize(candidate),
                        String::new(),
                        err.to_string(),
                    )
                }
            };
            results.push(result);
        }
        results
    }

    /// Snapshot of the resolved SDK layout and engine readiness.
    #[must_use]
    pub fn info(&self) -> EngineReport {
        let binary = engine::engine_binary(self.config.engine, &self.layout);
        let library_dir = self.layout.library_dir();
        let library_exists = library_dir.is_dir();
        EngineReport {
            generated_at_rfc3339: Utc::now().to_rfc3339(),
            sdk_root: self.layout.root().display().to_string(),
            engine: self.config.engine,
            engine_binary: binary.display().to_string(),
            binary_exists: binary.is_file(),
            library_path: library_exists.then(|| library_dir.display().to_string()),
            library_exists,
            threshold: self.config.threshold,
            far_percentage: classify::far_percentage(self.config.threshold),
        }
    }

    /// Common shape of every non-`Err` failure: no score, `Error` status,
    /// floor confidence, FAR still derived from the configured threshold.
    fn error_result(
        &self,
        reference: &Path,
        candidate: &Path,
        raw_output: String,
        message: String,
    ) -> VerificationResult {
        VerificationResult {
            success: false,
            score: None,
            threshold: self.config.threshold,
            verification_status: VerificationStatus::Error,
            far_percentage: classify::far_percentage(self.config.threshold),
            confidence_level: ConfidenceLevel::Low,
            reference_file: display_path(reference),
            candidate_file: display_path(candidate),
            raw_output,
            error_message: Some(message),
        }
    }
}

/// Absolute form of the path; resolves relative inputs against the current
/// directory without requiring the file to exist.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Stdout then stderr, the way the raw engine transcript is preserved on
/// process-level failures.
fn combined_output(invocation: &ScoringInvocation) -> String {
    format!("{}{}", invocation.stdout_text, invocation.stderr_text)
}

/// Process-level failures keep both streams; parse-level failures keep only
/// stdout, which is the text the patterns actually rejected.
fn raw_output_for_error(invocation: &ScoringInvocation, err: &VvError) -> String {
    match err {
        VvError::ProcessError { .. } => combined_output(invocation),
        _ => invocation.stdout_text.clone(),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
