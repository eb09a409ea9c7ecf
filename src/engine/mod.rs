mod managed;
mod native;

pub use managed::ManagedEngine;
pub use native::NativeEngine;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::VvResult;
use crate::model::{EngineKind, ScoringInvocation};
use crate::process::Capture;
use crate::sdk::SdkLayout;

/// Contract every scorer satisfies. The orchestrator only ever talks to this
/// trait, so a stub engine slots in without touching verification logic.
pub trait ScoringEngine: Send + Sync {
    /// Human-readable engine name.
    fn name(&self) -> &'static str;

    /// Which `EngineKind` this engine corresponds to.
    fn kind(&self) -> EngineKind;

    /// Whether the engine's external artifacts are currently present.
    fn is_available(&self) -> bool;

    /// Hard wall-clock budget for one scoring run.
    fn timeout(&self) -> Duration;

    /// Score one reference/candidate pair. A nonzero exit code or an expired
    /// budget is data in the returned invocation, never `Err`; only spawn and
    /// pipe failures are errors.
    fn invoke(&self, reference: &Path, candidate: &Path) -> VvResult<ScoringInvocation>;
}

/// Build the engine selected by `kind` over an already located SDK.
#[must_use]
pub fn engine_for(kind: EngineKind, layout: &SdkLayout) -> Box<dyn ScoringEngine> {
    match kind {
        EngineKind::Native => Box::new(NativeEngine::new(layout.clone())),
        EngineKind::Managed => Box::new(ManagedEngine::new(layout.clone())),
    }
}

/// Program the selected engine launches, for diagnostics output.
pub(crate) fn engine_binary(kind: EngineKind, layout: &SdkLayout) -> PathBuf {
    match kind {
        EngineKind::Native => native::scoring_binary(layout),
        EngineKind::Managed => PathBuf::from(managed::java_binary()),
    }
}

pub(crate) fn invocation_from_capture(
    reference: &Path,
    candidate: &Path,
    capture: Capture,
) -> ScoringInvocation {
    ScoringInvocation {
        reference_path: reference.to_path_buf(),
        candidate_path: candidate.to_path_buf(),
        exit_code: capture.exit_code,
        stdout_text: capture.stdout,
        stderr_text: capture.stderr,
        timed_out: capture.timed_out,
        wall_clock_seconds: capture.wall_clock.as_secs_f64(),
    }
}
