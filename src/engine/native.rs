use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::VvResult;
use crate::model::{EngineKind, ScoringInvocation};
use crate::process::{duration_from_env, run_captured};
use crate::sdk::SdkLayout;

use super::{ScoringEngine, invocation_from_capture};

const NATIVE_BIN_ENV: &str = "VERIVOICE_NATIVE_BIN";

/// The compiled SDK tutorial binary. Runs from the binary's own directory so
/// the license files it opens by relative path resolve, with the SDK's
/// shared-library directory prepended to `LD_LIBRARY_PATH`.
pub struct NativeEngine {
    layout: SdkLayout,
}

impl NativeEngine {
    #[must_use]
    pub fn new(layout: SdkLayout) -> Self {
        Self { layout }
    }
}

impl ScoringEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "verify-voice-cpp"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Native
    }

    fn is_available(&self) -> bool {
        scoring_binary(&self.layout).is_file()
    }

    fn timeout(&self) -> Duration {
        duration_from_env("VERIVOICE_NATIVE_TIMEOUT_MS", Duration::from_secs(60))
    }

    fn invoke(&self, reference: &Path, candidate: &Path) -> VvResult<ScoringInvocation> {
        let binary = scoring_binary(&self.layout);
        let args = vec![
            reference.display().to_string(),
            candidate.display().to_string(),
        ];
        let envs = vec![(
            "LD_LIBRARY_PATH".to_owned(),
            library_search_path(&self.layout),
        )];
        let cwd = binary
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);

        tracing::debug!(
            binary = %binary.display(),
            reference = %reference.display(),
            candidate = %candidate.display(),
            "launching native scorer"
        );

        let capture = run_captured(
            &binary.display().to_string(),
            &args,
            cwd.as_deref(),
            &envs,
            self.timeout(),
        )?;
        Ok(invocation_from_capture(reference, candidate, capture))
    }
}

pub(crate) fn scoring_binary(layout: &SdkLayout) -> PathBuf {
    std::env::var(NATIVE_BIN_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| layout.native_binary())
}

/// The SDK's shared libraries first, then whatever the caller already had.
fn library_search_path(layout: &SdkLayout) -> String {
    let lib_dir = layout.library_dir().display().to_string();
    match std::env::var("LD_LIBRARY_PATH") {
        Ok(current) if !current.is_empty() => format!("{lib_dir}:{current}"),
        _ => lib_dir,
    }
}
