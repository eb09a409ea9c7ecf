use std::path::Path;
use std::time::Duration;

use crate::error::VvResult;
use crate::model::{EngineKind, ScoringInvocation};
use crate::process::{command_exists, duration_from_env, run_captured};
use crate::sdk::SdkLayout;

use super::{ScoringEngine, invocation_from_capture};

const JAVA_BIN_ENV: &str = "VERIVOICE_JAVA_BIN";
const DEFAULT_JAVA_BIN: &str = "java";

/// Class name of the SDK's Java tutorial; compiled into the tutorial
/// directory the engine runs from.
const MAIN_CLASS: &str = "SimpleVerifyVoice";

/// The SDK's Java tutorial on a JVM. Runs from the tutorial directory where
/// the compiled class lives, with the vendor jars on the classpath and the
/// JNI libraries wired through `java.library.path`.
pub struct ManagedEngine {
    layout: SdkLayout,
}

impl ManagedEngine {
    #[must_use]
    pub fn new(layout: SdkLayout) -> Self {
        Self { layout }
    }
}

impl ScoringEngine for ManagedEngine {
    fn name(&self) -> &'static str {
        "verify-voice-java"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Managed
    }

    fn is_available(&self) -> bool {
        command_exists(&java_binary()) && self.layout.managed_work_dir().is_dir()
    }

    fn timeout(&self) -> Duration {
        duration_from_env("VERIVOICE_MANAGED_TIMEOUT_MS", Duration::from_secs(120))
    }

    fn invoke(&self, reference: &Path, candidate: &Path) -> VvResult<ScoringInvocation> {
        let args = build_java_args(&self.layout, reference, candidate);
        let work_dir = self.layout.managed_work_dir();

        tracing::debug!(
            work_dir = %work_dir.display(),
            reference = %reference.display(),
            candidate = %candidate.display(),
            "launching managed scorer"
        );

        let capture = run_captured(
            &java_binary(),
            &args,
            Some(work_dir.as_path()),
            &[],
            self.timeout(),
        )?;
        Ok(invocation_from_capture(reference, candidate, capture))
    }
}

fn build_java_args(layout: &SdkLayout, reference: &Path, candidate: &Path) -> Vec<String> {
    vec![
        format!("-Djava.library.path={}", layout.library_dir().display()),
        "-cp".to_owned(),
        format!("{}/*:.", layout.managed_classpath_dir().display()),
        MAIN_CLASS.to_owned(),
        reference.display().to_string(),
        candidate.display().to_string(),
    ]
}

pub(crate) fn java_binary() -> String {
    std::env::var(JAVA_BIN_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_JAVA_BIN.to_owned())
}
