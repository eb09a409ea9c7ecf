#![forbid(unsafe_code)]

pub mod classify;
pub mod cli;
pub mod convert;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod parse;
pub mod probe;
pub mod process;
pub mod sdk;

pub use error::{VvError, VvResult};
pub use model::{
    AudioAsset, ConversionRequest, EngineKind, ValidationReport, VerificationResult,
    VerificationStatus, VerifierConfig,
};
pub use orchestrator::VoiceVerifier;
