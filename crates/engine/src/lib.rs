//! Optimization detection and lifecycle reclassification engine.
//!
//! One run covers one (organization, module) pair: resolve options, select
//! eligible cloud accounts, detect fresh candidates, diff against the
//! previous run's active set, archive what disappeared with a precise
//! reason, and commit the result atomically.

pub mod archive;
pub mod context;
pub mod detector;
pub mod error;
pub mod modules;
pub mod options;
pub mod orchestrator;
pub mod selector;

pub use context::DetectionContext;
pub use detector::{DetectionOutcome, Detector, ModuleKind, RunInputs};
pub use error::EngineError;
pub use orchestrator::{run_organization, RunReport};
