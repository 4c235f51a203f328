// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod identity;
pub mod ledger;
pub mod merge;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod sources;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::identity::{fingerprint, Fingerprint};
pub use crate::ledger::PostedLedger;
pub use crate::merge::{merge, MergedAlert, RawAlert, SourceTag};
pub use crate::pipeline::{run_once, PostOutcome, RunContext, RunSummary};
pub use crate::render::render;
