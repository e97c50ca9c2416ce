//! Mend Domain Layer
//!
//! Core data model for repairing structured output returned by language models.
//! The types here carry no behavior beyond construction and inspection; the
//! repair stages themselves live in `mend-pipeline`.
//!
//! ## Key Concepts
//!
//! - **Candidate**: a slice of a raw model response that probably holds the payload
//! - **ParseResult**: decoded value or parser diagnostic for one attempt
//! - **RepairAttempt**: which strategy ran and what it produced
//! - **FinalResult**: the value handed back to the caller, always well-formed
//!
//! ## Architecture
//!
//! - Pure data types and the `LlmProvider` capability trait
//! - Provider implementations live in `mend-llm`
//! - The escalation driver lives in `mend-pipeline`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod candidate;
pub mod outcome;
pub mod traits;

// Re-exports for convenience
pub use candidate::{Candidate, CandidateSource, TaskHint};
pub use outcome::{FinalResult, ParseResult, RepairAttempt, Strategy};
