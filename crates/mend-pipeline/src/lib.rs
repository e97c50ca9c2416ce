//! Mend Pipeline
//!
//! Turns the free-form text a language model returned into well-formed
//! structured data.
//!
//! # Overview
//!
//! Model output that was asked to be JSON (or code wrapped in a JSON object)
//! regularly arrives inside markdown fences, with trailing commas, with
//! single quotes, or cut off mid-string. The pipeline escalates through
//! progressively more expensive stages until one of them yields a value:
//!
//! ```text
//! Raw text → Fence Extractor → Strict Parser → Structural Repair
//!          → Model Correction → Model Wrapper → Fallback
//! ```
//!
//! # Key Features
//!
//! - **Fence Extraction**: tagged fences, custom `<tag>` pairs, generic fences
//! - **Local Repair**: single-pass fix-up of near-valid JSON, no model needed
//! - **Model-Assisted Repair**: bounded re-prompting for the corrected payload
//! - **Never Fails**: the fallback object guarantees a structured result
//! - **Diagnostics**: every attempt is recorded on the [`FinalResult`]
//!
//! # Example Usage
//!
//! ```no_run
//! use mend_pipeline::{PipelineConfig, RepairPipeline, TaskHint};
//! use mend_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new("{\"a\": 1}");
//! let pipeline = RepairPipeline::new(llm, PipelineConfig::default())?;
//!
//! let result = pipeline.run("Here you go:\n```json\n{\"a\": 1,}\n```", TaskHint::Json).await;
//!
//! println!("Resolved by: {}", result.resolved_by);
//! println!("Value: {}", result.value);
//! println!("Attempts: {}", result.diagnostics.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod fallback;
mod fence;
mod parser;
mod pipeline;
mod prompt;
mod repair;


pub use config::PipelineConfig;
pub use error::RepairError;
pub use fallback::synthesize as synthesize_fallback;
pub use fence::{FenceExtractor, Matcher};
pub use parser::parse_strict;
pub use pipeline::RepairPipeline;
pub use repair::{repair_json, structural_repair};

pub use mend_domain::{
    Candidate, CandidateSource, FinalResult, ParseResult, RepairAttempt, Strategy, TaskHint,
};
