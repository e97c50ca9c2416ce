//! Stage driver for the repair pipeline

use crate::config::PipelineConfig;
use crate::error::RepairError;
use crate::fallback::synthesize;
use crate::fence::FenceExtractor;
use crate::parser::{check_code_wrapper, check_plausible, is_code_payload, parse_strict, wrap_code};
use crate::prompt::{extract_code_body, PromptBuilder};
use crate::repair::structural_repair;
use mend_domain::traits::LlmProvider;
use mend_domain::{Candidate, FinalResult, ParseResult, RepairAttempt, Strategy, TaskHint};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const CODE_PAYLOAD_NOTE: &str = "Code extracted from the model response";
const CODE_REPAIRED_NOTE: &str = "Code was repaired after a formatting error";

/// Escalation stages, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Strict,
    Structural,
    ModelCorrection,
    ModelWrapper,
}

const STAGES: [Stage; 4] = [
    Stage::Strict,
    Stage::Structural,
    Stage::ModelCorrection,
    Stage::ModelWrapper,
];

impl Stage {
    fn strategy(self) -> Strategy {
        match self {
            Stage::Strict => Strategy::Strict,
            Stage::Structural => Strategy::Structural,
            Stage::ModelCorrection => Strategy::ModelCorrection,
            Stage::ModelWrapper => Strategy::ModelWrapper,
        }
    }
}

/// Result of running one stage
enum StageOutcome {
    Resolved { value: Value, note: Option<String> },
    Escalate(RepairError),
}

impl StageOutcome {
    fn resolved(value: Value) -> Self {
        StageOutcome::Resolved { value, note: None }
    }

    fn resolved_with(value: Value, note: impl Into<String>) -> Self {
        StageOutcome::Resolved {
            value,
            note: Some(note.into()),
        }
    }
}

/// Turns raw model output into a well-formed structured value
///
/// Holds no per-invocation state, so one pipeline can serve concurrent
/// calls to [`RepairPipeline::run`].
pub struct RepairPipeline<L>
where
    L: LlmProvider,
{
    llm_provider: Arc<L>,
    config: PipelineConfig,
    extractor: FenceExtractor,
}

impl<L> RepairPipeline<L>
where
    L: LlmProvider,
{
    /// Create a new pipeline
    ///
    /// Fails only when the configuration is invalid.
    pub fn new(llm_provider: L, config: PipelineConfig) -> Result<Self, RepairError> {
        Self::with_shared_provider(Arc::new(llm_provider), config)
    }

    /// Create a new pipeline around an already shared provider
    pub fn with_shared_provider(
        llm_provider: Arc<L>,
        config: PipelineConfig,
    ) -> Result<Self, RepairError> {
        config.validate()?;
        let extractor = FenceExtractor::new(&config)?;
        Ok(Self {
            llm_provider,
            config,
            extractor,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run only the fence extractor
    pub fn extract(&self, raw: &str, hint: TaskHint) -> Option<Candidate> {
        self.extractor.extract(raw, hint)
    }

    /// Repair `raw` into a structured value
    ///
    /// Never fails: when every stage is exhausted the fallback object is
    /// returned and `resolved_by` is [`Strategy::Fallback`].
    pub async fn run(&self, raw: &str, hint: TaskHint) -> FinalResult {
        info!("Starting repair for {} hint, raw length {}", hint, raw.len());

        let mut diagnostics = Vec::new();

        let candidate = match self.extractor.extract(raw, hint) {
            Some(candidate) => candidate,
            None => {
                warn!("{}", RepairError::ExtractionMiss);
                return self.fallback(raw, diagnostics, Some(RepairError::ExtractionMiss));
            }
        };

        debug!(
            "Candidate from {}, {} chars",
            candidate.source,
            candidate.char_len()
        );

        for stage in STAGES {
            let strategy = stage.strategy();
            let started = Instant::now();
            let outcome = self.run_stage(stage, &candidate, hint).await;
            let elapsed = started.elapsed();

            match outcome {
                StageOutcome::Resolved { value, note } => {
                    info!("Resolved by {} in {:?}", strategy, elapsed);
                    let mut attempt = RepairAttempt::new(strategy, ParseResult::Parsed(value.clone()));
                    if let Some(note) = note {
                        attempt = attempt.with_note(note);
                    }
                    diagnostics.push(attempt);
                    return FinalResult {
                        value,
                        resolved_by: strategy,
                        diagnostics,
                    };
                }
                StageOutcome::Escalate(err) => {
                    if strategy.calls_model() {
                        warn!("{} failed after {:?}: {}", strategy, elapsed, err);
                    } else {
                        debug!("{} failed: {}", strategy, err);
                    }
                    diagnostics.push(RepairAttempt::new(
                        strategy,
                        ParseResult::Failed(err.to_string()),
                    ));
                }
            }
        }

        self.fallback(raw, diagnostics, None)
    }

    async fn run_stage(&self, stage: Stage, candidate: &Candidate, hint: TaskHint) -> StageOutcome {
        match stage {
            Stage::Strict => self.strict(candidate, hint),
            Stage::Structural => self.structural(candidate, hint),
            Stage::ModelCorrection => self.model_correction(candidate, hint).await,
            Stage::ModelWrapper => self.model_wrapper(candidate, hint).await,
        }
    }

    fn strict(&self, candidate: &Candidate, hint: TaskHint) -> StageOutcome {
        if is_code_payload(candidate, hint) {
            let value = wrap_code(&self.config, &candidate.content, CODE_PAYLOAD_NOTE);
            return StageOutcome::resolved_with(
                value,
                format!("Code payload from {}", candidate.source),
            );
        }

        match parse_strict(&candidate.content) {
            ParseResult::Parsed(value) => self.accept_local(value, hint),
            ParseResult::Failed(e) => StageOutcome::Escalate(RepairError::Parse(e)),
        }
    }

    fn structural(&self, candidate: &Candidate, hint: TaskHint) -> StageOutcome {
        match structural_repair(&candidate.content) {
            (_, ParseResult::Parsed(value)) => self.accept_local(value, hint),
            (_, ParseResult::Failed(e)) => StageOutcome::Escalate(RepairError::Parse(e)),
        }
    }

    /// Under the `code` hint a locally decoded value must be a code wrapper
    fn accept_local(&self, value: Value, hint: TaskHint) -> StageOutcome {
        if hint == TaskHint::Code {
            if let Err(reason) = check_code_wrapper(&self.config, &value) {
                return StageOutcome::Escalate(RepairError::RepairInconclusive(format!(
                    "Decoded value is not a code wrapper: {}",
                    reason
                )));
            }
        }
        StageOutcome::resolved(value)
    }

    fn model_precheck(&self, candidate: &Candidate) -> Result<(), RepairError> {
        if !self.config.model_repair_enabled {
            return Err(RepairError::RepairInconclusive(
                "Model repair disabled".to_string(),
            ));
        }
        let len = candidate.char_len();
        if len > self.config.max_model_payload_chars {
            return Err(RepairError::RepairInconclusive(format!(
                "Candidate too large for model repair ({} chars)",
                len
            )));
        }
        Ok(())
    }

    /// Steps A-C: ask for the corrected raw content, then build and
    /// validate the wrapper locally
    async fn model_correction(&self, candidate: &Candidate, hint: TaskHint) -> StageOutcome {
        if let Err(e) = self.model_precheck(candidate) {
            return StageOutcome::Escalate(e);
        }

        let payload = match hint {
            TaskHint::Code => extract_code_body(&candidate.content, &self.config.core_field)
                .unwrap_or_else(|| candidate.content.clone()),
            TaskHint::Json => candidate.content.clone(),
        };

        let prompt = PromptBuilder::new(&self.config, hint, &payload).correction();
        debug!("Correction prompt length: {} chars", prompt.len());

        let response = match self.call_model(&prompt, None).await {
            Ok(response) => response,
            Err(e) => return StageOutcome::Escalate(e),
        };

        let cleaned = match self.extractor.extract(&response, hint) {
            Some(cleaned) => cleaned,
            None => return StageOutcome::Escalate(RepairError::EmptyResponse),
        };

        let value = match hint {
            TaskHint::Code => self.code_wrapper_from(&cleaned),
            TaskHint::Json => match decode(&cleaned.content) {
                Ok(value) => value,
                Err(e) => return StageOutcome::Escalate(e),
            },
        };

        // Round-trip the constructed value to make sure it serializes cleanly
        let value = match serde_json::to_string(&value).map(|s| parse_strict(&s)) {
            Ok(ParseResult::Parsed(value)) => value,
            Ok(ParseResult::Failed(e)) => return StageOutcome::Escalate(RepairError::Parse(e)),
            Err(e) => return StageOutcome::Escalate(e.into()),
        };

        match check_plausible(&self.config, &cleaned.content, &value, hint) {
            Ok(()) => StageOutcome::resolved(value),
            Err(reason) => StageOutcome::Escalate(RepairError::RepairInconclusive(reason)),
        }
    }

    /// Build the code wrapper around cleaned model output
    ///
    /// A model that ignored the instructions and returned a full wrapper
    /// anyway gets its wrapper used as is.
    fn code_wrapper_from(&self, cleaned: &Candidate) -> Value {
        if cleaned.is_json_shaped() {
            if let Ok(value) = decode(&cleaned.content) {
                if value.get(&self.config.core_field).is_some_and(Value::is_string) {
                    return value;
                }
            }
        }
        wrap_code(&self.config, &cleaned.content, CODE_REPAIRED_NOTE)
    }

    /// Second request: ask for the entire wrapper
    async fn model_wrapper(&self, candidate: &Candidate, hint: TaskHint) -> StageOutcome {
        if let Err(e) = self.model_precheck(candidate) {
            return StageOutcome::Escalate(e);
        }

        let backoff = self.config.model_retry_backoff();
        if !backoff.is_zero() {
            tokio::time::sleep(backoff).await;
        }

        let builder = PromptBuilder::new(&self.config, hint, &candidate.content);
        let schema = builder.wrapper_schema();
        let response = match self.call_model(&builder.wrapper(), Some(&schema)).await {
            Ok(response) => response,
            Err(e) => return StageOutcome::Escalate(e),
        };

        let cleaned = match self.extractor.extract(&response, TaskHint::Json) {
            Some(cleaned) => cleaned,
            None => return StageOutcome::Escalate(RepairError::EmptyResponse),
        };

        let value = match decode(&cleaned.content) {
            Ok(value) => value,
            Err(e) => return StageOutcome::Escalate(e),
        };

        match check_plausible(&self.config, &cleaned.content, &value, hint) {
            Ok(()) => StageOutcome::resolved(value),
            Err(reason) => StageOutcome::Escalate(RepairError::RepairInconclusive(reason)),
        }
    }

    /// Call the LLM provider within the configured time budget
    async fn call_model(&self, prompt: &str, schema: Option<&str>) -> Result<String, RepairError> {
        let call = async {
            match schema {
                Some(schema) => self.llm_provider.generate_structured(prompt, schema).await,
                None => self.llm_provider.generate(prompt).await,
            }
        };

        let response = timeout(self.config.model_timeout(), call)
            .await
            .map_err(|_| RepairError::Timeout)?
            .map_err(|e| RepairError::Upstream(e.to_string()))?;

        debug!("LLM response length: {} chars", response.len());

        if response.trim().is_empty() {
            return Err(RepairError::EmptyResponse);
        }
        Ok(response)
    }

    fn fallback(
        &self,
        raw: &str,
        mut diagnostics: Vec<RepairAttempt>,
        reason: Option<RepairError>,
    ) -> FinalResult {
        warn!("All repair stages failed, returning fallback result");

        let value = synthesize(&self.config, raw);
        let mut attempt = RepairAttempt::new(Strategy::Fallback, ParseResult::Parsed(value.clone()));
        if let Some(reason) = reason {
            attempt = attempt.with_note(reason.to_string());
        }
        diagnostics.push(attempt);

        FinalResult {
            value,
            resolved_by: Strategy::Fallback,
            diagnostics,
        }
    }
}

/// Strict parse, then structural repair
fn decode(text: &str) -> Result<Value, RepairError> {
    if let ParseResult::Parsed(value) = parse_strict(text) {
        return Ok(value);
    }
    match structural_repair(text) {
        (_, ParseResult::Parsed(value)) => Ok(value),
        (_, ParseResult::Failed(e)) => Err(RepairError::Parse(e)),
    }
}
