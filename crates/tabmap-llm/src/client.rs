//! Per-tier client: budget gate, retry, extraction, usage accounting.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use tabmap_model::{ModelTier, Thresholds, UsageRecord};

use crate::capability::{CompletionRequest, LanguageModel};
use crate::error::LlmError;
use crate::extract::{Extracted, extract_json, extract_json_lenient};
use crate::ledger::{UsageLedger, now_timestamp};

/// Output-token estimate used by the budget gate. A deliberate, conservative
/// approximation - not a live tokenizer count.
const ESTIMATED_OUTPUT_TOKENS: u64 = 1000;
/// Rough prompt-bytes-per-token divisor for the input estimate.
const BYTES_PER_TOKEN: usize = 4;

/// Scale a tier's output contract uses for confidence values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceScale {
    /// 0-100, the cheap tier's JSON contract.
    Percent,
    /// 0.0-1.0, the deep tier's JSON contract.
    Unit,
}

/// Configuration distinguishing the two tiers. Both tiers share one call
/// path; everything tier-specific lives here.
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub tier: ModelTier,
    /// Cost per 1000 input tokens.
    pub input_rate_per_1k: f64,
    /// Cost per 1000 output tokens.
    pub output_rate_per_1k: f64,
    pub max_retries: u32,
    /// Attempt N waits `retry_base_delay * N` before retrying.
    pub retry_base_delay: Duration,
    /// Daily spend ceiling; `None` disables the budget gate.
    pub daily_budget: Option<f64>,
    pub confidence_scale: ConfidenceScale,
    /// Run the JSON repair passes before giving up on extraction. The cheap
    /// tier's output is observed to be less strictly formatted.
    pub lenient_repair: bool,
    pub default_max_tokens: u32,
    pub default_temperature: f64,
}

impl TierConfig {
    pub fn cheap(thresholds: &Thresholds) -> Self {
        Self {
            tier: ModelTier::Cheap,
            input_rate_per_1k: 0.003,
            output_rate_per_1k: 0.015,
            max_retries: thresholds.max_retries,
            retry_base_delay: Duration::from_millis(thresholds.retry_base_delay_ms),
            daily_budget: None,
            confidence_scale: ConfidenceScale::Percent,
            lenient_repair: true,
            default_max_tokens: 4096,
            default_temperature: 0.2,
        }
    }

    pub fn deep(thresholds: &Thresholds) -> Self {
        Self {
            tier: ModelTier::Deep,
            input_rate_per_1k: 0.015,
            output_rate_per_1k: 0.075,
            max_retries: thresholds.max_retries,
            retry_base_delay: Duration::from_millis(thresholds.retry_base_delay_ms),
            daily_budget: Some(thresholds.daily_budget),
            confidence_scale: ConfidenceScale::Unit,
            lenient_repair: false,
            default_max_tokens: 8192,
            default_temperature: 0.1,
        }
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Bypass the budget gate.
    pub force: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Accounting attached to every successful call.
#[derive(Debug, Clone)]
pub struct CallMetadata {
    pub model: String,
    pub tier: ModelTier,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct CallOutcome {
    pub result: Extracted,
    pub metadata: CallMetadata,
}

/// One tier of the language-model capability.
pub struct TierClient {
    model: Arc<dyn LanguageModel>,
    config: TierConfig,
    ledger: UsageLedger,
}

impl TierClient {
    pub fn new(model: Arc<dyn LanguageModel>, config: TierConfig, ledger: UsageLedger) -> Self {
        Self {
            model,
            config,
            ledger,
        }
    }

    pub fn tier(&self) -> ModelTier {
        self.config.tier
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    /// Estimated cost for one call: prompt-length input tokens plus the
    /// fixed output estimate, at this tier's rates.
    pub fn estimate_cost(&self, prompt: &str) -> f64 {
        let input_tokens = (prompt.len() / BYTES_PER_TOKEN) as f64;
        input_tokens / 1000.0 * self.config.input_rate_per_1k
            + ESTIMATED_OUTPUT_TOKENS as f64 / 1000.0 * self.config.output_rate_per_1k
    }

    /// Calls the model with budget gating, bounded retry, and extraction.
    ///
    /// Every attempt - success or failure - is appended to the usage ledger.
    /// Extraction failure is not an error here: the outcome carries the raw
    /// text so callers that tolerate degraded results can keep it.
    pub fn call(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &CallOptions,
    ) -> Result<CallOutcome, LlmError> {
        if let Some(ceiling) = self.config.daily_budget
            && !options.force
        {
            let spent = self.ledger.cost_today(self.config.tier)?;
            let estimated = self.estimate_cost(prompt);
            if spent + estimated > ceiling {
                warn!(
                    tier = %self.config.tier,
                    spent,
                    estimated,
                    ceiling,
                    "budget gate rejected call"
                );
                return Err(LlmError::BudgetExceeded {
                    spent,
                    estimated,
                    ceiling,
                });
            }
        }

        let request = CompletionRequest {
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(String::from),
            max_tokens: options.max_tokens.unwrap_or(self.config.default_max_tokens),
            temperature: options
                .temperature
                .unwrap_or(self.config.default_temperature),
        };

        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            let start = Instant::now();
            match self.model.complete(&request) {
                Ok(completion) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    let cost = self.compute_cost(
                        completion.usage.input_tokens,
                        completion.usage.output_tokens,
                    );
                    self.append_record(UsageRecord {
                        timestamp: now_timestamp(),
                        model: self.model.model_name().to_string(),
                        tier: self.config.tier,
                        input_tokens: completion.usage.input_tokens,
                        output_tokens: completion.usage.output_tokens,
                        cost,
                        elapsed_ms,
                        success: true,
                        error: None,
                    });
                    debug!(
                        tier = %self.config.tier,
                        model = self.model.model_name(),
                        input_tokens = completion.usage.input_tokens,
                        output_tokens = completion.usage.output_tokens,
                        cost,
                        elapsed_ms,
                        "model call succeeded"
                    );
                    let result = if self.config.lenient_repair {
                        extract_json_lenient(&completion.text)
                    } else {
                        match extract_json(&completion.text) {
                            Some(value) => Extracted::Parsed(value),
                            None => Extracted::Raw(completion.text),
                        }
                    };
                    return Ok(CallOutcome {
                        result,
                        metadata: CallMetadata {
                            model: self.model.model_name().to_string(),
                            tier: self.config.tier,
                            input_tokens: completion.usage.input_tokens,
                            output_tokens: completion.usage.output_tokens,
                            cost,
                            elapsed_ms,
                        },
                    });
                }
                Err(error) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    last_error = error.to_string();
                    self.append_record(UsageRecord {
                        timestamp: now_timestamp(),
                        model: self.model.model_name().to_string(),
                        tier: self.config.tier,
                        input_tokens: 0,
                        output_tokens: 0,
                        cost: 0.0,
                        elapsed_ms,
                        success: false,
                        error: Some(last_error.clone()),
                    });
                    warn!(
                        tier = %self.config.tier,
                        attempt,
                        attempts,
                        error = %last_error,
                        "model call failed"
                    );
                    if attempt < attempts {
                        thread::sleep(self.config.retry_base_delay * attempt);
                    }
                }
            }
        }
        Err(LlmError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    /// Like [`Self::call`] but a degraded (unparseable) result is an error.
    pub fn call_strict(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &CallOptions,
    ) -> Result<(Value, CallMetadata), LlmError> {
        let outcome = self.call(prompt, system_prompt, options)?;
        match outcome.result {
            Extracted::Parsed(value) => Ok((value, outcome.metadata)),
            Extracted::Raw(text) => {
                let preview: String = text.chars().take(120).collect();
                Err(LlmError::StrictParse(preview))
            }
        }
    }

    fn compute_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1000.0 * self.config.input_rate_per_1k
            + output_tokens as f64 / 1000.0 * self.config.output_rate_per_1k
    }

    fn append_record(&self, record: UsageRecord) {
        // Accounting failures must not fail the call itself.
        if let Err(error) = self.ledger.record(&record) {
            warn!(error = %error, "failed to append usage record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ScriptedModel;
    use tempfile::TempDir;

    fn fast_thresholds() -> Thresholds {
        Thresholds {
            retry_base_delay_ms: 0,
            ..Thresholds::default()
        }
    }

    fn ledger_in(dir: &TempDir) -> UsageLedger {
        UsageLedger::new(dir.path().join("usage.jsonl"))
    }

    #[test]
    fn successful_call_parses_fenced_json() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new("scripted")
            .with_response("```json\n{\"ok\": true}\n```");
        let client = TierClient::new(
            Arc::new(model),
            TierConfig::cheap(&fast_thresholds()),
            ledger_in(&dir),
        );
        let outcome = client.call("prompt", None, &CallOptions::default()).unwrap();
        let value = outcome.result.as_parsed().unwrap();
        assert_eq!(value["ok"], true);
        assert!(outcome.metadata.cost > 0.0);
    }

    #[test]
    fn retries_then_succeeds_and_logs_failures() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new("scripted")
            .with_failure("transient")
            .with_response("{\"ok\": 1}");
        let ledger = ledger_in(&dir);
        let client = TierClient::new(
            Arc::new(model),
            TierConfig::cheap(&fast_thresholds()),
            ledger.clone(),
        );
        let outcome = client.call("prompt", None, &CallOptions::default()).unwrap();
        assert!(outcome.result.as_parsed().is_some());

        let today = chrono::Utc::now().date_naive();
        let records = ledger.load_range(today, today).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].success);
        assert_eq!(records[0].cost, 0.0);
        assert!(records[1].success);
    }

    #[test]
    fn exhausted_retries_surface_last_error() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new("scripted")
            .with_failure("one")
            .with_failure("two")
            .with_failure("three");
        let client = TierClient::new(
            Arc::new(model),
            TierConfig::cheap(&fast_thresholds()),
            ledger_in(&dir),
        );
        let error = client
            .call("prompt", None, &CallOptions::default())
            .unwrap_err();
        match error {
            LlmError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("three"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn budget_gate_rejects_before_any_attempt() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        // Spend nearly the whole ceiling today.
        ledger
            .record(&UsageRecord {
                timestamp: now_timestamp(),
                model: "deep-model".to_string(),
                tier: ModelTier::Deep,
                input_tokens: 1,
                output_tokens: 1,
                cost: 49.99,
                elapsed_ms: 1,
                success: true,
                error: None,
            })
            .unwrap();
        let model = ScriptedModel::new("deep-model").with_response("{\"ok\": true}");
        let client = TierClient::new(
            Arc::new(model),
            TierConfig::deep(&fast_thresholds()),
            ledger.clone(),
        );
        let error = client
            .call("a long enough prompt", None, &CallOptions::default())
            .unwrap_err();
        assert!(matches!(error, LlmError::BudgetExceeded { .. }));
        // The scripted response is untouched: no network attempt happened.
        let today = chrono::Utc::now().date_naive();
        assert_eq!(ledger.load_range(today, today).unwrap().len(), 1);
    }

    #[test]
    fn force_bypasses_budget_gate() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        ledger
            .record(&UsageRecord {
                timestamp: now_timestamp(),
                model: "deep-model".to_string(),
                tier: ModelTier::Deep,
                input_tokens: 1,
                output_tokens: 1,
                cost: 49.99,
                elapsed_ms: 1,
                success: true,
                error: None,
            })
            .unwrap();
        let model = ScriptedModel::new("deep-model").with_response("{\"ok\": true}");
        let client = TierClient::new(
            Arc::new(model),
            TierConfig::deep(&fast_thresholds()),
            ledger,
        );
        let options = CallOptions {
            force: true,
            ..CallOptions::default()
        };
        assert!(client.call("prompt", None, &options).is_ok());
    }

    #[test]
    fn strict_call_rejects_degraded_results() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new("scripted").with_response("no json here at all");
        let client = TierClient::new(
            Arc::new(model),
            TierConfig::deep(&fast_thresholds()),
            ledger_in(&dir),
        );
        let options = CallOptions {
            force: true,
            ..CallOptions::default()
        };
        let error = client.call_strict("prompt", None, &options).unwrap_err();
        assert!(matches!(error, LlmError::StrictParse(_)));
    }
}
