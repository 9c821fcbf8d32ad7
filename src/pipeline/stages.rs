//! The three-stage comparison pipeline.
//!
//! ```text
//! DocumentText × N ──▶ summarize ──▶ compare ──▶ insights ──▶ ComparisonRun
//!                     (N calls)     (1 call)    (1 call)
//! ```
//!
//! Stages are strictly sequential: stage 2 needs every stage-1 payload and
//! stage 3 needs the stage-2 payload. Within stage 1 the per-document calls
//! are independent and may overlap up to `summary_concurrency`; the stream is
//! `buffered` (not `buffer_unordered`) so summaries stay in input order.
//!
//! Model output is never validated here. Each reply is trimmed and stored as
//! a raw payload; parsing happens when the report or CLI needs structure.

use crate::config::CompareConfig;
use crate::document::DocumentText;
use crate::error::CompareError;
use crate::output::{ComparisonResult, ComparisonRun, InsightsResult, Stage, SummaryRecord};
use crate::pipeline::llm::{ChatModel, ModelReply, Sampling};
use crate::progress::ProgressCallback;
use crate::prompts;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Token and call accounting for the LLM part of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallUsage {
    pub calls: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl CallUsage {
    fn record(&mut self, reply: &ModelReply) {
        self.calls += 1;
        self.prompt_tokens += reply.prompt_tokens;
        self.completion_tokens += reply.completion_tokens;
    }
}

/// Runs the summarize → compare → insights stages against one model.
pub struct Comparator {
    model: Arc<dyn ChatModel>,
    sampling: Sampling,
    char_budget: usize,
    summary_concurrency: usize,
    progress: Option<ProgressCallback>,
}

impl Comparator {
    /// Build a comparator from an explicit model and the run configuration.
    pub fn new(model: Arc<dyn ChatModel>, config: &CompareConfig) -> Self {
        Self {
            model,
            sampling: config.sampling(),
            char_budget: config.char_budget,
            summary_concurrency: config.summary_concurrency.max(1),
            progress: config.progress_callback.clone(),
        }
    }

    /// Run all three stages over `documents`, in the given order.
    pub async fn compare(
        &self,
        documents: &[DocumentText],
    ) -> Result<(ComparisonRun, CallUsage), CompareError> {
        let mut usage = CallUsage::default();
        let pdf_names: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();

        let summaries = self
            .timed(Stage::Summarize, self.summarize(documents, &mut usage))
            .await?;
        let comparison = self
            .timed(Stage::Compare, self.compare_summaries(&summaries, &mut usage))
            .await?;
        let insights = self
            .timed(
                Stage::Insights,
                self.generate_insights(&comparison, &pdf_names, &mut usage),
            )
            .await?;

        info!(
            "Pipeline complete: {} calls, {} tokens in / {} tokens out",
            usage.calls, usage.prompt_tokens, usage.completion_tokens
        );

        Ok((
            ComparisonRun {
                pdf_names,
                summaries,
                comparison,
                insights,
            },
            usage,
        ))
    }

    /// Stage 1: one summary call per document.
    pub async fn summarize(
        &self,
        documents: &[DocumentText],
        usage: &mut CallUsage,
    ) -> Result<Vec<SummaryRecord>, CompareError> {
        let total = documents.len();
        let results: Vec<(SummaryRecord, ModelReply)> =
            stream::iter(documents.iter().enumerate().map(|(idx, doc)| async move {
                let prompt = prompts::summary_prompt(doc, self.char_budget);
                let reply = self.call(Stage::Summarize, &prompt).await?;
                let raw = reply.content.trim().to_string();
                debug!("Summary for '{}': {} chars", doc.name, raw.len());
                if let Some(ref cb) = self.progress {
                    cb.on_summary_complete(idx + 1, total, &doc.name, raw.len());
                }
                Ok::<_, CompareError>((
                    SummaryRecord {
                        document: doc.name.clone(),
                        raw,
                    },
                    reply,
                ))
            }))
            .buffered(self.summary_concurrency)
            .try_collect()
            .await?;

        Ok(results
            .into_iter()
            .map(|(record, reply)| {
                usage.record(&reply);
                record
            })
            .collect())
    }

    /// Stage 2: one comparison call over all summaries.
    pub async fn compare_summaries(
        &self,
        summaries: &[SummaryRecord],
        usage: &mut CallUsage,
    ) -> Result<ComparisonResult, CompareError> {
        let prompt = prompts::comparison_prompt(summaries);
        let reply = self.call(Stage::Compare, &prompt).await?;
        usage.record(&reply);
        Ok(ComparisonResult {
            raw_comparison: reply.content.trim().to_string(),
        })
    }

    /// Stage 3: one insights call over the raw comparison.
    pub async fn generate_insights(
        &self,
        comparison: &ComparisonResult,
        names: &[String],
        usage: &mut CallUsage,
    ) -> Result<InsightsResult, CompareError> {
        let prompt = prompts::insights_prompt(&comparison.raw_comparison, names);
        let reply = self.call(Stage::Insights, &prompt).await?;
        usage.record(&reply);
        Ok(InsightsResult {
            insights: reply.content.trim().to_string(),
        })
    }

    /// One model call; transport failures become fatal for the stage.
    async fn call(&self, stage: Stage, prompt: &str) -> Result<ModelReply, CompareError> {
        debug!(
            "{} call to {} ({} prompt chars)",
            stage,
            self.model.model_name(),
            prompt.len()
        );
        self.model
            .complete(prompt, &self.sampling)
            .await
            .map_err(|e| {
                warn!("{} call failed: {}", stage, e);
                CompareError::LlmCallFailed {
                    stage,
                    detail: e.to_string(),
                }
            })
    }

    /// Wrap a stage with progress events and timing.
    async fn timed<T>(
        &self,
        stage: Stage,
        fut: impl std::future::Future<Output = Result<T, CompareError>>,
    ) -> Result<T, CompareError> {
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage);
        }
        let start = Instant::now();
        let result = fut.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match (&result, &self.progress) {
            (Ok(_), Some(cb)) => cb.on_stage_complete(stage, elapsed_ms),
            (Err(e), Some(cb)) => cb.on_stage_error(stage, &e.to_string()),
            _ => {}
        }
        if result.is_ok() {
            info!("Stage {} finished in {}ms", stage, elapsed_ms);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::ScriptedModel;

    fn docs() -> Vec<DocumentText> {
        vec![
            DocumentText::new("A.pdf", "alpha text"),
            DocumentText::new("B.pdf", "beta text"),
        ]
    }

    fn comparator(model: Arc<ScriptedModel>) -> Comparator {
        Comparator::new(model, &CompareConfig::default())
    }

    #[tokio::test]
    async fn three_stages_issue_n_plus_two_calls() {
        let model = Arc::new(ScriptedModel::with_replies([
            " {\"title\":\"A\"} ",
            "{\"title\":\"B\"}",
            "{\"overall_similarity_score\":\"42\"}",
            "\n- prefer A\n",
        ]));
        let (run, usage) = comparator(Arc::clone(&model))
            .compare(&docs())
            .await
            .unwrap();

        assert_eq!(model.call_count(), 4);
        assert_eq!(usage.calls, 4);
        assert_eq!(run.pdf_names, vec!["A.pdf", "B.pdf"]);
        assert_eq!(run.summaries[0].raw, "{\"title\":\"A\"}");
        assert_eq!(run.summaries[1].document, "B.pdf");
        assert_eq!(
            run.comparison.raw_comparison,
            "{\"overall_similarity_score\":\"42\"}"
        );
        assert_eq!(run.insights.insights, "- prefer A");
    }

    #[tokio::test]
    async fn later_stages_see_earlier_payloads() {
        let model = Arc::new(ScriptedModel::with_replies([
            "SUMMARY_ONE",
            "SUMMARY_TWO",
            "COMPARISON_PAYLOAD",
            "insights",
        ]));
        comparator(Arc::clone(&model)).compare(&docs()).await.unwrap();

        let prompts = model.prompts();
        assert!(prompts[0].contains("PDF name: A.pdf"));
        assert!(prompts[1].contains("PDF name: B.pdf"));
        assert!(prompts[2].contains("Document: A.pdf\nSummary JSON: SUMMARY_ONE"));
        assert!(prompts[2].contains("Document: B.pdf\nSummary JSON: SUMMARY_TWO"));
        assert!(prompts[3].contains("COMPARISON_PAYLOAD"));
        assert!(prompts[3].contains("A.pdf, B.pdf"));
    }

    #[tokio::test]
    async fn transport_failure_aborts_with_stage() {
        let model = Arc::new(ScriptedModel::new());
        model.queue_reply("{}");
        model.queue_reply("{}");
        model.queue_failure("connection reset");

        let err = comparator(Arc::clone(&model))
            .compare(&docs())
            .await
            .unwrap_err();
        match err {
            CompareError::LlmCallFailed { stage, detail } => {
                assert_eq!(stage, Stage::Compare);
                assert!(detail.contains("connection reset"));
            }
            other => panic!("unexpected: {other}"),
        }
        // No insights call after the failure.
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn first_summary_failure_stops_stage_one() {
        let model = Arc::new(ScriptedModel::new());
        model.queue_failure("401");
        let err = comparator(Arc::clone(&model))
            .compare(&docs())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompareError::LlmCallFailed {
                stage: Stage::Summarize,
                ..
            }
        ));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_summaries_keep_input_order() {
        let names: Vec<String> = (0..6).map(|i| format!("doc{i}.pdf")).collect();
        let documents: Vec<DocumentText> = names
            .iter()
            .map(|n| DocumentText::new(n.clone(), format!("text of {n}")))
            .collect();
        let model = Arc::new(ScriptedModel::new());
        let config = CompareConfig::builder()
            .summary_concurrency(4)
            .build()
            .unwrap();
        let comparator = Comparator::new(Arc::clone(&model) as Arc<dyn ChatModel>, &config);

        let (run, _) = comparator.compare(&documents).await.unwrap();
        let summary_names: Vec<&str> = run.summaries.iter().map(|s| s.document.as_str()).collect();
        assert_eq!(summary_names, names.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(run.pdf_names, names);
    }
}
