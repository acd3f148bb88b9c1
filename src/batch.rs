//! The sweep itself: prompt construction, record shaping and the
//! question × context loop that appends one record per completed call.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    adapters::jsonl::{JsonlAppender, load_contexts, load_questions},
    core::{
        CompletionRequest, Context, Error, GenerationSettings, NO_CONTEXT_MARKER, Question,
        ResultRecord, Result, ports::RecordSink,
    },
    ledger::CompletedPairs,
    retry::ResilientCaller,
};

/// Builds the prompt text and the `special_context` label for one pair.
pub fn build_prompt(question: &Question, context: Option<&Context>) -> (String, String) {
    match context {
        Some(context) => (
            format!("{}\nQuestion: {}", context.context, question.question),
            context.category.clone(),
        ),
        None => (
            format!("Question: {}", question.question),
            NO_CONTEXT_MARKER.to_string(),
        ),
    }
}

/// Queries the model for one (question, optional context) pair and shapes the record.
/// Nothing is written here.
pub async fn process_question(
    caller: &ResilientCaller,
    question: &Question,
    generation: &GenerationSettings,
    context: Option<&Context>,
) -> Result<ResultRecord> {
    let (prompt, special_context) = build_prompt(question, context);
    let request = CompletionRequest::new(prompt, generation);
    let completion = caller.call(&request).await?;

    let response = completion.first_text().ok_or_else(|| {
        Error::ResponseShape(if completion.content.is_empty() {
            "response has no content".to_string()
        } else {
            "first content segment is not text".to_string()
        })
    })?;

    Ok(ResultRecord {
        question: question.question.clone(),
        category: question.category.clone(),
        response: response.to_string(),
        num_prompt_tokens: completion.usage.input_tokens,
        num_response_tokens: completion.usage.output_tokens,
        special_context,
        model: generation.model.clone(),
        max_tokens: generation.max_tokens,
        temperature: generation.temperature,
    })
}

/// Inputs, output and pass selection for one sweep.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub questions_path: PathBuf,
    pub contexts_path: PathBuf,
    pub output_path: PathBuf,
    pub generation: GenerationSettings,
    /// Ask every question once with no context, before the context pass.
    pub no_context_pass: bool,
    /// Ask every question under every context.
    pub context_pass: bool,
    /// Skip pairs that already have a record in the output file.
    pub skip_completed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records_written: usize,
    pub pairs_skipped: usize,
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

impl BatchSummary {
    fn record(&mut self, record: &ResultRecord) {
        self.records_written += 1;
        self.prompt_tokens += record.num_prompt_tokens;
        self.response_tokens += record.num_response_tokens;
    }
}

/// Drives a full sweep strictly sequentially.
pub struct BatchRunner {
    caller: ResilientCaller,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(caller: ResilientCaller, options: BatchOptions) -> Self {
        Self { caller, options }
    }

    /// Runs the sweep, appending to the configured output file.
    pub async fn run(&self) -> Result<BatchSummary> {
        let mut sink = JsonlAppender::new(&self.options.output_path)?;
        self.run_into(&mut sink).await
    }

    /// Runs the sweep into an arbitrary sink. The first unrecovered error aborts
    /// the run; records already appended stay where they are.
    pub async fn run_into(&self, sink: &mut dyn RecordSink) -> Result<BatchSummary> {
        let questions = load_questions(&self.options.questions_path)?;
        let contexts = load_contexts(&self.options.contexts_path)?;

        let planned = self.planned_calls(questions.len(), contexts.len());
        info!(
            questions = questions.len(),
            contexts = contexts.len(),
            planned,
            "Loaded inputs"
        );

        let completed = if self.options.skip_completed {
            let ledger = CompletedPairs::load(&self.options.output_path)?;
            info!(completed = ledger.len(), "Loaded completed pairs");
            let other_models = ledger.other_models(&self.options.generation.model);
            if !other_models.is_empty() {
                warn!(
                    model = %self.options.generation.model,
                    other_models = ?other_models,
                    "Output holds records from other models; those pairs will be asked again"
                );
            }
            Some(ledger)
        } else {
            None
        };

        let mut summary = BatchSummary::default();

        if self.options.no_context_pass {
            for (idx, question) in questions.iter().enumerate() {
                info!(
                    pass = "no_context",
                    question = idx + 1,
                    of = questions.len(),
                    "Processing question"
                );
                self.process_pair(question, None, sink, completed.as_ref(), &mut summary)
                    .await?;
            }
        }

        if self.options.context_pass {
            for (q_idx, question) in questions.iter().enumerate() {
                info!(
                    pass = "context",
                    question = q_idx + 1,
                    of = questions.len(),
                    "Processing question"
                );
                for (c_idx, context) in contexts.iter().enumerate() {
                    info!(
                        question = q_idx + 1,
                        context = c_idx + 1,
                        of = contexts.len(),
                        category = %context.category,
                        "Processing context"
                    );
                    self.process_pair(
                        question,
                        Some(context),
                        sink,
                        completed.as_ref(),
                        &mut summary,
                    )
                    .await?;
                }
            }
        }

        info!(
            records = summary.records_written,
            skipped = summary.pairs_skipped,
            prompt_tokens = summary.prompt_tokens,
            response_tokens = summary.response_tokens,
            "Sweep finished"
        );
        Ok(summary)
    }

    fn planned_calls(&self, questions: usize, contexts: usize) -> usize {
        let mut planned = 0;
        if self.options.no_context_pass {
            planned += questions;
        }
        if self.options.context_pass {
            planned += questions * contexts;
        }
        planned
    }

    async fn process_pair(
        &self,
        question: &Question,
        context: Option<&Context>,
        sink: &mut dyn RecordSink,
        completed: Option<&CompletedPairs>,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        if let Some(ledger) = completed {
            let special_context = context.map_or(NO_CONTEXT_MARKER, |c| c.category.as_str());
            if ledger.contains(
                &self.options.generation.model,
                &question.question,
                special_context,
            ) {
                debug!(
                    question = %question.question,
                    special_context,
                    "Skipping completed pair"
                );
                summary.pairs_skipped += 1;
                return Ok(());
            }
        }

        let record =
            process_question(&self.caller, question, &self.options.generation, context).await?;
        sink.append(&record)?;
        summary.record(&record);
        Ok(())
    }
}
