//! The pipeline engine: a resumable state machine over
//! [`GenerationJob`].
//!
//! Each step performs exactly one provider call and persists the job
//! before returning, so a full job can span many invocations and
//! survive process restarts. Step failures park the job in a terminal
//! error state with the reason stored; retries happen inside the
//! provider client, never here.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use draftpress_core::markup::render_blocks;
use draftpress_core::step::{first_step, next_step, GenerationStep, StepPlan};
use draftpress_core::tags::derive_tags;
use draftpress_core::title::extract_title;
use draftpress_db::models::ledger::CreateLedgerEntry;
use draftpress_db::models::status::LedgerOutcome;
use draftpress_openai::{ImageRequest, TextRequest};

use crate::error::PipelineError;
use crate::job::{GenerationJob, JobOptions, JobStatus, TokenUsage};
use crate::prompts::{parse_seo_response, step_prompt, SYSTEM_PROMPT};
use crate::store::JobStore;
use crate::traits::{
    ContentStore, CostLedger, ImageGenerator, MediaStore, NewContent, QueueUpdater,
    SeoFieldWriter, TextGenerator,
};

/// Minimum characters a step's output must have to count as usable.
const MIN_STEP_OUTPUT_CHARS: usize = 20;

/// Sampling temperature for all text steps (where the model allows an
/// override at all).
const TEMPERATURE: f32 = 0.7;

/// Token budgets per step.
const OUTLINE_MAX_TOKENS: u32 = 1_000;
const SEO_MAX_TOKENS: u32 = 300;
const CONTENT_MAX_TOKENS_FLOOR: u32 = 1_000;
const CONTENT_MAX_TOKENS_CEIL: u32 = 4_000;

/// Data key under which finalize stashes the extracted title for the
/// image step.
const TITLE_KEY: &str = "title";

/// Result of advancing a job by one step.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    pub job_status: JobStatus,
    /// The step the job now waits on; `None` once complete.
    pub next_step: Option<GenerationStep>,
}

/// Drives generation jobs through the step state machine.
pub struct PipelineEngine {
    store: Arc<dyn JobStore>,
    text: Arc<dyn TextGenerator>,
    image: Arc<dyn ImageGenerator>,
    content: Arc<dyn ContentStore>,
    seo: Arc<dyn SeoFieldWriter>,
    media: Arc<dyn MediaStore>,
    ledger: Arc<dyn CostLedger>,
    queue: Arc<dyn QueueUpdater>,
}

impl PipelineEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn JobStore>,
        text: Arc<dyn TextGenerator>,
        image: Arc<dyn ImageGenerator>,
        content: Arc<dyn ContentStore>,
        seo: Arc<dyn SeoFieldWriter>,
        media: Arc<dyn MediaStore>,
        ledger: Arc<dyn CostLedger>,
        queue: Arc<dyn QueueUpdater>,
    ) -> Self {
        Self {
            store,
            text,
            image,
            content,
            seo,
            media,
            ledger,
            queue,
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Allocate and durably store a new pending job. The optional-step
    /// plan is frozen here so later settings changes cannot reroute a
    /// job mid-flight.
    pub async fn create_job(
        &self,
        topic: &str,
        options: JobOptions,
    ) -> Result<Uuid, PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::ContentStore("topic must not be empty".into()));
        }

        let plan = StepPlan::new(options.humanize_intensity, options.seo, options.with_image);
        let job = GenerationJob {
            token: Uuid::new_v4(),
            topic: topic.to_string(),
            options,
            status: JobStatus::Pending,
            current_step: first_step(),
            plan,
            steps_completed: Vec::new(),
            data: Default::default(),
            token_usage: TokenUsage::default(),
            seo_fields: None,
            content_ref: None,
            last_error: None,
            created_at: Utc::now(),
        };
        self.store.put(&job).await?;

        tracing::info!(
            token = %job.token,
            topic = %job.topic,
            model = %job.options.model,
            humanize = job.plan.humanize,
            seo = job.plan.seo,
            image = job.plan.image,
            "Generation job created",
        );
        Ok(job.token)
    }

    /// Run the step the job is currently waiting on. One provider call,
    /// then persist. Refuses steps out of order or with missing
    /// prerequisite data.
    pub async fn process_step(
        &self,
        token: Uuid,
        step: GenerationStep,
    ) -> Result<StepOutcome, PipelineError> {
        match step {
            s if s.is_text_step() => self.run_text_step(token, s).await,
            GenerationStep::Finalize => self.finalize(token).await,
            GenerationStep::Image => self.complete_with_image(token).await,
            GenerationStep::Complete => {
                let job = self.load(token).await?;
                Err(PipelineError::Terminal {
                    token,
                    status: job.status.as_str(),
                })
            }
            // The text-step variants (Outline/Content/Humanize/Seo) are all
            // handled by the `is_text_step()` guard above; this arm exists
            // only to satisfy exhaustiveness checking, which cannot see
            // through the guard.
            GenerationStep::Outline
            | GenerationStep::Content
            | GenerationStep::Humanize
            | GenerationStep::Seo => unreachable!("text steps are handled by the is_text_step guard"),
        }
    }

    /// Drive a job through every remaining step. Used on the scheduled
    /// path, where there is no per-invocation time budget; state is
    /// still persisted after every step, so a crash resumes mid-job.
    pub async fn run_to_completion(&self, token: Uuid) -> Result<GenerationJob, PipelineError> {
        // Bounded by the step count; the margin catches a transition
        // table bug instead of spinning forever.
        for _ in 0..16 {
            let job = self.load(token).await?;
            match job.status {
                JobStatus::Completed => return Ok(job),
                JobStatus::Error => {
                    return Err(PipelineError::Terminal {
                        token,
                        status: job.status.as_str(),
                    })
                }
                _ => {}
            }
            self.process_step(token, job.current_step).await?;
        }
        Err(PipelineError::Store(format!(
            "job {token} did not terminate within the step budget"
        )))
    }

    // -----------------------------------------------------------------------
    // Text steps
    // -----------------------------------------------------------------------

    async fn run_text_step(
        &self,
        token: Uuid,
        step: GenerationStep,
    ) -> Result<StepOutcome, PipelineError> {
        let mut job = self.expect_step(token, step).await?;

        if let Some(missing) = step
            .prerequisite()
            .filter(|pre| job.step_output(*pre).is_none())
        {
            return Err(PipelineError::MissingPrerequisite { step, missing });
        }

        job.status = JobStatus::Processing;
        self.store.put(&job).await?;

        let request = TextRequest {
            prompt: step_prompt(&job, step),
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            model: job.options.model.clone(),
            max_tokens: max_tokens_for(step, job.options.word_count),
            temperature: TEMPERATURE,
        };

        let generation = match self.text.generate_text(&request).await {
            Ok(generation) => generation,
            Err(error) => {
                self.fail_job(&mut job, step, &error.to_string()).await?;
                return Err(error.into());
            }
        };

        let output = generation.content.trim().to_string();
        let chars = output.chars().count();
        if chars < MIN_STEP_OUTPUT_CHARS {
            let error = PipelineError::EmptyOutput { step, chars };
            self.fail_job(&mut job, step, &error.to_string()).await?;
            return Err(error);
        }

        job.token_usage.add_text(
            generation.prompt_tokens,
            generation.completion_tokens,
            generation.total_tokens,
            generation.cost_usd,
        );

        if step == GenerationStep::Seo {
            job.seo_fields = parse_seo_response(&output);
            if job.seo_fields.is_none() {
                tracing::warn!(
                    token = %job.token,
                    "SEO step output did not parse, continuing without fields",
                );
            }
        }

        job.data.insert(step.as_str().to_string(), output);
        job.steps_completed.push(step);
        if let Some(next) = next_step(step, job.plan) {
            job.current_step = next;
        }
        job.status = JobStatus::InProgress;
        self.store.put(&job).await?;

        tracing::info!(
            token = %job.token,
            step = %step,
            next = %job.current_step,
            cost_usd = generation.cost_usd,
            tokens = generation.total_tokens,
            "Step completed",
        );

        Ok(StepOutcome {
            job_status: job.status,
            next_step: Some(job.current_step),
        })
    }

    // -----------------------------------------------------------------------
    // Finalize
    // -----------------------------------------------------------------------

    /// Turn the generated text into stored content: block markup, title
    /// extraction, tag derivation, SEO application, bookkeeping. A
    /// content-store failure aborts the job — nothing partial is left
    /// published.
    pub async fn finalize(&self, token: Uuid) -> Result<StepOutcome, PipelineError> {
        let mut job = self.expect_step(token, GenerationStep::Finalize).await?;

        let Some(text) = job.publishable_text().map(str::to_string) else {
            return Err(PipelineError::MissingPrerequisite {
                step: GenerationStep::Finalize,
                missing: GenerationStep::Content,
            });
        };

        let markup = render_blocks(&text);
        let outline = job
            .step_output(GenerationStep::Outline)
            .unwrap_or_default()
            .to_string();
        let title = extract_title(&outline, &job.topic);
        let tags = derive_tags(&job.options.keywords, &job.topic, &markup);

        let new_content = NewContent {
            title: title.clone(),
            body: markup,
            publish: job.options.publish,
            author: job.options.author.clone(),
            category_ref: job.options.category_ref,
            tags,
            metadata: serde_json::json!({
                "generator": "draftpress",
                "job_token": job.token,
                "origin": job.options.origin,
                "model": job.options.model,
                "prompt_tokens": job.token_usage.prompt_tokens,
                "completion_tokens": job.token_usage.completion_tokens,
            }),
        };

        let content_ref = match self.content.create(&new_content).await {
            Ok(content_ref) => content_ref,
            Err(error) => {
                self.fail_job(&mut job, GenerationStep::Finalize, &error.to_string())
                    .await?;
                return Err(error);
            }
        };
        job.content_ref = Some(content_ref);
        job.data.insert(TITLE_KEY.to_string(), title);

        if let Some(fields) = &job.seo_fields {
            // A broken SEO integration must not take down a post that
            // already exists.
            if let Err(error) = self.seo.apply(content_ref, fields).await {
                tracing::warn!(token = %job.token, error = %error, "SEO field write failed");
            }
        }

        job.steps_completed.push(GenerationStep::Finalize);

        if job.plan.image {
            job.current_step = GenerationStep::Image;
            job.status = JobStatus::InProgress;
            self.store.put(&job).await?;
            tracing::info!(token = %job.token, content_ref, "Content created, image step next");
            return Ok(StepOutcome {
                job_status: job.status,
                next_step: Some(GenerationStep::Image),
            });
        }

        self.complete(&mut job).await?;
        Ok(StepOutcome {
            job_status: job.status,
            next_step: None,
        })
    }

    // -----------------------------------------------------------------------
    // Image
    // -----------------------------------------------------------------------

    /// Generate and attach the featured image, then complete the job.
    pub async fn complete_with_image(&self, token: Uuid) -> Result<StepOutcome, PipelineError> {
        let mut job = self.expect_step(token, GenerationStep::Image).await?;

        let Some(content_ref) = job.content_ref else {
            return Err(PipelineError::MissingPrerequisite {
                step: GenerationStep::Image,
                missing: GenerationStep::Finalize,
            });
        };

        job.status = JobStatus::Processing;
        self.store.put(&job).await?;

        let title = job.data.get(TITLE_KEY).cloned().unwrap_or_else(|| job.topic.clone());
        let request = ImageRequest {
            prompt: format!(
                "Blog header illustration for an article titled \"{title}\". \
                 No text or lettering in the image."
            ),
            model: job.options.image_model.clone(),
            size: job.options.image_size.clone(),
            quality: job.options.image_quality.into(),
            style: job.options.image_style.clone(),
        };

        let generation = match self.image.generate_image(&request).await {
            Ok(generation) => generation,
            Err(error) => {
                self.fail_job(&mut job, GenerationStep::Image, &error.to_string())
                    .await?;
                return Err(error.into());
            }
        };

        let filename = format!("generated-{}.png", job.token);
        if let Err(error) = self
            .media
            .fetch_and_attach(&generation.url, &filename, content_ref)
            .await
        {
            self.fail_job(&mut job, GenerationStep::Image, &error.to_string())
                .await?;
            return Err(error);
        }

        job.token_usage.add_image(generation.cost_usd);
        job.steps_completed.push(GenerationStep::Image);
        self.complete(&mut job).await?;

        if let Some(topic_id) = job.options.source_topic_id {
            if let Err(error) = self.queue.mark_completed(topic_id, content_ref).await {
                tracing::warn!(
                    token = %job.token,
                    topic_id,
                    error = %error,
                    "Failed to mark source topic completed",
                );
            }
        }

        Ok(StepOutcome {
            job_status: job.status,
            next_step: None,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn load(&self, token: Uuid) -> Result<GenerationJob, PipelineError> {
        self.store
            .get(token)
            .await?
            .ok_or(PipelineError::JobNotFound(token))
    }

    /// Load a job and verify it is live and waiting on `step`.
    async fn expect_step(
        &self,
        token: Uuid,
        step: GenerationStep,
    ) -> Result<GenerationJob, PipelineError> {
        let job = self.load(token).await?;
        if job.status.is_terminal() {
            return Err(PipelineError::Terminal {
                token,
                status: job.status.as_str(),
            });
        }
        if job.current_step != step {
            return Err(PipelineError::StepMismatch {
                current: job.current_step,
                requested: step,
            });
        }
        Ok(job)
    }

    /// Mark the job complete and append its ledger entry.
    async fn complete(&self, job: &mut GenerationJob) -> Result<(), PipelineError> {
        job.current_step = GenerationStep::Complete;
        job.status = JobStatus::Completed;
        self.store.put(job).await?;

        self.append_ledger(job, LedgerOutcome::Completed).await;
        tracing::info!(
            token = %job.token,
            content_ref = ?job.content_ref,
            cost_usd = job.token_usage.total_cost_usd(),
            "Generation job completed",
        );
        Ok(())
    }

    /// Park the job in the terminal error state with the reason stored,
    /// and append the failed ledger entry.
    async fn fail_job(
        &self,
        job: &mut GenerationJob,
        step: GenerationStep,
        reason: &str,
    ) -> Result<(), PipelineError> {
        job.status = JobStatus::Error;
        job.last_error = Some(format!("{step}: {reason}"));
        self.store.put(job).await?;

        self.append_ledger(job, LedgerOutcome::Failed).await;
        tracing::error!(
            token = %job.token,
            step = %step,
            reason,
            "Generation job failed",
        );
        Ok(())
    }

    /// Append the job's ledger entry. Ledger unavailability is logged,
    /// not propagated — it must not flip an already-terminal job.
    async fn append_ledger(&self, job: &GenerationJob, outcome: LedgerOutcome) {
        let entry = CreateLedgerEntry {
            job_token: job.token,
            topic: job.topic.clone(),
            model: job.options.model.clone(),
            prompt_tokens: job.token_usage.prompt_tokens as i64,
            completion_tokens: job.token_usage.completion_tokens as i64,
            text_cost_usd: job.token_usage.cost_usd,
            image_cost_usd: job.token_usage.image_cost_usd,
            outcome_id: outcome.id(),
            content_ref: job.content_ref,
        };
        if let Err(error) = self.ledger.append(&entry).await {
            tracing::warn!(token = %job.token, error = %error, "Cost ledger append failed");
        }
    }
}

/// Per-step completion token budget.
fn max_tokens_for(step: GenerationStep, word_count: u32) -> u32 {
    match step {
        GenerationStep::Outline => OUTLINE_MAX_TOKENS,
        GenerationStep::Seo => SEO_MAX_TOKENS,
        // Content-length steps scale with the word target; roughly two
        // tokens per word leaves headroom for markup.
        _ => (word_count * 2).clamp(CONTENT_MAX_TOKENS_FLOOR, CONTENT_MAX_TOKENS_CEIL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_budget_scales_with_word_count() {
        assert_eq!(max_tokens_for(GenerationStep::Outline, 5_000), 1_000);
        assert_eq!(max_tokens_for(GenerationStep::Seo, 5_000), 300);
        assert_eq!(max_tokens_for(GenerationStep::Content, 300), 1_000);
        assert_eq!(max_tokens_for(GenerationStep::Content, 1_100), 2_200);
        assert_eq!(max_tokens_for(GenerationStep::Content, 9_000), 4_000);
    }
}
