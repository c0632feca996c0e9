//! The scheduled-generation dispatcher.
//!
//! One tick: acquire the durable generation lock, walk the eligibility
//! gates, claim a topic, run it through the pipeline end-to-end,
//! release the claim with the outcome, and re-arm the next trigger.
//! Every contended decision is a conditional write on a shared row —
//! competing invocations may live in different processes.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use draftpress_core::gates::{evaluate, GateContext, SkipReason};
use draftpress_core::schedule::next_run;
use draftpress_core::types::DbId;
use draftpress_db::models::lock::{GENERATION_LOCK, NEXT_RUN_LOCK};
use draftpress_db::models::topic::TopicOutcome;
use draftpress_db::repositories::{LockRepo, RunRepo, TopicRepo};
use draftpress_pipeline::traits::{CostLedger, SettingsProvider, TextGenerator};
use draftpress_pipeline::PipelineEngine;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// What one scheduler invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A topic was claimed and driven through the pipeline.
    Ran { topic_id: DbId, completed: bool },
    /// All gates passed but the queue had nothing claimable.
    NothingToDo,
    /// A gate refused the run.
    Skipped(SkipReason),
    /// Another invocation holds the generation lock.
    LockBusy,
}

/// Timer-driven dispatcher for scheduled generation.
pub struct Scheduler {
    pool: PgPool,
    engine: Arc<PipelineEngine>,
    settings: Arc<dyn SettingsProvider>,
    ledger: Arc<dyn CostLedger>,
    text: Arc<dyn TextGenerator>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        pool: PgPool,
        engine: Arc<PipelineEngine>,
        settings: Arc<dyn SettingsProvider>,
        ledger: Arc<dyn CostLedger>,
        text: Arc<dyn TextGenerator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            pool,
            engine,
            settings,
            ledger,
            text,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Run one gated generation attempt under the durable generation
    /// lock, then re-arm the next trigger.
    ///
    /// The lock is released on every exit path; if this process dies
    /// mid-run anyway, the lock's TTL un-wedges the system.
    pub async fn run_scheduled_generation(
        &self,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, SchedulerError> {
        // A fresh holder identity per invocation: two overlapping
        // ticks exclude each other even inside one process.
        let holder = Uuid::new_v4();
        let acquired = LockRepo::acquire(
            &self.pool,
            GENERATION_LOCK,
            holder,
            self.config.generation_lock_ttl,
        )
        .await?;
        if !acquired {
            tracing::debug!("Generation lock held elsewhere, skipping tick");
            return Ok(TickOutcome::LockBusy);
        }

        let outcome = self.run_gated(now).await;

        if let Err(error) = LockRepo::release(&self.pool, GENERATION_LOCK, holder).await {
            tracing::warn!(error = %error, "Failed to release generation lock");
        }
        if let Err(error) = self.rearm_next_trigger(now).await {
            tracing::warn!(error = %error, "Failed to re-arm next trigger");
        }

        outcome
    }

    /// Crash-recovery fallback for externally-triggered checks: if the
    /// armed trigger passed less than the grace window ago and nobody
    /// has handled it, mark it handled and run now. The conditional
    /// mark is what stops two near-simultaneous checks double-firing.
    pub async fn check_missed_run(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<TickOutcome>, SchedulerError> {
        let Some(run) = RunRepo::latest_unfired(&self.pool, now).await? else {
            return Ok(None);
        };

        let overdue = now - run.scheduled_for;
        if overdue <= Duration::zero() || overdue >= self.config.catchup_grace {
            return Ok(None);
        }
        if !RunRepo::mark_fired(&self.pool, run.scheduled_for).await? {
            // Another check won the race.
            return Ok(None);
        }

        tracing::info!(
            scheduled_for = %run.scheduled_for,
            overdue_secs = overdue.num_seconds(),
            "Firing missed trigger",
        );
        Ok(Some(self.run_scheduled_generation(now).await?))
    }

    /// One timer tick. Fires a due trigger, expires one that is past
    /// the grace window, or arms the first trigger after boot.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Option<TickOutcome>, SchedulerError> {
        let Some(run) = RunRepo::latest_unfired(&self.pool, now).await? else {
            self.rearm_next_trigger(now).await?;
            return Ok(None);
        };

        let overdue = now - run.scheduled_for;
        if overdue >= self.config.catchup_grace {
            // Too stale to fire now; consume it and arm the next one.
            if RunRepo::mark_fired(&self.pool, run.scheduled_for).await? {
                tracing::warn!(
                    scheduled_for = %run.scheduled_for,
                    overdue_secs = overdue.num_seconds(),
                    "Expiring trigger missed beyond the grace window",
                );
            }
            self.rearm_next_trigger(now).await?;
            return Ok(None);
        }

        if !RunRepo::mark_fired(&self.pool, run.scheduled_for).await? {
            return Ok(None);
        }
        Ok(Some(self.run_scheduled_generation(now).await?))
    }

    // -----------------------------------------------------------------------
    // The gated attempt
    // -----------------------------------------------------------------------

    async fn run_gated(&self, now: DateTime<Utc>) -> Result<TickOutcome, SchedulerError> {
        let settings = self.settings.load().await?;
        let offset = settings.utc_offset();

        let day_start = local_day_start(now, offset);
        let month_start = local_month_start(now, offset);
        let posts_today = self.ledger.completed_count_since(day_start).await?;
        let monthly_cost = self.ledger.cost_since(month_start).await?;

        let mut ctx = GateContext {
            now,
            enabled: settings.scheduling_enabled,
            settings_changed_at: settings.changed_at,
            cooldown: self.config.settings_cooldown,
            // Assumed good for the cheap gates; verified for real only
            // once everything ahead of the credential gate passes, so a
            // disabled or cooling-down site never spends a request.
            credentials_ok: true,
            posts_today,
            daily_cap: settings.daily_cap,
            monthly_cost,
            monthly_budget: settings.monthly_budget,
            frequency: settings.frequency,
            time_of_day: settings.time_of_day,
            utc_offset: offset,
            tolerance: self.config.schedule_tolerance,
        };

        if let Some(reason @ (SkipReason::Disabled | SkipReason::CoolingDown)) = evaluate(&ctx) {
            tracing::info!(reason = reason.as_str(), "Scheduled run skipped");
            return Ok(TickOutcome::Skipped(reason));
        }

        ctx.credentials_ok = match self.text.verify_credentials().await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(error = %error, "Credential verification failed");
                false
            }
        };

        if let Some(reason) = evaluate(&ctx) {
            tracing::info!(reason = reason.as_str(), "Scheduled run skipped");
            return Ok(TickOutcome::Skipped(reason));
        }

        let Some(topic) = TopicRepo::claim_next(&self.pool, self.config.claim_staleness).await?
        else {
            tracing::info!("All gates passed but the queue is empty");
            return Ok(TickOutcome::NothingToDo);
        };

        tracing::info!(topic_id = topic.id, topic = %topic.topic, "Claimed topic");
        let options = settings.job_options(
            "scheduled",
            topic.keywords.clone(),
            Some(topic.id),
            topic.category_ref,
        );

        let outcome = match self.engine.create_job(&topic.topic, options).await {
            Ok(token) => self.engine.run_to_completion(token).await.map(|job| {
                // run_to_completion only returns completed jobs.
                job.content_ref
            }),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(content_ref) => {
                TopicRepo::release(
                    &self.pool,
                    topic.id,
                    &TopicOutcome::Success {
                        content_ref: content_ref.unwrap_or_default(),
                    },
                )
                .await?;
                tracing::info!(topic_id = topic.id, ?content_ref, "Scheduled run completed");
                Ok(TickOutcome::Ran {
                    topic_id: topic.id,
                    completed: true,
                })
            }
            Err(error) => {
                // Scheduled-path failures never escape to a human:
                // record on the topic and in the log, let the attempt
                // counter bound the retries.
                TopicRepo::release(
                    &self.pool,
                    topic.id,
                    &TopicOutcome::Failure {
                        error: error.to_string(),
                    },
                )
                .await?;
                tracing::error!(topic_id = topic.id, error = %error, "Scheduled run failed");
                Ok(TickOutcome::Ran {
                    topic_id: topic.id,
                    completed: false,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Trigger arming
    // -----------------------------------------------------------------------

    /// Recompute and persist the next trigger instant. Serialized under
    /// its own short-lived lock so concurrent invocations do not arm
    /// divergent instants.
    async fn rearm_next_trigger(&self, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        let holder = Uuid::new_v4();
        let acquired = LockRepo::acquire(
            &self.pool,
            NEXT_RUN_LOCK,
            holder,
            self.config.next_run_lock_ttl,
        )
        .await?;
        if !acquired {
            return Ok(());
        }

        let result = async {
            let settings = self.settings.load().await?;
            let next = next_run(
                settings.frequency,
                settings.time_of_day,
                now,
                settings.utc_offset(),
            );
            RunRepo::arm(&self.pool, next).await?;
            tracing::info!(next_trigger = %next, "Next trigger armed");
            Ok(())
        }
        .await;

        if let Err(error) = LockRepo::release(&self.pool, NEXT_RUN_LOCK, holder).await {
            tracing::warn!(error = %error, "Failed to release next-run lock");
        }
        result
    }
}

/// Start of the site-local day containing `now`, as UTC.
fn local_day_start(now: DateTime<Utc>, offset: chrono::FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset).date_naive().and_time(NaiveTime::MIN);
    DateTime::from_naive_utc_and_offset(
        local - Duration::seconds(offset.local_minus_utc() as i64),
        Utc,
    )
}

/// Start of the site-local calendar month containing `now`, as UTC.
fn local_month_start(now: DateTime<Utc>, offset: chrono::FixedOffset) -> DateTime<Utc> {
    let local_date = now.with_timezone(&offset).date_naive();
    let first = local_date.with_day(1).unwrap_or(local_date);
    let local = first.and_time(NaiveTime::MIN);
    DateTime::from_naive_utc_and_offset(
        local - Duration::seconds(offset.local_minus_utc() as i64),
        Utc,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDateTime};

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    #[test]
    fn day_start_respects_offset() {
        // UTC-5: 02:00 UTC on the 4th is 21:00 local on the 3rd, so
        // the local day started at 05:00 UTC on the 3rd.
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = local_day_start(utc("2026-03-04 02:00"), offset);
        assert_eq!(start, utc("2026-03-03 05:00"));
    }

    #[test]
    fn month_start_is_first_of_month_local() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let start = local_month_start(utc("2026-03-17 15:30"), offset);
        assert_eq!(start, utc("2026-03-01 00:00"));
    }
}
