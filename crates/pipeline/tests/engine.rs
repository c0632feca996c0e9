//! End-to-end engine tests over in-memory collaborators.
//!
//! These drive real jobs through the full state machine with scripted
//! provider responses — no network, no database.

use std::sync::Arc;

use assert_matches::assert_matches;

use draftpress_core::step::GenerationStep;
use draftpress_db::models::status::LedgerOutcome;
use draftpress_openai::{ImageGeneration, ProviderError};
use draftpress_pipeline::engine::PipelineEngine;
use draftpress_pipeline::error::PipelineError;
use draftpress_pipeline::job::{ImageQualityOption, JobOptions, JobStatus};
use draftpress_pipeline::store::{JobStore, MemoryJobStore};
use draftpress_pipeline::testing::{
    canned_text, sample_job, FakeImageGenerator, FakeTextGenerator, MemoryContentStore,
    MemoryCostLedger, MemoryMediaStore, MemoryQueueUpdater, MemorySeoWriter,
};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct World {
    engine: PipelineEngine,
    store: Arc<MemoryJobStore>,
    content: Arc<MemoryContentStore>,
    seo: Arc<MemorySeoWriter>,
    media: Arc<MemoryMediaStore>,
    ledger: Arc<MemoryCostLedger>,
    queue: Arc<MemoryQueueUpdater>,
}

fn world_with(
    text: FakeTextGenerator,
    image: FakeImageGenerator,
    content: MemoryContentStore,
) -> World {
    let store = Arc::new(MemoryJobStore::new());
    let content = Arc::new(content);
    let seo = Arc::new(MemorySeoWriter::default());
    let media = Arc::new(MemoryMediaStore::default());
    let ledger = Arc::new(MemoryCostLedger::default());
    let queue = Arc::new(MemoryQueueUpdater::default());

    let engine = PipelineEngine::new(
        store.clone(),
        Arc::new(text),
        Arc::new(image),
        content.clone(),
        seo.clone(),
        media.clone(),
        ledger.clone(),
        queue.clone(),
    );
    World {
        engine,
        store,
        content,
        seo,
        media,
        ledger,
        queue,
    }
}

fn options(seo: bool, with_image: bool) -> JobOptions {
    JobOptions {
        model: "gpt-4o-mini".to_string(),
        word_count: 1_000,
        keywords: vec!["soil health".to_string()],
        publish: false,
        with_image,
        seo,
        humanize_intensity: 5,
        origin: "manual".to_string(),
        source_topic_id: None,
        category_ref: None,
        author: Some("editor".to_string()),
        image_model: "dall-e-3".to_string(),
        image_size: "1024x1024".to_string(),
        image_quality: ImageQualityOption::Standard,
        image_style: None,
    }
}

const OUTLINE: &str = "Title: \"A Complete Guide to Composting\"\n\n\
                       **Introduction**\n- why compost\n\
                       **Section 1: Bins**\n- tumblers vs piles";

const ARTICLE: &str = "Composting turns scraps into **rich soil**.\n\n\
                       ## Getting Started\n\nPick a shaded spot and a bin.\n\n\
                       ## Maintenance\n\nTurn the pile weekly and keep it damp.";

const HUMANIZED: &str = "Here's the thing about composting: scraps become **rich soil**.\n\n\
                         ## Getting Started\n\nFind a shady corner and grab a bin.\n\n\
                         ## Maintenance\n\nGive the pile a weekly turn.";

const SEO_JSON: &str = r#"{"seo_title": "Composting Guide", "meta_description": "Turn scraps into soil.", "focus_keyword": "home composting"}"#;

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_without_seo_or_image_sums_step_costs() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Ok(canned_text(ARTICLE, 0.002)),
            Ok(canned_text(HUMANIZED, 0.003)),
        ]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("Topic A", options(false, false))
        .await
        .unwrap();
    let job = world.engine.run_to_completion(token).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.content_ref, Some(1));
    assert!((job.token_usage.cost_usd - 0.006).abs() < 1e-9);
    assert_eq!(job.token_usage.image_cost_usd, 0.0);
    assert_eq!(
        job.steps_completed,
        vec![
            GenerationStep::Outline,
            GenerationStep::Content,
            GenerationStep::Humanize,
            GenerationStep::Finalize,
        ]
    );

    let created = world.content.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "A Complete Guide to Composting");
    assert!(created[0].tags.contains(&"soil health".to_string()));
    assert!(!created[0].publish);

    let entries = world.ledger.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0.outcome_id, LedgerOutcome::Completed.id());
    assert!((entries[0].0.text_cost_usd - 0.006).abs() < 1e-9);
}

#[tokio::test]
async fn manual_stepping_advances_one_step_per_call() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Ok(canned_text(ARTICLE, 0.002)),
            Ok(canned_text(HUMANIZED, 0.003)),
        ]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("composting", options(false, false))
        .await
        .unwrap();

    let outcome = world
        .engine
        .process_step(token, GenerationStep::Outline)
        .await
        .unwrap();
    assert_eq!(outcome.next_step, Some(GenerationStep::Content));
    assert_eq!(outcome.job_status, JobStatus::InProgress);

    // The job state survives the store round-trip between calls.
    let persisted = world.store.get(token).await.unwrap().unwrap();
    assert_eq!(persisted.current_step, GenerationStep::Content);
    assert!(persisted.step_output(GenerationStep::Outline).is_some());
}

#[tokio::test]
async fn seo_step_parses_and_applies_fields() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Ok(canned_text(ARTICLE, 0.002)),
            Ok(canned_text(HUMANIZED, 0.001)),
            Ok(canned_text(SEO_JSON, 0.0005)),
        ]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("composting", options(true, false))
        .await
        .unwrap();
    let job = world.engine.run_to_completion(token).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    let fields = job.seo_fields.expect("seo fields parsed");
    assert_eq!(fields.focus_keyword, "home composting");

    let applied = world.seo.applied.lock().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].0, job.content_ref.unwrap());
    assert_eq!(applied[0].1.seo_title, "Composting Guide");
}

#[tokio::test]
async fn image_path_attaches_media_and_merges_cost() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Ok(canned_text(ARTICLE, 0.002)),
            Ok(canned_text(HUMANIZED, 0.001)),
        ]),
        FakeImageGenerator::scripted(vec![Ok(ImageGeneration {
            url: "https://img.example/out.png".to_string(),
            cost_usd: 0.04,
        })]),
        MemoryContentStore::new(),
    );

    let mut opts = options(false, true);
    opts.source_topic_id = Some(42);
    let token = world.engine.create_job("composting", opts).await.unwrap();
    let job = world.engine.run_to_completion(token).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!((job.token_usage.image_cost_usd - 0.04).abs() < 1e-9);
    assert!((job.token_usage.total_cost_usd() - 0.044).abs() < 1e-9);

    let attached = world.media.attached.lock().unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].0, "https://img.example/out.png");
    assert_eq!(attached[0].2, job.content_ref.unwrap());

    // The source queue topic was marked completed with the content ref.
    let completed = world.queue.completed.lock().unwrap();
    assert_eq!(completed.as_slice(), &[(42, job.content_ref.unwrap())]);

    let entries = world.ledger.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert!((entries[0].0.image_cost_usd - 0.04).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provider_failure_at_content_parks_the_job() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Err(ProviderError::RetryExhausted {
                attempts: 3,
                last: Box::new(ProviderError::ServerError { status: 502 }),
            }),
        ]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("composting", options(false, false))
        .await
        .unwrap();
    let error = world.engine.run_to_completion(token).await.unwrap_err();
    assert_matches!(error, PipelineError::Provider(_));

    let job = world.store.get(token).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.last_error.as_deref().unwrap().starts_with("content:"));
    // Never finalized: nothing was published, no content reference.
    assert!(job.content_ref.is_none());
    assert!(world.content.created.lock().unwrap().is_empty());

    // One failed ledger entry carrying the spend so far.
    let entries = world.ledger.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0.outcome_id, LedgerOutcome::Failed.id());
    assert!((entries[0].0.text_cost_usd - 0.001).abs() < 1e-9);
}

#[tokio::test]
async fn empty_output_is_a_content_quality_failure() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![Ok(canned_text("   ", 0.001))]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("composting", options(false, false))
        .await
        .unwrap();
    let error = world
        .engine
        .process_step(token, GenerationStep::Outline)
        .await
        .unwrap_err();
    assert_matches!(
        error,
        PipelineError::EmptyOutput { step: GenerationStep::Outline, .. }
    );

    let job = world.store.get(token).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
}

#[tokio::test]
async fn content_store_outage_aborts_finalize() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Ok(canned_text(ARTICLE, 0.002)),
            Ok(canned_text(HUMANIZED, 0.001)),
        ]),
        FakeImageGenerator::unused(),
        MemoryContentStore::failing(),
    );

    let token = world
        .engine
        .create_job("composting", options(false, false))
        .await
        .unwrap();
    let error = world.engine.run_to_completion(token).await.unwrap_err();
    assert_matches!(error, PipelineError::ContentStore(_));

    let job = world.store.get(token).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.content_ref.is_none());
}

#[tokio::test]
async fn image_failure_parks_job_after_content_exists() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Ok(canned_text(ARTICLE, 0.002)),
            Ok(canned_text(HUMANIZED, 0.001)),
        ]),
        FakeImageGenerator::scripted(vec![Err(ProviderError::ServerError { status: 500 })]),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("composting", options(false, true))
        .await
        .unwrap();
    let error = world.engine.run_to_completion(token).await.unwrap_err();
    assert_matches!(error, PipelineError::Provider(_));

    let job = world.store.get(token).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Error);
    // Content was created before the image step failed.
    assert!(job.content_ref.is_some());
}

// ---------------------------------------------------------------------------
// Ordering guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn steps_refuse_to_run_out_of_order() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("composting", options(false, false))
        .await
        .unwrap();
    let error = world
        .engine
        .process_step(token, GenerationStep::Content)
        .await
        .unwrap_err();
    assert_matches!(
        error,
        PipelineError::StepMismatch {
            current: GenerationStep::Outline,
            requested: GenerationStep::Content,
        }
    );
}

#[tokio::test]
async fn content_refuses_to_run_without_outline_data() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    // Hand-craft a job pointing at Content with no outline stored.
    let mut job = sample_job("composting");
    job.current_step = GenerationStep::Content;
    world.store.put(&job).await.unwrap();

    let error = world
        .engine
        .process_step(job.token, GenerationStep::Content)
        .await
        .unwrap_err();
    assert_matches!(
        error,
        PipelineError::MissingPrerequisite {
            step: GenerationStep::Content,
            missing: GenerationStep::Outline,
        }
    );
}

#[tokio::test]
async fn completed_job_refuses_further_steps() {
    let world = world_with(
        FakeTextGenerator::scripted(vec![
            Ok(canned_text(OUTLINE, 0.001)),
            Ok(canned_text(ARTICLE, 0.002)),
            Ok(canned_text(HUMANIZED, 0.001)),
        ]),
        FakeImageGenerator::unused(),
        MemoryContentStore::new(),
    );

    let token = world
        .engine
        .create_job("composting", options(false, false))
        .await
        .unwrap();
    world.engine.run_to_completion(token).await.unwrap();

    let error = world
        .engine
        .process_step(token, GenerationStep::Complete)
        .await
        .unwrap_err();
    assert_matches!(error, PipelineError::Terminal { .. });
}

#[tokio::test]
async fn expired_job_reads_as_not_found() {
    let store = Arc::new(MemoryJobStore::with_ttl(chrono::Duration::seconds(-1)));
    let engine = PipelineEngine::new(
        store.clone(),
        Arc::new(FakeTextGenerator::scripted(vec![])),
        Arc::new(FakeImageGenerator::unused()),
        Arc::new(MemoryContentStore::new()),
        Arc::new(MemorySeoWriter::default()),
        Arc::new(MemoryMediaStore::default()),
        Arc::new(MemoryCostLedger::default()),
        Arc::new(MemoryQueueUpdater::default()),
    );

    let token = engine
        .create_job("composting", options(false, false))
        .await
        .unwrap();
    let error = engine
        .process_step(token, GenerationStep::Outline)
        .await
        .unwrap_err();
    assert_matches!(error, PipelineError::JobNotFound(t) if t == token);
}
