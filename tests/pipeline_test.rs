//! End-to-end pipeline tests
//!
//! Runs real jobs against an in-memory Job Store, a filesystem Blob
//! Sink in a temp directory, and a wiremock HTTP server standing in for
//! the image origin and the webhook subscriber.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image_batch_service::db::{InMemoryJobStore, JobStore};
use image_batch_service::error::{AppError, Result};
use image_batch_service::models::{Job, JobStatus};
use image_batch_service::services::pipeline::{
    ImageProcessor, JobRunner, RowProcessor, TransformWorker,
};
use image_batch_service::services::storage::{BlobSink, FsBlobSink};
use image_batch_service::services::webhook::Notifier;
use tokio::sync::watch;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageOutputFormat};
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

fn write_csv(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("products.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn build_runner(
    store: Arc<dyn JobStore>,
    out_dir: &Path,
    webhook: Option<String>,
) -> JobRunner {
    let processor = Arc::new(ImageProcessor::new(800, 50));
    let sink: Arc<dyn BlobSink> = Arc::new(FsBlobSink::new(out_dir, None));
    let worker = Arc::new(
        TransformWorker::new(processor, sink, Duration::from_secs(5)).unwrap(),
    );
    let rows = RowProcessor::new(worker, 4);
    let notifier = Arc::new(Notifier::new(webhook, Duration::from_secs(2)));
    JobRunner::new(store, rows, notifier, 5)
}

fn no_cancel() -> watch::Receiver<bool> {
    // A closed watch channel keeps reporting the last value (false).
    let (_tx, rx) = watch::channel(false);
    rx
}

async fn serve_image(server: &MockServer, image_path: &str) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(1200, 900)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn completed_job_has_full_progress_and_all_references() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/a.jpg").await;
    serve_image(&server, "/img/b.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        &format!(
            "S. No.,Product Name,Input Image Urls\n\
             1,SKU1,{0}/img/a.jpg\n\
             2,SKU2,{0}/img/b.jpg\n",
            server.uri()
        ),
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    let runner = build_runner(store.clone(), dir.path(), None);
    runner.run(id, no_cancel()).await.unwrap();

    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.completed_at.is_some());
    assert!(job.error.is_none());
    assert_eq!(job.results.len(), 2);
    for row in &job.results {
        assert_eq!(row.output_refs.len(), row.input_urls.len());
        let reference = row.output_refs[0].as_deref().unwrap();
        // The stored blob must be a real, shrunken JPEG.
        let blob = std::fs::read(reference).unwrap();
        let img = image::load_from_memory(&blob).unwrap();
        use image::GenericImageView;
        let (w, h) = img.dimensions();
        assert!(w <= 800 && h <= 800);
    }
}

#[tokio::test]
async fn url_failure_is_recorded_as_null_not_job_failure() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/ok.jpg").await;
    Mock::given(method("GET"))
        .and(path("/img/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        &format!(
            "S. No.,Product Name,Input Image Urls\n\
             1,SKU1,\"{0}/img/ok.jpg,{0}/img/missing.jpg\"\n",
            server.uri()
        ),
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    build_runner(store.clone(), dir.path(), None)
        .run(id, no_cancel())
        .await
        .unwrap();

    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.results.len(), 1);

    let row = &job.results[0];
    assert_eq!(row.output_refs.len(), 2);
    assert!(row.output_refs[0].is_some());
    assert!(row.output_refs[1].is_none());
}

#[tokio::test]
async fn missing_header_fails_job_before_any_row_work() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        "S. No.,Product Name\n\
         1,SKU1\n",
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    let err = build_runner(store.clone(), dir.path(), None)
        .run(id, no_cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.results.is_empty());
    assert!(job.error.as_deref().unwrap().contains("Input Image Urls"));
    assert!(job.completed_at.is_none());
}

#[tokio::test]
async fn invalid_row_is_skipped_without_failing_job() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/a.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        &format!(
            "S. No.,Product Name,Input Image Urls\n\
             1,,{0}/img/a.jpg\n\
             2,SKU2,{0}/img/a.jpg\n",
            server.uri()
        ),
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    build_runner(store.clone(), dir.path(), None)
        .run(id, no_cancel())
        .await
        .unwrap();

    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    // Only the structurally valid row produced a result.
    assert_eq!(job.results.len(), 1);
    assert_eq!(job.results[0].product_name, "SKU2");
}

/// Job Store wrapper that records every persisted (status, progress)
/// snapshot and can inject a one-shot save failure.
struct ObservedStore {
    inner: InMemoryJobStore,
    saves: tokio::sync::Mutex<Vec<(JobStatus, i32, usize)>>,
    fail_on_save: AtomicU64,
    save_count: AtomicU64,
}

impl ObservedStore {
    fn new(fail_on_save: u64) -> Self {
        Self {
            inner: InMemoryJobStore::new(),
            saves: tokio::sync::Mutex::new(Vec::new()),
            fail_on_save: AtomicU64::new(fail_on_save),
            save_count: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl JobStore for ObservedStore {
    async fn create(&self, id: Uuid, source_file: &str) -> Result<Job> {
        self.inner.create(id, source_file).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, job: &Job) -> Result<()> {
        let n = self.save_count.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on_save.load(Ordering::SeqCst) {
            return Err(AppError::Database("connection refused".to_string()));
        }
        self.saves
            .lock()
            .await
            .push((job.status, job.progress, job.results.len()));
        self.inner.save(job).await
    }
}

#[tokio::test]
async fn progress_persists_on_batch_of_five_boundaries() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/a.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let mut content = String::from("S. No.,Product Name,Input Image Urls\n");
    for i in 1..=7 {
        content.push_str(&format!("{i},SKU{i},{}/img/a.jpg\n", server.uri()));
    }
    let csv = write_csv(dir.path(), &content);

    let store = Arc::new(ObservedStore::new(0));
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    build_runner(store.clone(), dir.path(), None)
        .run(id, no_cancel())
        .await
        .unwrap();

    let saves = store.saves.lock().await;
    // processing transition, row 5, row 7, completed
    let progresses: Vec<i32> = saves.iter().map(|(_, p, _)| *p).collect();
    assert_eq!(progresses, vec![0, 71, 100, 100]);
    // monotonic across persisted states
    assert!(progresses.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(saves.last().unwrap().0, JobStatus::Completed);
}

#[tokio::test]
async fn store_outage_mid_job_fails_job_and_keeps_partial_results() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/a.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let mut content = String::from("S. No.,Product Name,Input Image Urls\n");
    for i in 1..=10 {
        content.push_str(&format!("{i},SKU{i},{}/img/a.jpg\n", server.uri()));
    }
    let csv = write_csv(dir.path(), &content);

    // Save #1 is the processing transition, save #2 the row-5 progress
    // write; failing it simulates a store outage mid-processing.
    let store = Arc::new(ObservedStore::new(2));
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    let err = build_runner(store.clone(), dir.path(), None)
        .run(id, no_cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(!job.error.as_deref().unwrap().is_empty());
    assert!(job.completed_at.is_none());
    // Rows completed before the outage are preserved, not rolled back.
    assert_eq!(job.results.len(), 5);
}

#[tokio::test]
async fn completion_save_outage_resolves_to_failed_with_notification() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/a.jpg").await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        &format!(
            "S. No.,Product Name,Input Image Urls\n\
             1,SKU1,{}/img/a.jpg\n",
            server.uri()
        ),
    );

    // Save #1 is the processing transition, #2 the final-row progress
    // write, #3 the completed save; failing #3 simulates an outage at
    // the terminal write.
    let store = Arc::new(ObservedStore::new(3));
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    let err = build_runner(
        store.clone(),
        dir.path(),
        Some(format!("{}/hook", server.uri())),
    )
    .run(id, no_cancel())
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    // The persisted record resolves to `failed`, never a dangling
    // `processing` with an in-memory-only completion.
    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(!job.error.as_deref().unwrap().is_empty());
    assert!(job.completed_at.is_none());
    assert_eq!(job.results.len(), 1);

    // Subscribers still learn of the failure.
    let requests = server.received_requests().await.unwrap();
    let hook = requests
        .iter()
        .find(|r| r.url.path() == "/hook")
        .expect("webhook POST recorded");
    let payload: serde_json::Value = serde_json::from_slice(&hook.body).unwrap();
    assert_eq!(payload["status"], serde_json::json!("failed"));
}

#[tokio::test]
async fn cancellation_mid_row_stops_scheduling_remaining_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes(400, 300))
                .set_delay(Duration::from_millis(250)),
        )
        .mount(&server)
        .await;
    serve_image(&server, "/img/later.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        &format!(
            "S. No.,Product Name,Input Image Urls\n\
             1,SKU1,\"{0}/img/slow.jpg,{0}/img/later.jpg,{0}/img/later.jpg\"\n",
            server.uri()
        ),
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    // Sequential URL processing so the signal lands while the first
    // download is still in flight.
    let processor = Arc::new(ImageProcessor::new(800, 50));
    let sink: Arc<dyn BlobSink> = Arc::new(FsBlobSink::new(dir.path(), None));
    let worker = Arc::new(
        TransformWorker::new(processor, sink, Duration::from_secs(5)).unwrap(),
    );
    let rows = RowProcessor::new(worker, 1);
    let notifier = Arc::new(Notifier::new(None, Duration::from_secs(2)));
    let runner = JobRunner::new(store.clone(), rows, notifier, 5);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = cancel_tx.send(true);
    });

    runner.run(id, cancel_rx).await.unwrap();

    // No partial row is recorded and the job stays non-terminal.
    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert!(job.results.is_empty());

    // The URLs behind the in-flight one were never fetched.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests
            .iter()
            .filter(|r| r.url.path() == "/img/later.jpg")
            .count(),
        0
    );
}

#[tokio::test]
async fn cancelled_job_stays_in_processing_state() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        "S. No.,Product Name,Input Image Urls\n\
         1,SKU1,https://origin.invalid/a.jpg\n",
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancel_tx.send(true).unwrap();

    build_runner(store.clone(), dir.path(), None)
        .run(id, cancel_rx)
        .await
        .unwrap();

    // Cancellation is not a terminal state: no rows were scheduled and
    // the job is left as `processing` for a later decision.
    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert!(job.results.is_empty());
}

#[tokio::test]
async fn rerunning_terminal_job_is_rejected() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/a.jpg").await;

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        &format!(
            "S. No.,Product Name,Input Image Urls\n\
             1,SKU1,{}/img/a.jpg\n",
            server.uri()
        ),
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    let runner = build_runner(store.clone(), dir.path(), None);
    runner.run(id, no_cancel()).await.unwrap();

    let err = runner.run(id, no_cancel()).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The terminal record is untouched by the rejected re-run.
    let job = store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn webhook_receives_terminal_status_and_failures_are_swallowed() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/a.jpg").await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        &format!(
            "S. No.,Product Name,Input Image Urls\n\
             1,SKU1,{}/img/a.jpg\n",
            server.uri()
        ),
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id, csv.to_str().unwrap()).await.unwrap();

    build_runner(store.clone(), dir.path(), Some(format!("{}/hook", server.uri())))
        .run(id, no_cancel())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let hook = requests
        .iter()
        .find(|r| r.url.path() == "/hook")
        .expect("webhook POST recorded");
    let payload: serde_json::Value = serde_json::from_slice(&hook.body).unwrap();
    assert_eq!(payload["job_id"], serde_json::json!(id));
    assert_eq!(payload["status"], serde_json::json!("completed"));

    // A webhook target that errors must not affect the job record.
    let store2: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let id2 = Uuid::new_v4();
    store2.create(id2, csv.to_str().unwrap()).await.unwrap();
    build_runner(
        store2.clone(),
        dir.path(),
        Some("http://127.0.0.1:1/unreachable".to_string()),
    )
    .run(id2, no_cancel())
    .await
    .unwrap();
    let job2 = store2.find_by_id(id2).await.unwrap().unwrap();
    assert_eq!(job2.status, JobStatus::Completed);
}
