//! Image Batch Service - HTTP server
//!
//! Accepts job submissions referencing product CSVs and serves status
//! queries while the pipeline runs jobs in the background.
use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use sqlx::postgres::PgPoolOptions;

use image_batch_service::db::{JobStore, PgJobStore};
use image_batch_service::handlers;
use image_batch_service::services::pipeline::{
    ImageProcessor, JobRunner, JobSupervisor, RowProcessor, TransformWorker,
};
use image_batch_service::services::storage::{BlobSink, FsBlobSink, S3BlobSink};
use image_batch_service::services::webhook::Notifier;
use image_batch_service::Config;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    let bind_address = format!("{}:{}", config.app.host, config.app.port);

    // Job Store
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db_pool));

    // Blob Sink: S3 when a bucket is configured, local filesystem otherwise
    let sink: Arc<dyn BlobSink> = match &config.storage.s3_bucket {
        Some(bucket) => Arc::new(
            S3BlobSink::from_env(
                bucket,
                &config.storage.s3_region,
                config.storage.public_base_url.clone(),
            )
            .await,
        ),
        None => Arc::new(FsBlobSink::new(
            &config.storage.output_dir,
            config.storage.public_base_url.clone(),
        )),
    };

    // Pipeline
    let processor = Arc::new(ImageProcessor::new(
        config.pipeline.max_dimension,
        config.pipeline.jpeg_quality,
    ));
    let worker = Arc::new(
        TransformWorker::new(
            processor,
            sink,
            Duration::from_secs(config.pipeline.fetch_timeout_secs),
        )
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
    );
    let rows = RowProcessor::new(worker, config.pipeline.url_concurrency);
    let notifier = Arc::new(Notifier::new(
        config.webhook.url.clone(),
        Duration::from_secs(config.webhook.timeout_secs),
    ));
    let runner = Arc::new(JobRunner::new(
        store.clone(),
        rows,
        notifier,
        config.pipeline.progress_batch_size,
    ));
    let supervisor = Arc::new(JobSupervisor::new(runner));

    tracing::info!(bind = %bind_address, "Image batch service starting");

    let store_http = store.clone();
    let supervisor_http = supervisor.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store_http.clone()))
            .app_data(web::Data::new(supervisor_http.clone()))
            .wrap(middleware::Logger::default())
            .route(
                "/api/v1/health",
                web::get()
                    .to(|| async { HttpResponse::Ok().json(serde_json::json!({"status": "ok"})) }),
            )
            .service(
                web::scope("/api/v1/jobs")
                    .route("", web::post().to(handlers::create_job))
                    .route("/{job_id}", web::get().to(handlers::get_job))
                    .route("/{job_id}/run", web::post().to(handlers::run_job)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await?;

    // Signal in-flight jobs to stop scheduling new work before exit
    supervisor.shutdown().await;

    tracing::info!("Image batch service shut down");
    Ok(())
}
