use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use kbatch_cluster::kubernetes::KubeWorkloadClient;
use kbatch_core::params::JobParameters;
use kbatch_pipeline::external_step::ExternalJobStep;
use kbatch_pipeline::load::writer::PgRecordWriter;
use kbatch_pipeline::load::ChunkedLoadStep;
use kbatch_pipeline::orchestrator::PipelineOrchestrator;
use kbatch_pipeline::repository::{PgJobRepository, RowCountListener};
use kbatch_worker::config::WorkerConfig;
use kbatch_worker::{logging, signal};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // The subscriber is not installed yet.
            eprintln!("kbatch-worker: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_format);

    match run(config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Worker failed");
            ExitCode::FAILURE
        }
    }
}

/// Run one pipeline invocation. `Ok(true)` means the run completed.
async fn run(config: WorkerConfig) -> anyhow::Result<bool> {
    tracing::info!(
        namespace = %config.namespace,
        workload = %config.workload_name,
        image = %config.workload_image,
        "Loaded worker configuration",
    );

    let params = JobParameters::parse_args(std::env::args().skip(1))
        .context("Invalid job parameters")?;

    // --- Database ---
    let pool = kbatch_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    kbatch_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    kbatch_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Cluster ---
    let client = KubeWorkloadClient::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    // --- Pipeline ---
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(PgJobRepository::new(pool.clone())),
        ExternalJobStep::new(
            Arc::new(client),
            config.workload_template(),
            config.reconnect(),
        ),
        ChunkedLoadStep::new(Arc::new(PgRecordWriter::new(pool.clone())), config.chunk_size),
        config.step_timeout,
    )
    .with_listener(Arc::new(RowCountListener::new(pool.clone())));

    let cancel = CancellationToken::new();
    let signal_task = signal::cancel_on_shutdown(cancel.clone());

    let result = orchestrator.execute(&params, &cancel).await;

    cancel.cancel();
    let _ = signal_task.await;
    pool.close().await;

    let execution = result.context("Pipeline run could not start")?;
    tracing::info!(
        run_id = %execution.run_id,
        outcome = %execution.outcome,
        records_written = execution.records_written,
        "Worker finished",
    );
    Ok(execution.outcome.is_success())
}
