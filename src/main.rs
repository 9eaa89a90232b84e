use daily_question_notifier::configuration::Settings;
use daily_question_notifier::pipeline::Pipeline;
use daily_question_notifier::scheduler::spawn_jobs;
use daily_question_notifier::server::{AppState, router};
use daily_question_notifier::telemetry::{get_subscriber, init_subscriber};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    let subscriber = get_subscriber(env!("CARGO_PKG_NAME").into(), settings.log_level.clone());
    init_subscriber(subscriber);

    info!("Starting daily-question-notifier");
    settings.log_summary();

    let pipeline = Arc::new(Pipeline::from_settings(&settings));
    let _jobs = spawn_jobs(Arc::clone(&pipeline), &settings.jobs, settings.timezone);

    let app = router(AppState {
        pipeline,
        jobs: Arc::new(settings.jobs.clone()),
        timezone: settings.timezone,
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port)).await?;
    info!("Listening for requests on port {}", settings.port);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
