use crate::configuration::{Channel, JobConfig};
use crate::pipeline::Pipeline;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::{Router, routing};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub jobs: Arc<Vec<JobConfig>>,
    pub timezone: Tz,
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

// - GET <trigger path>
#[tracing::instrument(
    name = "ManualTrigger",
    skip(state),
    fields(
        request_id = %Uuid::new_v4(),
    )
)]
async fn trigger(State(state): State<AppState>, channel: Channel) -> &'static str {
    info!("Manual trigger received");
    // Detached: the response never waits on or reports the run
    state.pipeline.spawn(channel);
    channel.acknowledgement()
}

// - GET /
async fn status_page(State(state): State<AppState>) -> Html<String> {
    let rows: String = state
        .jobs
        .iter()
        .map(|job| {
            let links = job
                .trigger_paths
                .iter()
                .map(|p| format!(r#"<a href="{p}">{p}</a>"#))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "<tr><td>{}</td><td><code>{}</code></td><td>{}</td></tr>",
                job.channel, job.schedule, links
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{name}</title></head>
<body>
<h1>{name} {version}</h1>
<p>Schedules run in {tz}.</p>
<table>
<tr><th>Channel</th><th>Schedule</th><th>Manual trigger</th></tr>
{rows}
</table>
</body>
</html>
"#,
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        tz = state.timezone,
    ))
}

/// Build the HTTP surface: one GET route per trigger path plus status and health.
/// Anything else, including other methods on known paths, is a 404.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", routing::get(status_page).fallback(not_found))
        .route("/health", routing::get(|| async { "up" }).fallback(not_found));

    for job in state.jobs.iter() {
        let channel = job.channel;
        for path in &job.trigger_paths {
            app = app.route(
                path,
                // axum answers HEAD with the GET handler unless one is set
                routing::get(move |state: State<AppState>| trigger(state, channel))
                    .head(not_found)
                    .fallback(not_found),
            );
        }
    }

    app.fallback(not_found)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
