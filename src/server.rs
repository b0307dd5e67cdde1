//! HTTP front end: a single `GET /` page with the high-risk table

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tracing::{error, info};

use crate::pipeline::{ChurnPipeline, PipelineConfig};
use crate::report::{render_error_html, render_html};

type AppState = Arc<PipelineConfig>;

/// Start serving on `addr` until the process is stopped
pub async fn serve(config: PipelineConfig, addr: SocketAddr) -> crate::Result<()> {
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %listener.local_addr()?, "churn report listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router (separated for testing)
pub fn router(config: PipelineConfig) -> Router {
    Router::new()
        .route("/", get(index))
        .with_state(Arc::new(config))
}

async fn index(State(config): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let config = PipelineConfig::clone(&config);

    // The fit is CPU-bound; keep it off the async workers
    let outcome = tokio::task::spawn_blocking(move || {
        ChurnPipeline::new(config).and_then(|pipeline| pipeline.run())
    })
    .await;

    match outcome {
        Ok(Ok(report)) => Ok(Html(render_html(&report))),
        Ok(Err(e)) => {
            error!(error = %e, "churn pipeline failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_error_html(&e.to_string())),
            ))
        }
        Err(e) => {
            error!(error = %e, "churn pipeline task panicked");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_error_html("internal error")),
            ))
        }
    }
}
