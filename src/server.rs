use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use tracing::warn;

use crate::verifier::VerifyToken;
use crate::webhook::review;
use crate::webhook::TokenReview;

/// Build the webhook router
///
/// `POST /` answers `TokenReview` requests, `GET /healthz` is a liveness probe.
pub fn router(verifier: Arc<dyn VerifyToken>) -> Router {
    Router::new()
        .route("/", post(token_review))
        .route("/healthz", get(healthz))
        .with_state(verifier)
}

/// Serve the webhook on `addr` until Ctrl-C or SIGTERM
pub async fn serve(addr: &str, verifier: Arc<dyn VerifyToken>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(verifier))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

// The body is taken raw so that undecodable requests still get a review back
async fn token_review(
    State(verifier): State<Arc<dyn VerifyToken>>,
    body: Bytes,
) -> Json<TokenReview> {
    Json(review(verifier.as_ref(), &body))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
