//! Sharer HTTP service.
//!
//! Exposes the shared [`FrameBuffer`](glimpse_core::FrameBuffer) and the
//! session controls over plain HTTP. Every route is a GET with no body
//! and no per-client state; viewers pull frames, nothing is pushed.
//!
//! | Route            | Effect                                   |
//! |------------------|------------------------------------------|
//! | `/start-sharing` | start a capture session                  |
//! | `/stop-sharing`  | stop the capture session                 |
//! | `/shared-screen` | viewer page                              |
//! | `/fetch-png`     | latest frame, `image/png`, never cached  |
//! | `/status`        | session status as JSON                   |
//! | anything else    | static files under `network.static_root` |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, header};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnRequest, TraceLayer};
use tracing::{Level, debug, info, info_span, warn};

use glimpse_core::{
    FrameBuffer, PngFrameEncoder, SessionController, SessionStatus, StartOutcome,
    display_capturer_factory,
};

use crate::config::ShareConfig;

/// Viewer page served at `/shared-screen`.
pub const VIEWER_PAGE: &str = include_str!("../assets/shared-screen.html");

const NO_CACHE: &str = "no-store, no-cache, must-revalidate";

// ── ShareService ─────────────────────────────────────────────────

/// The sharer: a [`SessionController`] behind an HTTP router.
pub struct ShareService {
    config: ShareConfig,
    controller: Arc<SessionController>,
}

impl ShareService {
    /// Build a service that captures the configured monitor as PNG.
    pub fn new(config: ShareConfig) -> Self {
        let controller = SessionController::new(
            Arc::new(FrameBuffer::new()),
            display_capturer_factory(config.capture.monitor_index),
            Arc::new(PngFrameEncoder::new()),
            config.to_capture_config(),
        );
        Self::with_controller(config, Arc::new(controller))
    }

    /// Build a service around an existing controller.
    pub fn with_controller(config: ShareConfig, controller: Arc<SessionController>) -> Self {
        Self { config, controller }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// The HTTP routes, with request logging.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/start-sharing", get(start_sharing))
            .route("/stop-sharing", get(stop_sharing))
            .route("/shared-screen", get(shared_screen))
            .route("/fetch-png", get(fetch_png))
            .route("/status", get(status))
            .fallback_service(ServeDir::new(&self.config.network.static_root))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request| {
                        let remote = req
                            .extensions()
                            .get::<ConnectInfo<SocketAddr>>()
                            .map(|ConnectInfo(addr)| *addr);
                        info_span!(
                            "http",
                            method = %req.method(),
                            uri = %req.uri(),
                            remote = ?remote,
                        )
                    })
                    .on_request(DefaultOnRequest::new().level(Level::INFO)),
            )
            .with_state(Arc::clone(&self.controller))
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.network.bind_address.as_str()).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    ///
    /// Returns once the controller's shutdown token is cancelled and
    /// in-flight requests have completed.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        info!(
            "serving {} as / on {}",
            self.config.network.static_root.display(),
            listener.local_addr()?
        );
        let shutdown = self.controller.shutdown_token();
        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

// ── Handlers ─────────────────────────────────────────────────────

async fn start_sharing(State(ctl): State<Arc<SessionController>>) -> &'static str {
    if ctl.start() == StartOutcome::ShuttingDown {
        warn!("start requested during shutdown; ignored");
    }
    "Sharing Screen Started"
}

async fn stop_sharing(State(ctl): State<Arc<SessionController>>) -> &'static str {
    ctl.stop();
    "Share Screen has been stopped"
}

async fn shared_screen() -> Html<&'static str> {
    Html(VIEWER_PAGE)
}

/// Latest frame. Before the first capture the body is empty, not an error.
async fn fetch_png(State(ctl): State<Arc<SessionController>>) -> impl IntoResponse {
    let body = ctl
        .frames()
        .read()
        .map(|frame| frame.to_bytes())
        .unwrap_or_default();
    debug!(bytes = body.len(), "PNG sent to viewer");
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(ctl.content_type())),
            (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
            (header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE)),
            (header::PRAGMA, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
}

async fn status(State(ctl): State<Arc<SessionController>>) -> Json<SessionStatus> {
    Json(ctl.status())
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_page_polls_fetch_png() {
        assert!(VIEWER_PAGE.contains("/fetch-png"));
        assert!(VIEWER_PAGE.contains("<canvas"));
    }

    #[cfg(feature = "xcap")]
    #[test]
    fn default_build_has_a_capture_backend() {
        // A headless host may have no monitor, but the backend is compiled in.
        if let Err(e) = display_capturer_factory(0)() {
            assert!(!matches!(e, glimpse_core::GlimpseError::BackendUnavailable(_)), "{e}");
        }
    }

    #[tokio::test]
    async fn service_starts_idle() {
        let svc = ShareService::new(ShareConfig::default());
        assert!(!svc.controller().is_sharing());
        assert!(svc.controller().frames().read().is_none());
    }
}
