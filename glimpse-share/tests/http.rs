//! End-to-end tests for the sharer's HTTP surface.
//!
//! Each test binds a real listener on localhost and talks to it with an
//! HTTP client; capture is backed by a synthetic capturer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use glimpse_core::{
    CaptureConfig, CapturerFactory, EncodedFrame, FrameBuffer, FrameEncoder, GlimpseError,
    PngFrameEncoder, ScreenCapturer, SessionController,
};
use glimpse_share::config::ShareConfig;
use glimpse_share::service::ShareService;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

// ── Helpers ──────────────────────────────────────────────────────

/// A capturer whose pixels change on every grab when `moving` is set.
fn synthetic_factory(moving: bool) -> CapturerFactory {
    Arc::new(move || -> Result<Box<dyn ScreenCapturer>, GlimpseError> {
        let shade = AtomicU8::new(0);
        let cap = move || -> Result<RgbaImage, GlimpseError> {
            let v = if moving {
                shade.fetch_add(1, Ordering::Relaxed)
            } else {
                0
            };
            Ok(RgbaImage::from_pixel(WIDTH, HEIGHT, Rgba([v, 64, 128, 255])))
        };
        Ok(Box::new(cap))
    })
}

fn controller(moving: bool) -> Arc<SessionController> {
    Arc::new(SessionController::new(
        Arc::new(FrameBuffer::new()),
        synthetic_factory(moving),
        Arc::new(PngFrameEncoder::new()),
        CaptureConfig {
            interval: Duration::from_millis(50),
            drain_delay: Duration::from_millis(100),
            ..CaptureConfig::default()
        },
    ))
}

struct Server {
    base: String,
    controller: Arc<SessionController>,
    handle: JoinHandle<std::io::Result<()>>,
}

async fn spawn_server(config: ShareConfig, controller: Arc<SessionController>) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let service = ShareService::with_controller(config, Arc::clone(&controller));
    let handle = tokio::spawn(async move { service.serve(listener).await });
    Server {
        base: format!("http://{addr}"),
        controller,
        handle,
    }
}

async fn get(url: &str) -> reqwest::Response {
    tokio::time::timeout(Duration::from_secs(5), reqwest::get(url))
        .await
        .expect("request timed out")
        .expect("request failed")
}

// ── Tests ────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_before_start_is_empty_png() {
    let server = spawn_server(ShareConfig::default(), controller(true)).await;

    let resp = get(&format!("{}/fetch-png", server.base)).await;
    assert_eq!(resp.status(), 200);
    let headers = resp.headers().clone();
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["content-length"], "0");
    assert_eq!(
        headers["cache-control"],
        "no-store, no-cache, must-revalidate"
    );
    assert!(resp.bytes().await.unwrap().is_empty());

    server.controller.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn start_then_fetch_returns_decodable_png() {
    let server = spawn_server(ShareConfig::default(), controller(true)).await;

    let resp = get(&format!("{}/start-sharing", server.base)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "Sharing Screen Started");

    tokio::time::sleep(Duration::from_millis(600)).await;

    let resp = get(&format!("{}/fetch-png", server.base)).await;
    let declared: usize = resp.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = resp.bytes().await.unwrap();
    assert!(!body.is_empty());
    assert_eq!(declared, body.len());

    let img = image::load_from_memory_with_format(&body, image::ImageFormat::Png).unwrap();
    assert_eq!((img.width(), img.height()), (WIDTH, HEIGHT));

    server.controller.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn concurrent_viewers_see_the_same_frame() {
    let server = spawn_server(ShareConfig::default(), controller(true)).await;

    get(&format!("{}/start-sharing", server.base)).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    get(&format!("{}/stop-sharing", server.base)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let url = format!("{}/fetch-png", server.base);
    let (a, b) = tokio::join!(get(&url), get(&url));
    let (a, b) = (a.bytes().await.unwrap(), b.bytes().await.unwrap());
    assert!(!a.is_empty());
    assert_eq!(a, b);

    server.controller.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn stop_without_start_still_succeeds() {
    let server = spawn_server(ShareConfig::default(), controller(true)).await;

    let resp = get(&format!("{}/stop-sharing", server.base)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "Share Screen has been stopped");
    assert!(!server.controller.is_sharing());

    server.controller.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn duplicate_start_keeps_one_session() {
    let server = spawn_server(ShareConfig::default(), controller(true)).await;

    get(&format!("{}/start-sharing", server.base)).await;
    let first = server.controller.status().session;
    let resp = get(&format!("{}/start-sharing", server.base)).await;
    assert_eq!(resp.text().await.unwrap(), "Sharing Screen Started");
    assert_eq!(server.controller.status().session, first);

    server.controller.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn status_reports_session_as_json() {
    let server = spawn_server(ShareConfig::default(), controller(true)).await;

    let idle: serde_json::Value =
        serde_json::from_str(&get(&format!("{}/status", server.base)).await.text().await.unwrap())
            .unwrap();
    assert_eq!(idle["sharing"], false);
    assert_eq!(idle["state"], "idle");

    get(&format!("{}/start-sharing", server.base)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let running: serde_json::Value =
        serde_json::from_str(&get(&format!("{}/status", server.base)).await.text().await.unwrap())
            .unwrap();
    assert_eq!(running["sharing"], true);
    assert_eq!(running["state"], "running");
    assert!(running["frames_published"].as_u64().unwrap() > 0);

    server.controller.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn shared_screen_serves_viewer_page() {
    let server = spawn_server(ShareConfig::default(), controller(false)).await;

    let resp = get(&format!("{}/shared-screen", server.base)).await;
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let page = resp.text().await.unwrap();
    assert!(page.contains("<canvas"));
    assert!(page.contains("/fetch-png"));

    server.controller.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn unknown_paths_fall_back_to_static_root() {
    let root = std::env::temp_dir().join(format!("glimpse-static-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("hello.txt"), "hello from disk").unwrap();

    let mut config = ShareConfig::default();
    config.network.static_root = root.clone();
    let server = spawn_server(config, controller(false)).await;

    let resp = get(&format!("{}/hello.txt", server.base)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "hello from disk");

    let resp = get(&format!("{}/missing.txt", server.base)).await;
    assert_eq!(resp.status(), 404);

    server.controller.shutdown(Duration::from_secs(1)).await;
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn shutdown_stops_the_server() {
    let server = spawn_server(ShareConfig::default(), controller(true)).await;
    get(&format!("{}/start-sharing", server.base)).await;

    assert!(server.controller.shutdown(Duration::from_secs(1)).await);

    let served = tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(served.is_ok());
}

/// Emits a fixed payload under its own MIME type.
struct TaggedEncoder;

impl FrameEncoder for TaggedEncoder {
    fn encode(&self, _image: &RgbaImage) -> Result<EncodedFrame, GlimpseError> {
        Ok(EncodedFrame::new(&b"tagged"[..]))
    }

    fn content_type(&self) -> &'static str {
        "image/x-glimpse-test"
    }
}

#[tokio::test]
async fn fetch_png_serves_the_encoder_content_type() {
    let controller = Arc::new(SessionController::new(
        Arc::new(FrameBuffer::new()),
        synthetic_factory(false),
        Arc::new(TaggedEncoder),
        CaptureConfig {
            interval: Duration::from_millis(20),
            drain_delay: Duration::from_millis(20),
            ..CaptureConfig::default()
        },
    ));
    let server = spawn_server(ShareConfig::default(), controller).await;

    get(&format!("{}/start-sharing", server.base)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let resp = get(&format!("{}/fetch-png", server.base)).await;
    assert_eq!(resp.headers()["content-type"], "image/x-glimpse-test");
    assert_eq!(&resp.bytes().await.unwrap()[..], b"tagged");

    server.controller.shutdown(Duration::from_secs(1)).await;
}
