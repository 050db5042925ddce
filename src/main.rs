//! Elephant Camserver
//!
//! Main entry point for the Camserver application.

use elephant_camserver::{
    alert_decider::AlertDecider,
    alert_log::AlertLog,
    alert_pipeline::AlertPipeline,
    alert_sink::{
        build_http_client, AlertSink, ChatRelaySink, DatabaseWebhookSink, PushNotificationSink,
    },
    capture_orchestrator::{CaptureOrchestrator, CaptureTarget},
    delivery_worker::DeliveryQueue,
    detector::{Detector, HttpDetector, TargetFilter},
    frame_source::{FrameSource, HttpSnapshotSource},
    snapshot_writer::{FsSnapshotWriter, ImageHostSnapshotWriter, SNAPSHOT_URL_PREFIX},
    state::{AppConfig, AppState},
    web_api,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Interval for logging fingerprint store size
const STATS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elephant_camserver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Elephant Camserver v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (fatal on error)
    let config = AppConfig::from_env()?;
    tracing::info!(
        database_post_url = %config.database_post_url,
        detector_url = %config.detector_url,
        snapshot_dir = %config.snapshot_dir.display(),
        cameras = config.cameras.len(),
        alert_cooldown_secs = config.alert_cooldown_secs,
        upload_interval_secs = config.upload_interval_secs,
        "Configuration loaded"
    );

    // Alert sinks
    let sink_client = build_http_client(Duration::from_secs(config.sink_timeout_secs))?;
    let mut sinks: Vec<Arc<dyn AlertSink>> = vec![Arc::new(DatabaseWebhookSink::new(
        sink_client.clone(),
        config.database_post_url.clone(),
    ))];
    match &config.chat_relay_url {
        Some(url) => sinks.push(Arc::new(ChatRelaySink::new(sink_client.clone(), url.clone()))),
        None => tracing::warn!("TELEGRAM_BOT_MESSAGE_API_ROUTE not set, chat alerts disabled"),
    }
    match &config.push_relay_url {
        Some(url) => sinks.push(Arc::new(PushNotificationSink::new(
            sink_client.clone(),
            url.clone(),
        ))),
        None => tracing::warn!("NOTIFICATIONS_API_ROUTE not set, push alerts disabled"),
    }
    let delivery = DeliveryQueue::start(sinks, config.delivery_config());

    // Decision core and pipeline
    let decider = Arc::new(AlertDecider::new(config.decider_policy()));
    let alert_log = Arc::new(AlertLog::new(config.alert_log_capacity));
    let local_writer = Arc::new(FsSnapshotWriter::new(config.snapshot_dir.clone()).await?);
    if config.imgbb_api_key.is_none() {
        tracing::warn!("IMGBB_API_KEY not set, alerts reference local snapshots");
    }
    let snapshot_writer = Arc::new(ImageHostSnapshotWriter::new(
        local_writer,
        config.image_host_url.clone(),
        config.imgbb_api_key.clone(),
        Duration::from_secs(config.sink_timeout_secs),
    )?);
    let pipeline = Arc::new(AlertPipeline::new(
        decider.clone(),
        TargetFilter::new(config.target_class.clone(), config.confidence_threshold),
        snapshot_writer,
        alert_log.clone(),
        delivery,
        config.locations(),
    ));
    tracing::info!("AlertPipeline initialized");

    let detector: Arc<dyn Detector> = Arc::new(HttpDetector::new(config.detector_url.clone())?);
    if !detector.health_check().await {
        tracing::warn!(detector_url = %config.detector_url, "Detector not reachable yet");
    }

    // Capture loops for cameras with a snapshot URL
    let mut targets = Vec::new();
    for camera in &config.cameras {
        match &camera.snapshot_url {
            Some(url) => {
                let source: Arc<dyn FrameSource> = Arc::new(HttpSnapshotSource::new(
                    camera.id.clone(),
                    url.clone(),
                    config.capture_timeout(),
                )?);
                targets.push(CaptureTarget {
                    camera_id: camera.id.clone(),
                    source,
                });
            }
            None => {
                tracing::info!(camera_id = %camera.id, "No snapshot URL, live route only");
            }
        }
    }

    let capture = Arc::new(CaptureOrchestrator::new(
        detector.clone(),
        pipeline.clone(),
        config.capture_settings(),
    ));
    capture.start(targets).await;

    let state = AppState {
        config: config.clone(),
        decider: decider.clone(),
        pipeline,
        alert_log,
        detector,
        started_at: Instant::now(),
    };

    // Periodic stats
    let stats_decider = decider.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATS_INTERVAL);
        loop {
            interval.tick().await;
            let fingerprints = stats_decider.fingerprint_count().await;
            tracing::debug!(fingerprints, "Fingerprint store size");
        }
    });

    // Create router with snapshot serving
    let app = web_api::create_router(state)
        .nest_service(SNAPSHOT_URL_PREFIX, ServeDir::new(&config.snapshot_dir))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    let shutdown_capture = capture.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            shutdown_capture.stop().await;
        })
        .await?;

    capture.join().await;
    tracing::info!("Elephant Camserver stopped");

    Ok(())
}
