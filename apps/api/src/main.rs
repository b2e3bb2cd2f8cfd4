use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::SlotLocks;
use notification_cell::{EmailQueueService, EmailWorkerService, Mailer, NotificationService, SocketRegistry};
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MediConnect API server");

    // Load configuration
    let config = AppConfig::from_env();
    let state = Arc::new(config);

    // Notification dependencies are built once here and handed to the
    // routers explicitly.
    let registry = Arc::new(SocketRegistry::new());
    let mailer = Arc::new(Mailer::new(&state));

    let queue = match EmailQueueService::new(&state).await {
        Ok(queue) => Some(Arc::new(queue)),
        Err(e) => {
            warn!("Email queue unavailable, falling back to inline delivery: {}", e);
            None
        }
    };

    if let Some(queue) = &queue {
        let worker = Arc::new(EmailWorkerService::new(
            Arc::clone(queue),
            Arc::clone(&mailer),
        ));
        tokio::spawn(async move {
            worker.run().await;
        });
    }

    let notifier = Arc::new(NotificationService::new(
        Arc::clone(&registry),
        queue,
        mailer,
    ));
    let locks = Arc::new(SlotLocks::new());

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state, notifier, locks, registry)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
