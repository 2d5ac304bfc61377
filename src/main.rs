use std::{net::SocketAddr, sync::Arc};

use http::HeaderValue;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::{error, info, warn};

use storefront_api as api;
use api::events::{EventHandler, EventSender, Feed};

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(event_sender);
    let order_feed = Feed::new(
        api::services::orders::ORDERS_TOPIC,
        cfg.order_feed_capacity,
    );

    let auth_service = Arc::new(api::auth::AuthService::new((&cfg).into()));
    let gateways = api::payments::PaymentGateways::from_config(&cfg)?;
    let mail_client = reqwest::Client::builder()
        .timeout(cfg.payment_http_timeout())
        .build()?;
    let mailer = api::notifications::mailer_from_config(&cfg, mail_client);

    if cfg.stripe_secret_key.is_none() {
        warn!("Stripe secret key not configured; card charges will fail");
    }

    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        &cfg,
        event_sender.clone(),
        auth_service.clone(),
        gateways,
        mailer,
    );

    // Feed publisher re-reads the snapshot through its own order service
    let feed_publisher: Arc<dyn EventHandler> = Arc::new(api::services::orders::OrderFeedPublisher::new(
        api::services::orders::OrderService::new(db_arc.clone(), None),
        order_feed.clone(),
    ));
    tokio::spawn(api::events::process_events(event_rx, vec![feed_publisher]));

    let app_state = api::AppState {
        db: db_arc.clone(),
        config: cfg.clone(),
        services,
        auth: auth_service,
        order_feed,
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".into());
    };

    // The SSE feed is long-lived, so the timeout only bounds time to first byte
    let app = api::app_router(app_state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors_layer);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!("storefront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("storefront-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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
}
