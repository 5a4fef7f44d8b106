mod api;
mod config;
mod cookies;
mod dto;
mod email;
mod error;
mod middleware;
mod state;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::email::EmailJsMailer;
use crate::state::AppState;

/// Contact bodies are three short text fields.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();
    let tls_enabled = config.tls_enabled();
    let rate_limit = config.rate_limit.clone();

    let mailer = EmailJsMailer::new(config.email.clone())?;

    // CORS: same-origin only unless the page is hosted elsewhere
    let mut cors = CorsLayer::new()
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    if let Some(origin) = &config.cors.allowed_origin {
        cors = cors
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_credentials(true);
        tracing::info!("CORS allowed origin: {origin}");
    }

    let state = AppState {
        config: Arc::new(config),
        mailer: Arc::new(mailer),
    };

    // Rate limit config (per-IP), in front of the per-browser quota
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit.replenish_interval_ms())
            .burst_size(rate_limit.burst_size())
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid contact rate limit configuration"))?,
    );

    let contact_routes = api::router()
        .layer(from_fn(middleware::bot_guard::bot_guard))
        .layer(GovernorLayer::<_, _, axum::body::Body>::new(governor_config));

    let base_router = axum::Router::new().nest("/api", contact_routes);

    let app = if tls_enabled {
        base_router
            .layer(from_fn(middleware::security_headers::security_headers_with_hsts))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    } else {
        base_router
            .layer(from_fn(middleware::security_headers::security_headers))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    };

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("folio-web listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("folio-web listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
