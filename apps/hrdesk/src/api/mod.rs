//! # HTTP API
//!
//! axum router over the core store. Handlers are thin: extract, authorize,
//! run the core operation on the blocking pool, wrap the result in the
//! JSON envelope.

pub mod error;
pub mod notify;
pub mod response;
pub mod routes;
pub mod session;

use crate::config::{ConfigError, ServerConfig};
use axum::{
    Json, Router,
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::get,
};
use error::{ApiError, ApiResult};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use hrdesk_core::{HrResult, Store};
use notify::ResetNotifier;
use response::Envelope;
use serde_json::json;
use session::TokenKeys;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// How often idle rate-limit keys are swept from memory.
pub const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<ServerConfig>,
    pub tokens: Arc<TokenKeys>,
    pub notifier: Arc<dyn ResetNotifier>,
    pub limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl AppState {
    pub fn new(
        store: Store,
        config: ServerConfig,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let per_minute =
            NonZeroU32::new(config.auth_rate_per_minute).ok_or(ConfigError::Zero("auth_rate_per_minute"))?;
        Ok(Self {
            store,
            tokens: Arc::new(TokenKeys::new(&config)),
            config: Arc::new(config),
            notifier,
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
        })
    }

    /// Run a store operation on the blocking pool.
    ///
    /// redb commits fsync and argon2 burns CPU; neither belongs on a
    /// runtime worker.
    pub async fn run<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Store) -> HrResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
            .map_err(ApiError::from)
    }

    /// Per-email throttle for credential endpoints.
    pub fn throttle(&self, action: &str, email: &str) -> ApiResult<()> {
        let key = format!("{action}:{email}");
        self.limiter.check_key(&key).map_err(|_| {
            warn!(action, email, "rate limit exceeded");
            ApiError::TooManyRequests
        })
    }

    /// Forget throttle keys whose quota has fully replenished and return
    /// how many are still tracked.
    pub fn prune_limiter(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("config", &self.config.bind_address())
            .finish_non_exhaustive()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::<()>::failure("Route not found")),
    )
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .allow_credentials(true)
            .max_age(Duration::from_secs(60 * 60)),
    )
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", routes::api())
        .fallback(fallback)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let app = match cors {
        Some(cors) => app.layer(cors),
        None => app,
    };
    app.with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let address = state.config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("HR Desk listening on {address}");

    let pruner = tokio::spawn(prune_limiter_periodically(state.clone()));
    let app = router(state);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    pruner.abort();
    served?;

    info!("Server stopped");
    Ok(())
}

/// Sweep the throttle map every [`LIMITER_PRUNE_INTERVAL`] so one-off
/// emails do not accumulate for the life of the process.
async fn prune_limiter_periodically(state: AppState) {
    let mut interval = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        let tracked = state.prune_limiter();
        debug!(tracked, "rate limiter pruned");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
