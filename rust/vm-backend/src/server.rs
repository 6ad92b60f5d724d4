//! HTTP server setup and middleware.

use std::time::Duration;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::config::AppConfig;
use crate::logging::{PhaseTimer, StartupLog};
use crate::manager::Cloud;
use crate::store;
use crate::AppState;

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load the VM list and build the application.
pub async fn build(config: AppConfig) -> anyhow::Result<Router> {
    let overall = PhaseTimer::start("build");
    let mut startup = StartupLog::begin(
        3,
        format!("VM Backend v{VERSION}"),
        format!("Listening on {}", config.server.bind_address()),
    );

    let timer = PhaseTimer::start("load_vms");
    let vms = store::load_vms(&config.storage.vms_file).await;
    timer.finish_with(vms.as_ref());
    let vms = vms?;
    if vms.is_empty() {
        tracing::warn!(
            path = %config.storage.vms_file.display(),
            "VM list is empty; every request other than GET /vms will fail"
        );
    }
    startup.step(
        "Registry",
        format!("{} VMs from {}", vms.len(), config.storage.vms_file.display()),
    );

    let delays = config.lifecycle.delays();
    let cloud = Cloud::new(vms, delays);
    startup.step(
        "Cloud",
        format!("start delay {:?}, stop delay {:?}", delays.start, delays.stop),
    );

    let app = create_app(&config, cloud);
    startup.step("Router", "dispatcher + middleware configured");

    overall.finish();
    startup.ready("VM backend created successfully");

    Ok(app)
}

/// Create the router serving `cloud`.
pub fn create_app(config: &AppConfig, cloud: Cloud) -> Router {
    let timeout = Duration::from_secs(config.server.timeout_secs);

    Router::new()
        .fallback(api::dispatch)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { cloud })
}
