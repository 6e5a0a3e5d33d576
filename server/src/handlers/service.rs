use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
struct ServicePayload {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    storage: &'static str,
}

pub async fn root() -> Response {
    let payload = ServicePayload {
        name: "Wat2Do API",
        version: env!("CARGO_PKG_VERSION"),
    };

    success(payload, "Wat2Do API is running")
}

pub async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    state.events.ping().await?;

    let payload = HealthPayload {
        status: "ok",
        storage: "ok",
    };
    Ok(success(payload, "Health check successful"))
}
