use axum::{Json, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    ok: bool,
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses(
        (status = 200, description = "Service is up", body = Health)
    ),
    tag = "health",
)]
/// Unconditional liveness probe.
pub async fn healthcheck() -> impl IntoResponse {
    Json(Health { ok: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_serializes_to_ok_true() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(Health { ok: true })?;
        assert_eq!(value, serde_json::json!({ "ok": true }));
        Ok(())
    }
}
