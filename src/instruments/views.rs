use super::scales::models::{Scale, router as scale_crudrouter};
use super::services::{self, Instrument};
use super::thermometers::models::{Thermometer, router as thermometer_crudrouter};
use crate::common::auth::protect;
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::Response;
use crudcrate::CRUDResource;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

/// Ids named by a batch delete body, either `[id, ..]` or `{"ids": [id, ..]}`
fn batch_ids(body: &[u8]) -> Vec<Uuid> {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
    let list = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => map
            .get("ids")
            .and_then(serde_json::Value::as_array)
            .map_or(&[][..], Vec::as_slice),
        _ => &[],
    };
    list.iter()
        .filter_map(serde_json::Value::as_str)
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect()
}

/// Turns a delete of a still referenced instrument into a 409 before it reaches the database
async fn guard_delete(
    State((state, instrument)): State<(AppState, Instrument)>,
    request: Request,
    next: Next,
) -> Result<Response, BusinessError> {
    if request.method() != Method::DELETE {
        return Ok(next.run(request).await);
    }

    let last_segment = request
        .uri()
        .path()
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string();

    if let Ok(id) = Uuid::parse_str(&last_segment) {
        services::ensure_unreferenced(&state.db, instrument, id).await?;
        return Ok(next.run(request).await);
    }

    // Batch deletes carry their ids in the body
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, state.config.max_upload_bytes)
        .await
        .map_err(|e| crate::validation_error!("body", e.to_string()))?;
    for id in batch_ids(&bytes) {
        services::ensure_unreferenced(&state.db, instrument, id).await?;
    }
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn guarded(router: OpenApiRouter, state: &AppState, instrument: Instrument) -> OpenApiRouter {
    router.layer(middleware::from_fn_with_state(
        (state.clone(), instrument),
        guard_delete,
    ))
}

pub fn thermometer_router(state: &AppState) -> OpenApiRouter {
    protect(
        guarded(
            thermometer_crudrouter(&state.db.clone()),
            state,
            Instrument::Thermometer,
        ),
        state,
        Thermometer::RESOURCE_NAME_PLURAL,
    )
}

pub fn scale_router(state: &AppState) -> OpenApiRouter {
    protect(
        guarded(scale_crudrouter(&state.db.clone()), state, Instrument::Scale),
        state,
        Scale::RESOURCE_NAME_PLURAL,
    )
}

#[cfg(test)]
mod tests {
    use super::batch_ids;
    use rstest::rstest;
    use uuid::Uuid;

    const ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    #[rstest]
    #[case(format!("[\"{ID}\"]"), 1)]
    #[case(format!("{{\"ids\": [\"{ID}\", \"not-an-id\"]}}"), 1)]
    #[case("".to_string(), 0)]
    #[case("{\"other\": 1}".to_string(), 0)]
    fn test_batch_ids(#[case] body: String, #[case] expected: usize) {
        let ids = batch_ids(body.as_bytes());
        assert_eq!(ids.len(), expected);
        assert!(ids.iter().all(|id| *id == Uuid::parse_str(ID).unwrap()));
    }
}
