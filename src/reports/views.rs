use super::data::PhotoSelection;
use super::services::{self, GeneratedReport};
use crate::common::auth::protect;
use crate::common::errors::BusinessResult;
use crate::common::state::AppState;
use crate::photos::views::content_type_for;
use axum::{
    Json,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

/// Report endpoints, merged into the inspections router
pub fn router(state: &AppState) -> OpenApiRouter {
    let reports = OpenApiRouter::new()
        .routes(routes!(generate_report, download_report))
        .with_state(state.clone());
    protect(reports, state, "reports")
}

/// Generate the inspection report
///
/// Every photo list is optional; ids that do not name a photo of that section of this
/// inspection are ignored. The document replaces any report stored for the same date.
#[utoipa::path(
    post,
    path = "/{id}/report",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    request_body = PhotoSelection,
    responses(
        (status = 200, description = "Report generated and stored", body = GeneratedReport),
        (status = 404, description = "Inspection not found"),
        (status = 422, description = "A required section or figure is missing"),
        (status = 502, description = "Photo or report storage failed")
    ),
    tag = "reports",
    summary = "Generate report"
)]
pub async fn generate_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(selection): Json<PhotoSelection>,
) -> BusinessResult<Json<GeneratedReport>> {
    let report = services::generate_report(
        &state.db,
        state.media.as_ref(),
        &state.config.report,
        id,
        &selection,
    )
    .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/{id}/report",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "The stored DOCX report", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 404, description = "Inspection or report not found")
    ),
    tag = "reports",
    summary = "Download report"
)]
pub async fn download_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> BusinessResult<Response> {
    let (file_name, bytes) = services::download_report(&state.db, state.media.as_ref(), id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&file_name)),
    );
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
    {
        headers.insert(CONTENT_DISPOSITION, disposition);
    }
    Ok((headers, bytes).into_response())
}
