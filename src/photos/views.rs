use super::models::{Photo, PhotoOwner};
use super::services;
use crate::common::auth::protect;
use crate::common::errors::BusinessResult;
use crate::common::multipart::read_form;
use crate::common::state::AppState;
use crate::inspections::sections::SectionKind;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

/// Photo endpoints, mounted at `/api/photos`
pub fn router(state: &AppState) -> OpenApiRouter {
    let photos = OpenApiRouter::new()
        .routes(routes!(get_photo))
        .routes(routes!(view_photo))
        .routes(routes!(add_photos))
        .with_state(state.clone());
    protect(photos, state, "photos")
}

pub(crate) fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Photo metadata", body = Photo),
        (status = 404, description = "Photo not found")
    ),
    tag = "photos"
)]
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> BusinessResult<Json<Photo>> {
    let photo = services::get_photo(&state.db, id).await?;
    Ok(Json(photo.into()))
}

/// View a photo inline
#[utoipa::path(
    get,
    path = "/{id}/view",
    params(("id" = Uuid, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Photo or its file not found"),
        (status = 502, description = "Storage backend failed")
    ),
    tag = "photos"
)]
pub async fn view_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> BusinessResult<Response> {
    let photo = services::get_photo(&state.db, id).await?;
    let bytes = state.media.get(&photo.storage_key).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&photo.original_filename)),
    );
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("inline; filename=\"{}\"", photo.original_filename))
    {
        headers.insert(CONTENT_DISPOSITION, disposition);
    }
    Ok((headers, bytes).into_response())
}

/// Add photos to an existing section instance
///
/// Accepts a `zip_photos` archive and/or individual jpg/png files in one multipart body.
#[utoipa::path(
    post,
    path = "/sections/{section}/{owner_id}",
    params(
        ("section" = SectionKind, Path, description = "Section kind owning the photos"),
        ("owner_id" = Uuid, Path, description = "ID of the section instance")
    ),
    request_body(content_type = "multipart/form-data", description = "zip_photos archive and/or image files"),
    responses(
        (status = 201, description = "Photos added", body = Vec<Photo>),
        (status = 400, description = "Unreadable archive or unsupported file"),
        (status = 404, description = "Section instance not found")
    ),
    tag = "photos"
)]
pub async fn add_photos(
    State(state): State<AppState>,
    Path((section, owner_id)): Path<(SectionKind, Uuid)>,
    multipart: Multipart,
) -> BusinessResult<(StatusCode, Json<Vec<Photo>>)> {
    let form = read_form(multipart).await?;
    let owner = PhotoOwner::new(section, owner_id);
    let created = services::add_photos(&state.db, state.media.as_ref(), owner, form.files).await?;
    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(Photo::from).collect()),
    ))
}
