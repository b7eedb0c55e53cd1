use super::diameter::models::{DiameterMeasurement, router as diameter_crudrouter};
use super::loading::models::{ProductLoading, router as loading_crudrouter};
use super::marking::models::{ProductMarking, router as marking_crudrouter};
use super::models::{Inspection, router as crudrouter};
use super::pallets::models::{Pallet, router as pallets_crudrouter};
use super::quality::models::{QualityInspection, router as quality_crudrouter};
use super::quantity::boxes::models::{BoxWeight, router as boxes_crudrouter};
use super::quantity::models::{QuantityInspection, router as quantity_crudrouter};
use super::sections::SectionKind;
use super::services::{self, InspectionDetail};
use super::storage::models::{MushroomStorage, router as storage_crudrouter};
use super::submission::{FullInspectionSubmission, decode_form};
use crate::common::auth::protect;
use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::multipart::read_form;
use crate::common::state::AppState;
use crate::photos::models::Photo;
use axum::{
    Json,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
};
use crudcrate::CRUDResource;
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

/// Inspections CRUD plus the composite submission, mounted at `/api/inspections`
pub fn router(state: &AppState) -> OpenApiRouter {
    let composite = OpenApiRouter::new()
        .routes(routes!(create_full_inspection))
        .routes(routes!(get_inspection_detail))
        .routes(routes!(list_inspection_photos))
        .with_state(state.clone());

    protect(
        crudrouter(&state.db.clone()).merge(composite),
        state,
        Inspection::RESOURCE_NAME_PLURAL,
    )
}

/// CRUD routers of the section tables with their mount paths
pub fn section_routers(state: &AppState) -> Vec<(String, OpenApiRouter)> {
    let db = state.db.clone();
    [
        (MushroomStorage::RESOURCE_NAME_PLURAL, storage_crudrouter(&db)),
        (ProductMarking::RESOURCE_NAME_PLURAL, marking_crudrouter(&db)),
        (QuantityInspection::RESOURCE_NAME_PLURAL, quantity_crudrouter(&db)),
        (BoxWeight::RESOURCE_NAME_PLURAL, boxes_crudrouter(&db)),
        (QualityInspection::RESOURCE_NAME_PLURAL, quality_crudrouter(&db)),
        (DiameterMeasurement::RESOURCE_NAME_PLURAL, diameter_crudrouter(&db)),
        (Pallet::RESOURCE_NAME_PLURAL, pallets_crudrouter(&db)),
        (ProductLoading::RESOURCE_NAME_PLURAL, loading_crudrouter(&db)),
    ]
    .into_iter()
    .map(|(resource, router)| (format!("/api/{resource}"), protect(router, state, resource)))
    .collect()
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// Create an inspection with all of its sections in one request
///
/// Accepts either `multipart/form-data` with flattened keys such as
/// `mushroom_storage[0].quantity_of_boxes` and `pallets[0].zip_photos` archives,
/// or a JSON body with the same nested shape (without archives). Nothing is
/// stored unless every section is valid.
#[utoipa::path(
    post,
    path = "/full",
    request_body(
        content_type = "multipart/form-data",
        description = "Flattened inspection fields and section[index].zip_photos archives"
    ),
    responses(
        (status = 201, description = "Inspection created", body = Inspection),
        (status = 400, description = "Field errors keyed by the flattened key"),
        (status = 502, description = "Photo storage failed")
    ),
    tag = "inspections",
    summary = "Submit a full inspection"
)]
pub async fn create_full_inspection(
    State(state): State<AppState>,
    request: Request,
) -> BusinessResult<(StatusCode, Json<Inspection>)> {
    let submission = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| crate::validation_error!("body", e.body_text()))?;
        let form = read_form(multipart).await?;
        decode_form(form).map_err(|fields| BusinessError::InvalidSubmission { fields })?
    } else {
        let Json(submission) = Json::<FullInspectionSubmission>::from_request(request, &state)
            .await
            .map_err(|e| crate::validation_error!("body", e.body_text()))?;
        submission
    };

    let inspection =
        services::create_full_inspection(&state.db, state.media.as_ref(), submission).await?;
    Ok((StatusCode::CREATED, Json(inspection)))
}

#[utoipa::path(
    get,
    path = "/{id}/detail",
    params(("id" = Uuid, Path, description = "Inspection ID")),
    responses(
        (status = 200, description = "Inspection with sections, boxes and photos", body = InspectionDetail),
        (status = 404, description = "Inspection not found")
    ),
    tag = "inspections",
    summary = "Get inspection detail"
)]
pub async fn get_inspection_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> BusinessResult<Json<InspectionDetail>> {
    Ok(Json(services::get_inspection_detail(&state.db, id).await?))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PhotoFilter {
    /// Only photos of this section
    pub section: Option<SectionKind>,
}

#[utoipa::path(
    get,
    path = "/{id}/photos",
    params(("id" = Uuid, Path, description = "Inspection ID"), PhotoFilter),
    responses(
        (status = 200, description = "Photos of the inspection", body = Vec<Photo>),
        (status = 404, description = "Inspection not found")
    ),
    tag = "inspections",
    summary = "List inspection photos"
)]
pub async fn list_inspection_photos(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filter): Query<PhotoFilter>,
) -> BusinessResult<Json<Vec<Photo>>> {
    services::ensure_inspection_exists(&state.db, id).await?;
    let photos = crate::photos::services::list_photos(&state.db, id, filter.section).await?;
    Ok(Json(photos.into_iter().map(Photo::from).collect()))
}
