use crate::common::state::AppState;
use crate::{common, inspections, instruments, photos, reports, users};
use axum::{Router, extract::DefaultBodyLimit};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

pub fn build_router(state: &AppState) -> Router {
    #[derive(OpenApi)]
    #[openapi(
        modifiers(&SecurityAddon),
        security(
            ("bearerAuth" = [])
        )
    )]
    struct ApiDoc;

    struct SecurityAddon;

    impl utoipa::Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme(
                    "bearerAuth",
                    utoipa::openapi::security::SecurityScheme::Http(
                        utoipa::openapi::security::HttpBuilder::new()
                            .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                            .bearer_format("JWT")
                            .build(),
                    ),
                );
            }
        }
    }

    let mut api = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(common::views::router(state)) // Root routes
        .nest("/api/token", users::views::token_router(state))
        .nest("/api/users", users::views::router(state))
        .nest(
            "/api/thermometers",
            instruments::views::thermometer_router(state),
        )
        .nest("/api/scales", instruments::views::scale_router(state))
        .nest(
            "/api/inspections",
            inspections::views::router(state).merge(reports::views::router(state)),
        )
        .nest("/api/photos", photos::views::router(state));

    for (path, router) in inspections::views::section_routers(state) {
        api = api.nest(&path, router);
    }

    let (router, api) = api.split_for_parts();

    router
        .merge(Scalar::with_url("/api/docs", api))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
}
