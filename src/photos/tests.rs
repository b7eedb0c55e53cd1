use crate::config::test_helpers::{
    TestApp, create_test_user, extract_response_body, extract_response_bytes, get_request,
    json_request, multipart_body, png_bytes, setup_test_app, zip_bytes,
};
use crate::users::models::Role;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

/// Submits an inspection with one pallet item and returns (inspection id, pallet id)
async fn inspection_with_pallet(app: &TestApp) -> (String, String) {
    let inspector = create_test_user(&app.state.db, "inspector", "pw", Role::Inspector).await;
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/inspections/full",
            &json!({
                "inspection_date": "2025-03-01",
                "inspector": inspector.id,
                "mushroom_storage": [{
                    "quantity_of_boxes": 10,
                    "quantity_of_pallets": 1,
                    "temperature_in_fridge": "2",
                    "mushroom_temperature_min": "1",
                    "mushroom_temperature_max": "3"
                }],
                "pallets": [{}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let inspection_id = extract_response_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/api/inspections/{inspection_id}/detail")))
        .await
        .unwrap();
    let detail = extract_response_body(response).await;
    let pallet_id = detail["pallets"][0]["id"].as_str().unwrap().to_string();
    (inspection_id, pallet_id)
}

fn upload_request(uri: &str, files: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    let (content_type, body) = multipart_body(&[], files);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_add_photos_to_existing_section() {
    let app = setup_test_app().await;
    let (inspection_id, pallet_id) = inspection_with_pallet(&app).await;

    let archive = zip_bytes(&[
        ("batch/", Vec::new()),
        ("batch/p1.png", png_bytes(4, 4)),
        ("notes.txt", b"not a photo".to_vec()),
    ]);
    let response = app
        .router
        .clone()
        .oneshot(upload_request(
            &format!("/api/photos/sections/pallets/{pallet_id}"),
            &[
                ("zip_photos", "pallets.zip", archive),
                ("photo", "extra.png", png_bytes(3, 2)),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = extract_response_body(response).await;
    let created = created.as_array().unwrap();
    assert_eq!(created.len(), 2);
    for photo in created {
        assert_eq!(photo["section"], "pallets");
        assert_eq!(photo["owner_id"], pallet_id.as_str());
        assert_eq!(photo["inspection_id"], inspection_id.as_str());
        assert!(
            photo["storage_key"]
                .as_str()
                .unwrap()
                .starts_with("photos/2025-03-01_")
        );
    }

    let response = app
        .router
        .oneshot(get_request(&format!(
            "/api/inspections/{inspection_id}/photos?section=pallets"
        )))
        .await
        .unwrap();
    assert_eq!(extract_response_body(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_photos_to_unknown_owner() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(upload_request(
            &format!("/api/photos/sections/quality/{}", Uuid::new_v4()),
            &[("photo", "q.png", png_bytes(2, 2))],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_upload_is_rejected() {
    let app = setup_test_app().await;
    let (_, pallet_id) = inspection_with_pallet(&app).await;

    let response = app
        .router
        .oneshot(upload_request(
            &format!("/api/photos/sections/pallets/{pallet_id}"),
            &[("photo", "readme.txt", b"hello".to_vec())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_and_view_photo() {
    let app = setup_test_app().await;
    let (_, pallet_id) = inspection_with_pallet(&app).await;
    let image = png_bytes(5, 5);

    let response = app
        .router
        .clone()
        .oneshot(upload_request(
            &format!("/api/photos/sections/pallets/{pallet_id}"),
            &[("photo", "front.png", image.clone())],
        ))
        .await
        .unwrap();
    let created = extract_response_body(response).await;
    let photo_id = created[0]["id"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/api/photos/{photo_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_response_body(response).await;
    assert_eq!(body["original_filename"], "front.png");
    assert_eq!(body["url"], format!("/api/photos/{photo_id}/view"));

    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/api/photos/{photo_id}/view")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(extract_response_bytes(response).await, image);

    let response = app
        .router
        .oneshot(get_request(&format!("/api/photos/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_same_file_name_uploaded_twice_keeps_both_photos() {
    let app = setup_test_app().await;
    let (_, pallet_id) = inspection_with_pallet(&app).await;
    let uri = format!("/api/photos/sections/pallets/{pallet_id}");
    let small = png_bytes(5, 5);
    let large = png_bytes(7, 7);

    let mut ids = Vec::new();
    for image in [&small, &large] {
        let response = app
            .router
            .clone()
            .oneshot(upload_request(&uri, &[("photo", "front.png", image.clone())]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = extract_response_body(response).await;
        ids.push((
            created[0]["id"].as_str().unwrap().to_string(),
            created[0]["storage_key"].as_str().unwrap().to_string(),
        ));
    }
    assert_ne!(ids[0].1, ids[1].1);

    for ((id, _), expected) in ids.iter().zip([&small, &large]) {
        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/api/photos/{id}/view")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&extract_response_bytes(response).await, expected);
    }
}
