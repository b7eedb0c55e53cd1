use super::data::{PhotoSelection, ReportData, load_report_data};
use crate::config::test_helpers::{
    TestApp, create_test_user, extract_response_body, extract_response_bytes, get_request,
    json_request, multipart_body, png_bytes, setup_test_app, zip_bytes,
};
use crate::inspections::loading::models as loading;
use crate::inspections::models as inspections;
use crate::inspections::quality::models as quality;
use crate::inspections::quantity::boxes::models as boxes;
use crate::inspections::quantity::models as quantity;
use crate::inspections::sections::SectionKind;
use crate::inspections::storage::models as storage;
use crate::instruments::scales::models as scales;
use crate::instruments::thermometers::models as thermometers;
use crate::photos::models as photos;
use crate::users::models::Role;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use tower::ServiceExt;
use uuid::Uuid;

pub(crate) fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn inspection_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

pub(crate) fn storage_section(boxes: i32, pallets: i32) -> storage::Model {
    storage::Model {
        id: Uuid::new_v4(),
        inspection_id: Uuid::nil(),
        position: 0,
        quantity_of_boxes: boxes,
        quantity_of_pallets: pallets,
        temperature_in_fridge: dec("2.00"),
        mushroom_temperature_min: dec("1.50"),
        mushroom_temperature_max: dec("3.00"),
        thermometer_id: None,
        invoice_number: Some("INV-7".to_string()),
        created_at: Utc::now(),
    }
}

pub(crate) fn quality_section(sample: &str, conforms: &str) -> quality::Model {
    quality::Model {
        id: Uuid::new_v4(),
        inspection_id: Uuid::nil(),
        position: 0,
        sample_mass_kg: Some(dec(sample)),
        conforms_to_declared_grade: Some(dec(conforms)),
        off_grade_mass_kg_50: None,
        off_grade_mass_kg_70: None,
        created_at: Utc::now(),
    }
}

pub(crate) fn box_weight(gross: &str, pallet: &str) -> boxes::Model {
    boxes::Model {
        id: Uuid::new_v4(),
        quantity_inspection_id: Uuid::nil(),
        position: 0,
        gross_weight: dec(gross),
        pallet_weight: dec(pallet),
        created_at: Utc::now(),
    }
}

pub(crate) fn photo(data: &ReportData, section: SectionKind, name: &str) -> photos::Model {
    let mut model = photos::Model {
        id: Uuid::new_v4(),
        inspection_id: data.inspection.id,
        section,
        storage_id: None,
        marking_id: None,
        quantity_inspection_id: None,
        quality_inspection_id: None,
        diameter_measurement_id: None,
        pallet_id: None,
        loading_id: None,
        original_filename: name.to_string(),
        storage_key: format!("photos/2025-03-01_10-00-00/{}/{name}", section.storage_dir()),
        size_bytes: 10,
        uploaded_at: Utc::now(),
    };
    let owner = Some(Uuid::new_v4());
    match section {
        SectionKind::Placement => model.storage_id = owner,
        SectionKind::Marking => model.marking_id = owner,
        SectionKind::Quantity => model.quantity_inspection_id = owner,
        SectionKind::Quality => model.quality_inspection_id = owner,
        SectionKind::Diameter => model.diameter_measurement_id = owner,
        SectionKind::Pallets => model.pallet_id = owner,
        SectionKind::Loading => model.loading_id = owner,
    }
    model
}

/// A complete inspection: 120 boxes on 4 pallets, 10 kg sample with 9 kg conforming
pub(crate) fn report_data() -> ReportData {
    let now = Utc::now();
    ReportData {
        inspection: inspections::Model {
            id: Uuid::new_v4(),
            inspection_date: inspection_date(),
            inspector_id: Uuid::new_v4(),
            job_number: Some("JOB-42".to_string()),
            created_at: now,
            last_updated: now,
            inspector_name: None,
            car_number: None,
        },
        storage: Some(storage_section(120, 4)),
        storage_thermometer: Some(thermometers::Model {
            id: Uuid::new_v4(),
            info: "TP-101".to_string(),
            serial: Some("SN-1".to_string()),
            calibration_date: NaiveDate::from_ymd_opt(2024, 11, 5),
            created_at: now,
        }),
        quantity: Some(quantity::Model {
            id: Uuid::new_v4(),
            inspection_id: Uuid::nil(),
            position: 0,
            scale_id: None,
            created_at: now,
        }),
        scale: Some(scales::Model {
            id: Uuid::new_v4(),
            model: "ВЭ-15".to_string(),
            serial_number: Some("S-77".to_string()),
            calibration_date: NaiveDate::from_ymd_opt(2024, 4, 1),
            created_at: now,
        }),
        boxes: Vec::new(),
        quality: Some(quality_section("10", "9")),
        loading: Some(loading::Model {
            id: Uuid::new_v4(),
            inspection_id: Uuid::nil(),
            position: 0,
            mushroom_temperature: Some(dec("2.7")),
            thermometer_id: None,
            car_number: None,
            refrigerator_number: None,
            seal_number: None,
            transport_temperature: None,
            created_at: now,
        }),
        loading_thermometer: None,
        photos: BTreeMap::new(),
    }
}

async fn submit(app: &TestApp, body: &serde_json::Value) -> Uuid {
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/inspections/full", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_response_body(response).await;
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

fn complete_submission(inspector: Uuid) -> serde_json::Value {
    json!({
        "inspection_date": "2025-03-01",
        "inspector": inspector,
        "job_number": "JOB-42",
        "mushroom_storage": [{
            "quantity_of_boxes": 120,
            "quantity_of_pallets": 4,
            "temperature_in_fridge": "2",
            "mushroom_temperature_min": "1.5",
            "mushroom_temperature_max": "3"
        }],
        "quantity_inspections": [{
            "scale_model": "ВЭ-15",
            "boxes": [
                {"gross_weight": "120", "pallet_weight": "10"},
                {"gross_weight": "118.5", "pallet_weight": "9.5"}
            ]
        }],
        "quality_inspections": [{
            "sample_mass_kg": "10",
            "conforms_to_declared_grade": "9"
        }],
        "product_loading": [{"mushroom_temperature": "2.7", "car_number": "1234 AB-7"}]
    })
}

fn report_request(id: Uuid, body: &serde_json::Value) -> Request<Body> {
    json_request("POST", &format!("/api/inspections/{id}/report"), body)
}

#[tokio::test]
async fn test_generate_and_download_report() {
    let app = setup_test_app().await;
    let inspector = create_test_user(&app.state.db, "inspector", "secret", Role::Inspector).await;
    let id = submit(&app, &complete_submission(inspector.id)).await;

    let response = app
        .router
        .clone()
        .oneshot(report_request(id, &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_response_body(response).await;
    assert_eq!(body["storage_key"], "reports/2025-03-01.docx");
    assert_eq!(body["photos"], 0);
    assert!(app.media_dir.path().join("reports/2025-03-01.docx").exists());

    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/api/inspections/{id}/report")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    let bytes = extract_response_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_report_embeds_selected_photos_of_the_section() {
    let app = setup_test_app().await;
    let inspector = create_test_user(&app.state.db, "inspector", "secret", Role::Inspector).await;

    let fields = vec![
        ("inspection_date", "2025-03-01".to_string()),
        ("inspector", inspector.id.to_string()),
        ("mushroom_storage[0].quantity_of_boxes", "120".to_string()),
        ("mushroom_storage[0].quantity_of_pallets", "4".to_string()),
        ("mushroom_storage[0].temperature_in_fridge", "2".to_string()),
        ("mushroom_storage[0].mushroom_temperature_min", "1".to_string()),
        ("mushroom_storage[0].mushroom_temperature_max", "3".to_string()),
        ("quantity_inspections[0].boxes[0].gross_weight", "120".to_string()),
        ("quantity_inspections[0].boxes[0].pallet_weight", "10".to_string()),
        ("quality_inspections[0].sample_mass_kg", "10".to_string()),
        ("quality_inspections[0].conforms_to_declared_grade", "9".to_string()),
    ];
    let quality_zip = zip_bytes(&[("q1.png", png_bytes(8, 6)), ("q2.png", png_bytes(6, 8))]);
    let pallet_zip = zip_bytes(&[("p1.png", png_bytes(4, 4))]);
    let (content_type, body) = multipart_body(
        &fields,
        &[
            ("quality_inspections[0].zip_photos", "quality.zip", quality_zip),
            ("pallets[0].zip_photos", "pallets.zip", pallet_zip),
        ],
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/inspections/full")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = extract_response_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .router
        .clone()
        .oneshot(get_request(&format!("/api/inspections/{id}/photos")))
        .await
        .unwrap();
    let photos = extract_response_body(response).await;
    let id_of = |section: &str, name: &str| {
        photos
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["section"] == section && p["original_filename"] == name)
            .map(|p| p["id"].clone())
            .unwrap()
    };

    // The pallet photo is listed under quality and must be ignored there
    let selection = json!({
        "quality_photo_ids": [id_of("quality", "q2.png"), id_of("quality", "q1.png"), id_of("pallets", "p1.png")],
    });
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", &format!("/api/inspections/{id}/report"), &selection))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_response_body(response).await;
    assert_eq!(body["photos"], 2);
}

#[tokio::test]
async fn test_report_without_quality_section_is_unprocessable() {
    let app = setup_test_app().await;
    let inspector = create_test_user(&app.state.db, "inspector", "secret", Role::Inspector).await;
    let mut submission = complete_submission(inspector.id);
    submission["quality_inspections"] = json!([]);
    let id = submit(&app, &submission).await;

    let response = app
        .router
        .clone()
        .oneshot(report_request(id, &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_response_body(response).await;
    assert_eq!(body["error"]["code"], "BUSINESS_RULE_VIOLATION");
    assert!(body["error"]["message"].as_str().unwrap().contains("quality"));
    assert!(!app.media_dir.path().join("reports/2025-03-01.docx").exists());
}

#[tokio::test]
async fn test_report_with_null_sample_mass_names_the_field() {
    let app = setup_test_app().await;
    let inspector = create_test_user(&app.state.db, "inspector", "secret", Role::Inspector).await;
    let mut submission = complete_submission(inspector.id);
    submission["quality_inspections"] = json!([{"conforms_to_declared_grade": "9"}]);
    let id = submit(&app, &submission).await;

    let response = app
        .router
        .clone()
        .oneshot(report_request(id, &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_response_body(response).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("sample_mass_kg"));
}

#[tokio::test]
async fn test_report_for_unknown_inspection() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(report_request(Uuid::new_v4(), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .oneshot(get_request(&format!("/api/inspections/{}/report", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_before_generation_is_not_found() {
    let app = setup_test_app().await;
    let inspector = create_test_user(&app.state.db, "inspector", "secret", Role::Inspector).await;
    let id = submit(&app, &complete_submission(inspector.id)).await;

    let response = app
        .router
        .oneshot(get_request(&format!("/api/inspections/{id}/report")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_weighs_only_the_first_quantity_section() {
    let app = setup_test_app().await;
    let inspector = create_test_user(&app.state.db, "inspector", "secret", Role::Inspector).await;
    let mut submission = complete_submission(inspector.id);
    submission["quantity_inspections"]
        .as_array_mut()
        .unwrap()
        .push(json!({
            "boxes": [
                {"gross_weight": "300", "pallet_weight": "20"},
                {"gross_weight": "310", "pallet_weight": "20"},
                {"gross_weight": "320", "pallet_weight": "20"}
            ]
        }));
    let id = submit(&app, &submission).await;

    let data = load_report_data(&app.state.db, id, &PhotoSelection::default())
        .await
        .unwrap();
    let quantity = data.quantity.as_ref().unwrap();
    assert_eq!(data.boxes.len(), 2);
    assert!(data.boxes.iter().all(|weighed| weighed.quantity_inspection_id == quantity.id));
    let gross: Vec<Decimal> = data.boxes.iter().map(|weighed| weighed.gross_weight).collect();
    assert_eq!(gross, vec![dec("120"), dec("118.5")]);

    let response = app
        .router
        .oneshot(report_request(id, &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
