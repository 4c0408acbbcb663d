//! Integration tests for property browsing, search and multipart publishing

use axum::http::{Method, StatusCode};
use estate_api::{
    handlers::types::{MAX_LIMIT, MAX_PAGE},
    models::{PropertyType, Role},
    repositories::PropertyRepository,
};
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{Part, TestApp, multipart_request, sample_input, valid_form_fields};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

fn png(file_name: &'static str) -> Part<'static> {
    Part::File {
        name: "images",
        file_name,
        content_type: "image/png",
        bytes: PNG,
    }
}

#[tokio::test]
async fn agent_creates_property_with_features_and_images() {
    let app = TestApp::new().await;
    let (agent, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts = valid_form_fields();
    parts.push(Part::Text("features", r#"["Pool"," Garage ","Pool"]"#));
    parts.push(png("front.png"));
    parts.push(png("back.png"));

    let (status, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let property = &body["property"];
    assert_eq!(property["ownerId"], agent.id.to_string());
    assert_eq!(property["status"], "ACTIVE");
    assert_eq!(property["features"].as_array().unwrap().len(), 2);
    assert_eq!(property["images"].as_array().unwrap().len(), 2);
    assert!(
        property["images"][0]["url"]
            .as_str()
            .unwrap()
            .starts_with("/uploads/")
    );
    assert_eq!(app.stored_files(), 2);
}

#[tokio::test]
async fn features_keep_submission_order() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts = valid_form_fields();
    parts.push(Part::Text("features", r#"["Pool","Garage","Balcony","Garage"]"#));
    let (status, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(
        body["property"]["features"],
        json!(["Pool", "Garage", "Balcony"])
    );

    let (_, fetched) = app
        .get(
            &format!("/api/properties/{}", body["property"]["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(fetched["features"], json!(["Pool", "Garage", "Balcony"]));
}

#[tokio::test]
async fn non_finite_coordinates_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts = valid_form_fields();
    parts.push(Part::Text("latitude", "NaN"));
    parts.push(Part::Text("longitude", "inf"));
    let (status, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["latitude"], "must be a finite number");
    assert_eq!(body["details"]["longitude"], "must be a finite number");
}

#[tokio::test]
async fn long_zip_codes_and_features_are_stored() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;
    let zip_code = "9".repeat(40);
    let feature = "Panoramic ".repeat(15);
    let features = serde_json::to_string(&[feature.trim()]).unwrap();

    let mut parts = vec![Part::Text("zipCode", &zip_code)];
    for part in valid_form_fields() {
        if !matches!(part, Part::Text("zipCode", _)) {
            parts.push(part);
        }
    }
    parts.push(Part::Text("features", &features));
    let (status, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["property"]["zipCode"], zip_code);
    assert_eq!(body["property"]["features"], json!([feature.trim()]));
}

#[tokio::test]
async fn stored_images_are_served_under_uploads() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts = valid_form_fields();
    parts.push(png("front.png"));
    let (_, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;
    let url = body["property"]["images"][0]["url"].as_str().unwrap().to_string();

    let (status, _) = app.get(&url, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn regular_user_cannot_publish() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Plain User", "user@example.com", Role::User)
        .await;

    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/properties",
            &token,
            &valid_form_fields(),
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Insufficient permissions");
}

#[tokio::test]
async fn missing_field_is_rejected_without_storing_images() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts: Vec<Part> = valid_form_fields()
        .into_iter()
        .filter(|part| !matches!(part, Part::Text("city", _)))
        .collect();
    parts.push(png("front.png"));

    let (status, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["city"], "is required");
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn unsupported_image_type_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts = valid_form_fields();
    parts.push(Part::File {
        name: "images",
        file_name: "notes.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.7",
    });

    let (status, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["images"].is_string());
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn more_than_ten_images_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts = valid_form_fields();
    for _ in 0..11 {
        parts.push(png("photo.png"));
    }

    let (status, _) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn get_unknown_property_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app
        .get(&format!("/api/properties/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Property not found");

    let (status, _) = app.get("/api/properties/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_property_includes_owner() {
    let app = TestApp::new().await;
    let (agent, _) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;
    let created = app
        .create_property(agent.id, sample_input("Quiet cottage", "Springfield", 100_000.0))
        .await;

    let (status, body) = app
        .get(&format!("/api/properties/{}", created.property.id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"]["name"], "Agent Smith");
    assert!(body["owner"].get("password").is_none());
}

#[tokio::test]
async fn list_is_paginated() {
    let app = TestApp::new().await;
    let (agent, _) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;
    for i in 0..3 {
        app.create_property(
            agent.id,
            sample_input(&format!("Listing number {i}"), "Springfield", 1000.0 + i as f64),
        )
        .await;
    }

    let (status, body) = app.get("/api/properties?page=2&limit=2", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["pagination"],
        json!({ "total": 3, "page": 2, "limit": 2, "pages": 2 })
    );

    let (status, _) = app.get("/api/properties?limit=51", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/properties?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn huge_page_numbers_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .get(&format!("/api/properties?page={}", u64::MAX), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["page"].is_string());

    let (status, body) = app
        .post_json(
            "/api/properties/search",
            None,
            json!({ "page": i64::MAX }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["page"].is_string());

    let (status, body) = app
        .get(&format!("/api/properties?page={MAX_PAGE}&limit={MAX_LIMIT}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"], json!([]));
}

#[tokio::test]
async fn search_filters_by_city_price_type_and_features() {
    let app = TestApp::new().await;
    let (agent, _) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut pool_house = sample_input("House with a pool", "San Diego", 500_000.0);
    pool_house.features = vec!["Pool".to_string(), "Garage".to_string()];
    app.create_property(agent.id, pool_house).await;

    let mut garage_house = sample_input("House with a garage", "San Diego", 300_000.0);
    garage_house.features = vec!["Garage".to_string()];
    app.create_property(agent.id, garage_house).await;

    let mut flat = sample_input("Downtown apartment", "Chicago", 200_000.0);
    flat.property_type = PropertyType::Apartment;
    app.create_property(agent.id, flat).await;

    let (status, body) = app
        .post_json("/api/properties/search", None, json!({ "city": "san" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = app
        .post_json(
            "/api/properties/search",
            None,
            json!({ "features": ["Pool", "Garage"] }),
        )
        .await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["properties"][0]["title"], "House with a pool");

    let (_, body) = app
        .post_json(
            "/api/properties/search",
            None,
            json!({ "minPrice": 250000, "sortBy": "price", "sortOrder": "asc" }),
        )
        .await;
    let titles: Vec<&str> = body["properties"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["House with a garage", "House with a pool"]);

    let (_, body) = app
        .post_json(
            "/api/properties/search",
            None,
            json!({ "propertyType": "APARTMENT" }),
        )
        .await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn location_search_folds_non_ascii_case() {
    let app = TestApp::new().await;
    let (agent, _) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;
    app.create_property(agent.id, sample_input("Old town flat", "ÉVORA", 90_000.0))
        .await;
    app.create_property(agent.id, sample_input("Riverside loft", "Porto", 120_000.0))
        .await;

    let (status, body) = app
        .post_json("/api/properties/search", None, json!({ "city": "évora" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["properties"][0]["city"], "ÉVORA");

    let (_, body) = app
        .post_json("/api/properties/search", None, json!({ "city": "ÉVo" }))
        .await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn search_rejects_unknown_and_negative_filters() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post_json("/api/properties/search", None, json!({ "colour": "blue" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post_json("/api/properties/search", None, json!({ "minBedrooms": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["minBedrooms"].is_string());
}

#[tokio::test]
async fn update_replaces_features_and_appends_images() {
    let app = TestApp::new().await;
    let (agent, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;
    let mut input = sample_input("Original title", "Springfield", 100_000.0);
    input.features = vec!["Garden".to_string()];
    let created = app.create_property(agent.id, input).await;

    let mut parts = valid_form_fields();
    parts.push(Part::Text("features", "Balcony"));
    parts.push(Part::Text("status", "PENDING"));
    parts.push(png("new.png"));

    let (status, body) = app
        .send(multipart_request(
            Method::PUT,
            &format!("/api/properties/{}", created.property.id),
            &token,
            &parts,
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["property"]["title"], "Sunny family home");
    assert_eq!(body["property"]["status"], "PENDING");
    assert_eq!(body["property"]["features"], json!(["Balcony"]));
    assert_eq!(body["property"]["images"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_owner_or_admin_may_modify() {
    let app = TestApp::new().await;
    let (owner, _) = app
        .create_user("Owner Agent", "owner@example.com", Role::Agent)
        .await;
    let (_, other_token) = app
        .create_user("Other Agent", "other@example.com", Role::Agent)
        .await;
    let (_, admin_token) = app
        .create_user("Site Admin", "admin@example.com", Role::Admin)
        .await;
    let created = app
        .create_property(owner.id, sample_input("Contested house", "Springfield", 1.0))
        .await;
    let uri = format!("/api/properties/{}", created.property.id);

    let (status, _) = app
        .send(multipart_request(
            Method::PUT,
            &uri,
            &other_token,
            &valid_form_fields(),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_image_rows_and_files() {
    let app = TestApp::new().await;
    let (_, token) = app
        .create_user("Agent Smith", "agent@example.com", Role::Agent)
        .await;

    let mut parts = valid_form_fields();
    parts.push(png("a.png"));
    parts.push(png("b.png"));
    let (_, body) = app
        .send(multipart_request(Method::POST, "/api/properties", &token, &parts))
        .await;
    let id: uuid::Uuid = body["property"]["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(app.stored_files(), 2);

    let (status, _) = app
        .delete(&format!("/api/properties/{id}"), Some(&token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stored_files(), 0);
    assert_eq!(
        PropertyRepository::new(app.db()).image_count(id).await.unwrap(),
        0
    );
}
