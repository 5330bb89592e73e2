mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{multipart_request, png_bytes, spawn_app, spawn_app_with, FakeModel, FormPart};
use storefront_api::ai::{InlineImage, Part};

#[tokio::test]
async fn recommendations_fall_back_to_keywords_when_the_model_fails() {
    let app = spawn_app_with(FakeModel::failing(), None).await;
    app.product(json!({ "name": "Linen Shirt", "price": 30.0, "category": "Shirts" }))
        .await;
    app.product(json!({ "name": "Wool Scarf", "price": 12.0, "category": "Accessories" }))
        .await;

    let (status, body) = app
        .post("/api/recommendations", json!({ "query": "summer shirt" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["fallback"], true);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Linen Shirt"]);
    assert!(!app.ai.calls().is_empty());
}

#[tokio::test]
async fn recommendations_follow_model_order() {
    let app = spawn_app_with(FakeModel::default(), None).await;
    let shirt = app
        .product(json!({ "name": "Linen Shirt", "price": 30.0 }))
        .await;
    let scarf = app.product(json!({ "name": "Wool Scarf", "price": 12.0 })).await;

    // Answer only once the ids are known.
    app.ai
        .answer(&format!("```json\n[\"{scarf}\", \"{shirt}\", \"missing\"]\n```"));

    let (status, body) = app
        .post("/api/recommendations", json!({ "query": "gift", "limit": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["fallback"], false);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![scarf.as_str(), shirt.as_str()]);
}

#[tokio::test]
async fn recommendations_validate_input() {
    let app = spawn_app().await;

    let (status, _) = app
        .post("/api/recommendations", json!({ "query": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/recommendations", json!({ "query": "anything" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "empty catalogue");
}

#[tokio::test]
async fn try_on_sends_person_then_garment() {
    let generated = InlineImage::new("image/png", vec![1, 2, 3]);
    let app = spawn_app_with(FakeModel::drawing(generated.clone()), None).await;
    let person = png_bytes();
    let garment = png_bytes();

    let request = multipart_request(
        Method::POST,
        "/api/virtual-try-on",
        &[
            FormPart::File {
                name: "person_image",
                file_name: "me.png",
                content_type: "image/png",
                data: &person,
            },
            FormPart::File {
                name: "product_image",
                file_name: "shirt.png",
                content_type: "image/png",
                data: &garment,
            },
        ],
    );
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["image"], generated.to_data_url());

    let calls = app.ai.calls();
    assert_eq!(calls.len(), 1);
    let parts = &calls[0].1;
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[0], Part::Image(image) if image.data == person));
    assert!(matches!(&parts[1], Part::Image(image) if image.data == garment));
    assert!(matches!(&parts[2], Part::Text(_)));
}

#[tokio::test]
async fn try_on_requires_both_images() {
    let app = spawn_app_with(FakeModel::drawing(InlineImage::new("image/png", vec![1])), None).await;
    let person = png_bytes();

    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/virtual-try-on",
            &[FormPart::File {
                name: "person_image",
                file_name: "me.png",
                content_type: "image/png",
                data: &person,
            }],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "product_image or product_image_url is required");

    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/virtual-try-on",
            &[FormPart::Text("product_image_url", "http://example.invalid/a.png")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "person_image is required");
    assert!(app.ai.calls().is_empty());
}

#[tokio::test]
async fn try_on_without_generated_image_is_a_server_error() {
    let app = spawn_app_with(FakeModel::answering("I cannot do that"), None).await;
    let photo = png_bytes();

    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/virtual-try-on",
            &[
                FormPart::File {
                    name: "person_image",
                    file_name: "me.png",
                    content_type: "image/png",
                    data: &photo,
                },
                FormPart::File {
                    name: "product_image",
                    file_name: "shirt.png",
                    content_type: "image/png",
                    data: &photo,
                },
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("I cannot do that"));
}
