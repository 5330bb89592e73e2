mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{json_request, multipart_request, png_bytes, spawn_app, spawn_app_with, FakeModel, FormPart};

#[tokio::test]
async fn admin_key_guards_admin_routes_only() {
    let app = spawn_app_with(FakeModel::failing(), Some("s3cret")).await;

    let (status, body) = app.get("/api/admin/dashboard/stats").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let wrong = Request::builder()
        .uri("/api/admin/dashboard/stats")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .uri("/api/admin/dashboard/stats")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(right).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn product_management_reports_stock_status() {
    let app = spawn_app().await;
    app.product(json!({ "name": "gone", "price": 10.0, "stock": 0 })).await;
    app.product(json!({ "name": "few", "price": 10.0, "stock": 3 })).await;
    let plenty = app.product(json!({ "name": "plenty", "price": 10.0, "stock": 50 })).await;

    let (status, body) = app.get("/api/admin/products?status=low_stock").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "few");
    assert_eq!(body["data"][0]["status"], "low_stock");

    let (_, body) = app.get("/api/admin/products?status=out_of_stock").await;
    assert_eq!(body["data"][0]["name"], "gone");

    let (status, body) = app.put(&format!("/api/admin/products/{plenty}"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No fields to update");

    let (status, _) = app
        .put(&format!("/api/admin/products/{plenty}"), json!({ "price": 12.5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/admin/products/{plenty}")).await;
    assert_eq!(body["data"]["price"], 12.5);
    assert_eq!(body["data"]["rating"], 0.0);
    assert_eq!(body["data"]["total_sold"], 0);

    let (_, body) = app.get("/api/admin/dashboard/low-stock").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["gone", "few"]);

    let (status, _) = app.delete(&format!("/api/admin/products/{plenty}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/api/admin/products/{plenty}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_status_updates_are_validated() {
    let app = spawn_app().await;
    let tee = app.simple_product("tee", 20.0).await;
    app.post("/api/cart", json!({ "session_id": "s", "product_id": tee }))
        .await;
    let (_, placed) = app
        .post(
            "/api/orders",
            json!({ "session_id": "s", "customer": { "full_name": "Nadia", "email": "nadia@example.com" } }),
        )
        .await;
    let order_id = placed["order_id"].as_str().unwrap().to_string();

    let (status, body) = app
        .put(
            &format!("/api/admin/orders/{order_id}/status"),
            json!({ "status": "teleported" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid status"));

    let (status, body) = app
        .put(
            &format!("/api/admin/orders/{order_id}/status"),
            json!({ "status": "shipped" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, stats) = app.get("/api/admin/orders/stats").await;
    assert_eq!(stats["success"], true);

    let (_, list) = app.get("/api/admin/orders?search=nadia").await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["data"][0]["status"], "shipped");
    let (_, list) = app.get("/api/admin/orders?search=nobody").await;
    assert_eq!(list["data"], json!([]));

    let (_, dashboard) = app.get("/api/admin/dashboard/stats").await;
    assert_eq!(dashboard["data"]["total_orders"], 1);
    assert_eq!(dashboard["data"]["total_revenue"], 35.0);

    let (_, customers) = app.get("/api/admin/customers?search=Nadia").await;
    assert_eq!(customers["data"][0]["orders_count"], 1);
    assert_eq!(customers["data"][0]["total_spent"], 35.0);
}

#[tokio::test]
async fn size_stock_sets_product_total() {
    let app = spawn_app().await;
    let tee = app.simple_product("tee", 20.0).await;

    let (status, body) = app
        .put(
            &format!("/api/admin/stock/{tee}/sizes"),
            json!({ "sizes": [
                { "size_label": "S", "stock": 2 },
                { "size_label": "M", "stock": 5 },
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total_stock"], 7);

    let (_, body) = app
        .put(
            &format!("/api/admin/stock/{tee}/sizes"),
            json!({ "sizes": [{ "size_label": "M", "stock": 1 }] }),
        )
        .await;
    assert_eq!(body["data"]["total_stock"], 1);
    assert_eq!(body["data"]["sizes"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .put(&format!("/api/admin/stock/{tee}"), json!({ "stock": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Valid stock value is required");
}

#[tokio::test]
async fn size_chart_grid_round_trip() {
    let app = spawn_app().await;

    let (status, body) = app
        .post("/api/admin/size-charts", json!({ "name": "Tees", "description": "Unisex" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let chart = body["data"]["id"].as_i64().unwrap();

    let (_, row) = app
        .post(
            &format!("/api/admin/size-charts/{chart}/rows"),
            json!({ "size_label": "M", "sort_order": 0 }),
        )
        .await;
    let (status, column) = app
        .post(
            &format!("/api/admin/size-charts/{chart}/columns"),
            json!({ "column_key": "Chest Width", "display_name": "Chest" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{column}");
    assert_eq!(column["data"]["column_key"], "chest_width");
    assert_eq!(column["data"]["unit"], "cm");

    let row_id = row["data"]["id"].as_i64().unwrap();
    let column_id = column["data"]["id"].as_i64().unwrap();
    let (status, body) = app
        .put(
            &format!("/api/admin/size-charts/{chart}/values"),
            json!({ "values": [{ "row_id": row_id, "column_id": column_id, "value": "40" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app.get(&format!("/api/admin/size-charts/{chart}")).await;
    assert_eq!(body["data"]["values_grid"], json!({ "M": { "chest_width": "40" } }));

    let tee = app
        .product(json!({ "name": "tee", "price": 20.0, "size_chart_template_id": chart }))
        .await;
    let (status, body) = app.get(&format!("/api/products/{tee}/size-chart")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Tees");

    // Blank value removes the cell.
    app.put(
        &format!("/api/admin/size-charts/{chart}/values"),
        json!({ "values": [{ "row_id": row_id, "column_id": column_id, "value": " " }] }),
    )
    .await;
    let (_, body) = app.get(&format!("/api/admin/size-charts/{chart}")).await;
    assert_eq!(body["data"]["values_grid"], json!({}));

    let (status, _) = app
        .delete(&format!("/api/admin/size-charts/{chart}/rows/{}", row_id + 100))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/api/admin/size-charts/{chart}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/admin/size-charts/{chart}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_stored_served_and_deleted() {
    let app = spawn_app().await;
    let png = png_bytes();

    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/api/admin/upload/images",
            &[
                FormPart::File {
                    name: "files",
                    file_name: "Red Tee.png",
                    content_type: "image/png",
                    data: &png,
                },
                FormPart::File {
                    name: "files",
                    file_name: "notes.txt",
                    content_type: "text/plain",
                    data: b"hello",
                },
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["uploaded"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let uploaded = &body["uploaded"][0];
    assert_eq!(uploaded["original_name"], "Red Tee.png");
    let path = uploaded["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("products/") && path.ends_with("-red_tee.png"));
    let url = uploaded["url"].as_str().unwrap();
    let served = url.trim_start_matches("http://localhost:3000");

    let (status, _) = app.get(served).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(json_request(
            Method::DELETE,
            "/api/admin/upload/images",
            Some(json!({ "path": path })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(served).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
