mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn same_line_merges_by_incrementing_quantity() {
    let app = spawn_app().await;
    let product = app.simple_product("tee", 12.5).await;
    let line = json!({
        "session_id": "s-1",
        "product_id": product,
        "size": "M",
        "color": "Red",
        "quantity": 1,
    });

    let (status, first) = app.post("/api/cart", line.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let (status, second) = app.post("/api/cart", line).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["cart_item_id"], second["cart_item_id"]);

    // A different size is a different line.
    app.post(
        "/api/cart",
        json!({ "session_id": "s-1", "product_id": product, "size": "L", "quantity": 3 }),
    )
    .await;

    let (status, cart) = app.get("/api/cart?session_id=s-1").await;
    assert_eq!(status, StatusCode::OK);
    let items = cart["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let medium = items.iter().find(|item| item["size"] == "M").unwrap();
    assert_eq!(medium["quantity"], 2);
    assert_eq!(medium["product_name"], "tee");
    // Counts lines, not units.
    assert_eq!(cart["data"]["item_count"], 2);
    assert_eq!(cart["data"]["subtotal"], 62.5);
}

#[tokio::test]
async fn cart_rejects_unknown_products_and_bad_quantities() {
    let app = spawn_app().await;
    let (status, _) = app
        .post(
            "/api/cart",
            json!({ "session_id": "s", "product_id": uuid::Uuid::new_v4().to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let product = app.simple_product("tee", 10.0).await;
    let (status, _) = app
        .post(
            "/api/cart",
            json!({ "session_id": "s", "product_id": product, "quantity": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/cart").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cart_item_update_and_remove() {
    let app = spawn_app().await;
    let product = app.simple_product("tee", 10.0).await;
    let (_, added) = app
        .post("/api/cart", json!({ "session_id": "s", "product_id": product }))
        .await;
    let id = added["cart_item_id"].as_str().unwrap().to_string();

    let (status, body) = app.put(&format!("/api/cart/{id}"), json!({ "quantity": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quantity"], 4);

    let (status, _) = app.delete(&format!("/api/cart/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/api/cart/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_totals_and_cart_clearing() {
    let app = spawn_app().await;
    let tee = app.simple_product("tee", 20.0).await;
    let cap = app.simple_product("cap", 5.0).await;
    app.post("/api/cart", json!({ "session_id": "buy", "product_id": tee, "quantity": 2 }))
        .await;
    app.post("/api/cart", json!({ "session_id": "buy", "product_id": cap, "quantity": 1 }))
        .await;

    let (status, body) = app
        .post(
            "/api/orders",
            json!({
                "session_id": "buy",
                "customer": {
                    "full_name": "Rafi Ahmed",
                    "email": "rafi@example.com",
                    "phone_number": "01700000000",
                    "district": "Dhaka",
                    "thana": "Gulshan",
                    "full_address": "House 1, Road 2",
                },
                "discount_percentage": 10,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let summary = &body["order_summary"];
    assert_eq!(summary["subtotal"], 45.0);
    assert_eq!(summary["discount"], 4.5);
    assert_eq!(summary["delivery_fee"], 15.0);
    assert_eq!(summary["total"], 55.5);

    let (_, cart) = app.get("/api/cart?session_id=buy").await;
    assert_eq!(cart["data"]["items"], json!([]));

    let order_id = body["order_id"].as_str().unwrap();
    let (status, view) = app.get(&format!("/api/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["data"]["name"], "Rafi Ahmed");
    assert_eq!(view["data"]["status"], "pending");
    assert_eq!(view["data"]["total"], 55.5);
    assert_eq!(view["data"]["order"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .post("/api/orders", json!({ "session_id": "buy", "customer": {} }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "cart is empty now");
}

#[tokio::test]
async fn discount_codes_are_validated_and_redeemed() {
    let app = spawn_app().await;
    let (status, body) = app
        .post(
            "/api/admin/discounts",
            json!({ "code": "save10", "discount": 10, "type": "percentage" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["code"], "SAVE10");

    let (status, quote) = app
        .post("/api/discounts/validate", json!({ "code": "save10", "subtotal": 40 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{quote}");
    assert_eq!(quote["data"]["discount_amount"], 4.0);
    assert_eq!(quote["data"]["subtotal_after_discount"], 36.0);

    let tee = app.simple_product("tee", 20.0).await;
    app.post("/api/cart", json!({ "session_id": "d", "product_id": tee, "quantity": 2 }))
        .await;
    let (status, order) = app
        .post(
            "/api/orders",
            json!({ "session_id": "d", "customer": { "full_name": "A" }, "discount_code": "save10" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["order_summary"]["discount"], 4.0);
    assert_eq!(order["order_summary"]["total"], 51.0);

    let (_, stats) = app.get("/api/admin/discounts/stats").await;
    assert_eq!(stats["data"]["total_uses"], 1);

    let (status, _) = app
        .post("/api/discounts/validate", json!({ "code": "nope", "subtotal": 40 }))
        .await;
    assert_ne!(status, StatusCode::OK);
}
