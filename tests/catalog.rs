mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn filter_sorts_and_paginates_within_category() {
    let app = spawn_app().await;
    app.simple_product("ten", 10.0).await;
    app.simple_product("thirty", 30.0).await;
    app.simple_product("twenty", 20.0).await;
    app.product(json!({ "name": "mug", "price": 5.0, "category": "Mugs" }))
        .await;

    let (status, body) = app
        .get("/api/products/filter?category=T-shirts&sort=price_low_high&page=1&limit=2")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let prices: Vec<f64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["price"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![10.0, 20.0]);
    assert_eq!(body["count"], 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["pagination"]["has_next"], true);
    assert_eq!(body["pagination"]["showing"], "01-02 of 3 Products");
    assert_eq!(body["filters_applied"]["sort"], "price_low_high");
}

#[tokio::test]
async fn colour_filter_accepts_string_or_list() {
    let app = spawn_app().await;
    app.product(json!({ "name": "red tee", "price": 12.0, "color": "Red" }))
        .await;
    app.product(json!({ "name": "blue tee", "price": 14.0, "color": ["Blue", "Navy"] }))
        .await;

    let (status, body) = app.get("/api/products/filter?color=Navy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "blue tee");
}

#[tokio::test]
async fn unreviewed_products_rate_zero_and_reviews_update_rating() {
    let app = spawn_app().await;
    let id = app.simple_product("plain", 15.0).await;

    let (_, body) = app.get("/api/products/filter").await;
    assert_eq!(body["data"][0]["rating"], 0.0);

    for rating in [5, 4, 4] {
        let (status, body) = app
            .post(
                &format!("/api/products/{id}/reviews"),
                json!({ "user_name": "sam", "rating": rating, "comment": "ok" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (_, body) = app.get("/api/products/filter").await;
    assert_eq!(body["data"][0]["rating"], 4.33);
    let (_, body) = app.get("/api/products").await;
    assert_eq!(body["data"][0]["rating"], 4.3);
}

#[tokio::test]
async fn reviews_are_validated() {
    let app = spawn_app().await;
    let id = app.simple_product("plain", 15.0).await;

    let (status, body) = app
        .post(
            &format!("/api/products/{id}/reviews"),
            json!({ "user_name": "sam", "rating": 6 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post(
            &format!("/api/products/{}/reviews", uuid::Uuid::new_v4()),
            json!({ "user_name": "sam", "rating": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_is_case_insensitive_and_blank_is_empty() {
    let app = spawn_app().await;
    app.simple_product("Summer Tee", 15.0).await;
    app.simple_product("Winter Coat", 80.0).await;

    let (_, body) = app.get("/api/products/search?q=TEE").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Summer Tee"]);

    let (status, body) = app.get("/api/products/search?q=%20%20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn product_images_mirror_first_url() {
    let app = spawn_app().await;
    let id = app
        .product(json!({
            "name": "duo",
            "price": 9.5,
            "image_urls": ["/a.png", "/b.png"],
        }))
        .await;

    let (status, body) = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["image_url"], "/a.png");
    assert_eq!(body["data"]["image_urls"], json!(["/a.png", "/b.png"]));

    let (status, _) = app.get("/api/products/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_create_requires_name_and_price() {
    let app = spawn_app().await;
    let (status, body) = app.post("/api/products", json!({ "name": "nameless price" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "name and price are required");
}

#[tokio::test]
async fn health_check() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "status": "ok" }));
}

fn names(body: &serde_json::Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn tag_filter_matches_whole_tags_case_insensitively() {
    let app = spawn_app().await;
    app.product(json!({ "name": "tagged", "price": 10.0, "tags": ["Sale", "Cotton"] }))
        .await;
    app.product(json!({ "name": "single", "price": 11.0, "tags": "sale" }))
        .await;
    app.product(json!({ "name": "untagged", "price": 12.0 })).await;

    let (status, body) = app
        .get("/api/products/filter?tag=SALE&sort=price_low_high")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["tagged", "single"]);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["filters_applied"]["tag"], "SALE");

    let (_, body) = app.get("/api/products/filter?tag=Sal").await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn list_predicate_pages_report_full_totals() {
    let app = spawn_app().await;
    for price in 1..=5 {
        app.product(json!({ "name": format!("sale-{price}"), "price": price as f64, "tags": ["sale"] }))
            .await;
    }
    app.product(json!({ "name": "full price", "price": 100.0 })).await;

    let (status, body) = app
        .get("/api/products/filter?tag=sale&sort=price_low_high&page=2&limit=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["sale-3", "sale-4"]);
    let pagination = &body["pagination"];
    assert_eq!(pagination["total"], 5);
    assert_eq!(pagination["total_pages"], 3);
    assert_eq!(pagination["has_next"], true);
    assert_eq!(pagination["has_prev"], true);
    assert_eq!(pagination["showing"], "03-04 of 5 Products");
}

#[tokio::test]
async fn overfetch_window_can_return_a_short_page() {
    let app = spawn_app().await;
    for price in 1..=3 {
        app.product(json!({ "name": format!("plain-{price}"), "price": price as f64 }))
            .await;
    }
    app.product(json!({ "name": "on sale", "price": 10.0, "tags": ["sale"] }))
        .await;

    // With limit 1 only the three cheapest rows are scanned, none of them tagged.
    let (status, body) = app
        .get("/api/products/filter?tag=sale&sort=price_low_high&limit=1")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["count"], 0);
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = app
        .get("/api/products/filter?tag=sale&sort=price_low_high&limit=2")
        .await;
    assert_eq!(names(&body), vec!["on sale"]);
}

#[tokio::test]
async fn rating_sort_reorders_the_fetched_page_only() {
    let app = spawn_app().await;
    let fair = app.simple_product("fair", 10.0).await;
    let great = app.simple_product("great", 20.0).await;
    for (id, rating) in [(&fair, 3), (&great, 5)] {
        app.post(
            &format!("/api/products/{id}/reviews"),
            json!({ "user_name": "sam", "rating": rating }),
        )
        .await;
    }
    app.simple_product("fresh", 30.0).await;

    let (_, body) = app.get("/api/products/filter?sort=rating_high_low").await;
    assert_eq!(names(&body), vec!["great", "fair", "fresh"]);

    // Page one is the newest product, whatever its rating.
    let (_, body) = app
        .get("/api/products/filter?sort=rating_high_low&limit=1")
        .await;
    assert_eq!(names(&body), vec!["fresh"]);
}

#[tokio::test]
async fn oversized_paging_is_capped_not_fatal() {
    let app = spawn_app().await;
    app.simple_product("tee", 10.0).await;

    let (status, body) = app
        .get("/api/products/filter?page=9223372036854775807&limit=9")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total"], 1);

    let (status, body) = app
        .get("/api/products/filter?color=red&limit=9223372036854775807")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["limit"], 100);

    let (status, _) = app.get("/api/orders?page=9223372036854775807").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn new_arrivals_and_featured_follow_tags() {
    let app = spawn_app().await;
    for n in 0..5 {
        app.product(json!({ "name": format!("arrival-{n}"), "price": 10.0, "tags": ["Hot New Arrivals"] }))
            .await;
    }
    app.product(json!({
        "name": "star",
        "price": 40.0,
        "tags": "featured product",
        "image_urls": ["/a.png", "/b.png", "/c.png"],
    }))
    .await;
    app.product(json!({
        "name": "hidden",
        "price": 40.0,
        "tags": ["Featured Product"],
        "status": "inactive",
    }))
    .await;

    let (status, body) = app.get("/api/products/new-arrivals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert!(names(&body).iter().all(|name| name.starts_with("arrival-")));

    let (_, body) = app.get("/api/products/featured").await;
    assert_eq!(names(&body), vec!["star"]);
    assert_eq!(body["data"][0]["image"], json!(["/a.png", "/b.png"]));
    assert_eq!(body["data"][0]["rating"], 0.0);
}

#[tokio::test]
async fn top_selling_defaults_unreviewed_rating_and_tops_up() {
    let app = spawn_app().await;
    app.product(json!({ "name": "best", "price": 25.0, "tags": ["Best Seller"], "image_urls": ["/best.png", "/2.png"] }))
        .await;
    app.simple_product("other-a", 10.0).await;
    app.simple_product("other-b", 12.0).await;

    let (status, body) = app.get("/api/products/top-selling?limit=1").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(names(&body), vec!["best"]);
    assert_eq!(body["data"][0]["rating"], 4.5);
    assert_eq!(body["data"][0]["image_urls"], json!(["/best.png"]));

    let (_, body) = app.get("/api/products/top-selling?limit=3").await;
    assert_eq!(body["count"], 3);
    assert!(names(&body).contains(&"best".to_string()));
}

#[tokio::test]
async fn related_products_share_the_category() {
    let app = spawn_app().await;
    let tee = app.simple_product("tee", 10.0).await;
    app.simple_product("polo", 15.0).await;
    app.product(json!({ "name": "mug", "price": 5.0, "category": "Mugs" }))
        .await;

    let (status, body) = app.get(&format!("/api/products/{tee}/related")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["polo"]);
    assert_eq!(body["data"][0]["rating"], 0.0);

    let (status, _) = app
        .get(&format!("/api/products/{}/related", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
