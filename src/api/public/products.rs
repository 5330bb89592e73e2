use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rand::seq::SliceRandom;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::product::{self, Entity as ProductEntity, ProductStatus};
use crate::error::ApiError;
use crate::services::{
    catalog::{
        self, contains_ci, first_images, list_mentions, PageRequest, Pagination, ProductFilter,
        ProductSort,
    },
    inventory::{self, ProductInput},
    size_chart,
};
use crate::AppContext;

const DEFAULT_PAGE_SIZE: u64 = 9;
const CURATED_COUNT: usize = 4;
const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";
/// Shown for best sellers nobody has reviewed yet.
const UNREVIEWED_BEST_SELLER_RATING: f64 = 4.5;

pub fn products_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/filter", get(filter_products))
        .route("/products/search", get(search_products))
        .route("/products/new-arrivals", get(new_arrivals))
        .route("/products/featured", get(featured_products))
        .route("/products/top-selling", get(top_selling))
        .route("/products/:id", get(get_product).put(update_product))
        .route("/products/:id/related", get(related_products))
        .route("/products/:id/size-chart", get(product_size_chart))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Debug, Default, Deserialize)]
struct ListingQuery {
    category: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    color: Option<String>,
    tag: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
    sort: Option<String>,
}

impl ListingQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: non_blank(self.category.clone()),
            min_price: self.min_price,
            max_price: self.max_price,
            status: None,
            color: non_blank(self.color.clone()),
            tag: non_blank(self.tag.clone()),
        }
        .active_only()
    }

    fn filters_applied(&self) -> Value {
        json!({
            "category": self.category,
            "min_price": self.min_price,
            "max_price": self.max_price,
            "color": self.color,
            "tag": self.tag,
        })
    }
}

#[derive(Serialize)]
struct FilteredProduct {
    id: Uuid,
    name: String,
    rating: f64,
    image: Vec<String>,
    price: f64,
    color: Value,
}

impl FilteredProduct {
    fn new(value: product::Model, rating: f64) -> FilteredProduct {
        FilteredProduct {
            image: first_images(&value, 2),
            id: value.id,
            name: value.name,
            rating,
            price: value.price,
            color: value.color,
        }
    }
}

async fn filter_products(
    Query(params): Query<ListingQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let sort_param = params.sort.clone().unwrap_or_else(|| "newest".to_string());
    let sort = ProductSort::from_filter_param(&sort_param);
    let request = PageRequest::new(params.page, params.limit, DEFAULT_PAGE_SIZE);

    let page = catalog::list_products(db.as_ref(), &params.filter(), sort, request).await?;

    let mut items = Vec::with_capacity(page.products.len());
    for product in page.products {
        let rating = catalog::rating(db.as_ref(), product.id, 2).await?;
        items.push(FilteredProduct::new(product, rating));
    }
    if sort == ProductSort::RatingDesc {
        catalog::sort_by_rating_desc(&mut items, |item| item.rating);
    }

    let pagination =
        Pagination::new(request, page.total).with_showing(request, items.len() as u64);
    let mut filters_applied = params.filters_applied();
    filters_applied["sort"] = json!(sort_param);

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "count": items.len(),
            "data": items,
            "pagination": pagination,
            "filters_applied": filters_applied,
        }),
    ))
}

#[derive(Serialize)]
struct ListedProduct {
    id: Uuid,
    name: String,
    rating: f64,
    image_urls: Vec<String>,
    price: f64,
    original_price: Option<f64>,
    category: String,
    tags: Value,
}

impl ListedProduct {
    fn new(value: product::Model, rating: f64) -> ListedProduct {
        ListedProduct {
            image_urls: first_images(&value, 2),
            id: value.id,
            name: value.name,
            rating,
            price: value.price,
            original_price: value.original_price.filter(|p| *p > 0.0),
            category: value.category.unwrap_or_default(),
            tags: value.tags,
        }
    }
}

async fn list_products(
    Query(params): Query<ListingQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let sort = ProductSort::from_listing_param(params.sort.as_deref().unwrap_or("newest"));
    let request = PageRequest::new(params.page, params.limit, DEFAULT_PAGE_SIZE);

    let page = catalog::list_products(db.as_ref(), &params.filter(), sort, request).await?;

    let mut items = Vec::with_capacity(page.products.len());
    for product in page.products {
        let rating = catalog::rating(db.as_ref(), product.id, 1).await?;
        items.push(ListedProduct::new(product, rating));
    }

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "count": items.len(),
            "data": items,
            "pagination": Pagination::new(request, page.total),
            "filters_applied": params.filters_applied(),
        }),
    ))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<u64>,
}

async fn search_products(
    Query(params): Query<SearchQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let Some(q) = non_blank(params.q) else {
        return Ok(respond(StatusCode::OK, json!({ "success": true, "data": [] })));
    };

    let products = ProductEntity::find()
        .filter(product::Column::Status.eq(ProductStatus::Active))
        .filter(contains_ci(product::Column::Name, &q))
        .order_by_asc(product::Column::Name)
        .limit(params.limit.filter(|l| *l > 0).unwrap_or(10))
        .all(db.as_ref())
        .await?;

    let data: Vec<Value> = products
        .into_iter()
        .map(|product| {
            let image = product
                .primary_image()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
            json!({
                "id": product.id,
                "name": product.name,
                "price": product.price,
                "image": image,
                "category": product.category.unwrap_or_default(),
            })
        })
        .collect();

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

/// Active products whose tags mention `fragment`, in random order.
async fn curated(db: &DatabaseConnection, fragment: &str) -> Result<Vec<product::Model>, ApiError> {
    let mut products: Vec<product::Model> = ProductEntity::find()
        .filter(product::Column::Status.eq(ProductStatus::Active))
        .all(db)
        .await?
        .into_iter()
        .filter(|product| list_mentions(&product.tags, fragment))
        .collect();
    products.shuffle(&mut rand::thread_rng());
    products.truncate(CURATED_COUNT);
    Ok(products)
}

async fn new_arrivals(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let mut data = Vec::new();
    for product in curated(db.as_ref(), "new arrival").await? {
        let rating = catalog::rating(db.as_ref(), product.id, 1).await?;
        data.push(json!({
            "id": product.id,
            "name": product.name,
            "rating": rating,
            "image_urls": first_images(&product, 2),
            "price": product.price,
        }));
    }
    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "count": data.len(), "data": data }),
    ))
}

async fn featured_products(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let mut data = Vec::new();
    for product in curated(db.as_ref(), "featured product").await? {
        let rating = catalog::rating(db.as_ref(), product.id, 1).await?;
        data.push(json!({
            "id": product.id,
            "name": product.name,
            "rating": rating,
            "image": first_images(&product, 2),
            "price": product.price,
        }));
    }
    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "count": data.len(), "data": data }),
    ))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn top_selling(
    Query(params): Query<LimitQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(CURATED_COUNT);

    let active = ProductEntity::find()
        .filter(product::Column::Status.eq(ProductStatus::Active))
        .all(db.as_ref())
        .await?;
    let (mut picked, mut others): (Vec<_>, Vec<_>) = active
        .into_iter()
        .partition(|product| list_mentions(&product.tags, "best seller"));

    // ThreadRng is !Send; drop it before the first await.
    {
        let mut rng = rand::thread_rng();
        if picked.len() < limit {
            others.shuffle(&mut rng);
            picked.extend(others.into_iter().take(limit - picked.len()));
        }
        picked.shuffle(&mut rng);
        picked.truncate(limit);
    }

    let mut data = Vec::with_capacity(picked.len());
    for product in picked {
        let rating = catalog::average_rating(db.as_ref(), product.id)
            .await?
            .map_or(UNREVIEWED_BEST_SELLER_RATING, |avg| catalog::round_to(avg, 1));
        let image = product
            .primary_image()
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
        data.push(json!({
            "id": product.id,
            "name": product.name,
            "rating": rating,
            "image_urls": [image],
            "price": product.price,
        }));
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "count": data.len(), "data": data }),
    ))
}

async fn get_product(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let product = ProductEntity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let sizes = inventory::sizes_for(db.as_ref(), id).await?;

    let mut data = serde_json::to_value(&product).map_err(|e| ApiError::Internal(e.to_string()))?;
    data["sizes"] = json!(sizes);

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ProductInput>,
) -> ApiResult {
    let product = inventory::create_product(db.as_ref(), payload).await?;
    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "message": "Product created successfully",
            "data": product,
        }),
    ))
}

async fn update_product(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ProductInput>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let product = inventory::update_product(db.as_ref(), id, payload).await?;
    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "message": "Product updated successfully",
            "data": product,
        }),
    ))
}

async fn related_products(
    Path(id): Path<String>,
    Query(params): Query<LimitQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(CURATED_COUNT) as u64;

    let current = ProductEntity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let mut query = ProductEntity::find()
        .filter(product::Column::Id.ne(id))
        .filter(product::Column::Status.eq(ProductStatus::Active));
    if let Some(category) = current.category.filter(|c| !c.is_empty()) {
        query = query.filter(product::Column::Category.eq(category));
    }
    let related = query
        .order_by_desc(product::Column::CreatedAt)
        .limit(limit)
        .all(db.as_ref())
        .await?;

    let mut data = Vec::with_capacity(related.len());
    for product in related {
        let rating = catalog::rating(db.as_ref(), product.id, 1).await?;
        data.push(json!({
            "id": product.id,
            "name": product.name,
            "price": product.price,
            "rating": rating,
            "image": first_images(&product, 2),
        }));
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "count": data.len(), "data": data }),
    ))
}

async fn product_size_chart(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Product not found")?;
    let product = ProductEntity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let template_id = product
        .size_chart_template_id
        .ok_or_else(|| ApiError::not_found("No size chart for this product"))?;

    let chart = size_chart::load_chart(db.as_ref(), template_id).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": chart })))
}
