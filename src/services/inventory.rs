//! Product writes shared by the storefront and admin routes, plus per-size stock.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    product::{self, Entity as ProductEntity, ProductStatus},
    product_size::{self, Entity as ProductSizeEntity},
    size_chart_template::Entity as SizeChartTemplateEntity,
};
use crate::error::ApiError;
use crate::services::catalog::normalize_list;

/// Stock below this (and above zero) counts as low.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of product create and update requests. Every field is optional so
/// the same shape serves partial updates.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub brand: Option<Option<String>>,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub original_price: Option<Option<f64>>,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: Option<i32>,
    pub status: Option<ProductStatus>,
    pub image_url: Option<String>,
    pub image_urls: Option<Value>,
    pub color: Option<Value>,
    pub size: Option<Value>,
    pub tags: Option<Value>,
    #[serde(default, deserialize_with = "double_option")]
    pub size_chart_template_id: Option<Option<i32>>,
}

impl ProductInput {
    /// Image list from `image_urls`, or the single `image_url` when no list was sent.
    fn images(&self) -> Option<Vec<String>> {
        match (&self.image_urls, &self.image_url) {
            (Some(Value::Array(urls)), _) => Some(
                urls.iter()
                    .filter_map(|url| url.as_str())
                    .filter(|url| !url.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
            (Some(_), _) => Some(Vec::new()),
            (None, Some(url)) if !url.is_empty() => Some(vec![url.clone()]),
            (None, _) => None,
        }
    }
}

fn set_images(model: &mut product::ActiveModel, images: Vec<String>) {
    model.image_url = Set(images.first().cloned());
    model.image_urls = Set(Value::from(images));
}

async fn check_template<C>(db: &C, template_id: Option<i32>) -> Result<(), ApiError>
where
    C: ConnectionTrait,
{
    if let Some(id) = template_id {
        if SizeChartTemplateEntity::find_by_id(id).one(db).await?.is_none() {
            return Err(ApiError::validation("Size chart template not found"));
        }
    }
    Ok(())
}

pub async fn create_product(
    db: &DatabaseConnection,
    input: ProductInput,
) -> Result<product::Model, ApiError> {
    input.validate()?;

    let name = input.name.clone().filter(|name| !name.trim().is_empty());
    let (Some(name), Some(price)) = (name, input.price.filter(|p| *p > 0.0)) else {
        return Err(ApiError::validation("name and price are required"));
    };

    let template_id = input.size_chart_template_id.flatten();
    check_template(db, template_id).await?;

    let now = Utc::now();
    let mut model = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(input.description.clone().unwrap_or_default()),
        category: Set(input.category.clone().flatten()),
        brand: Set(input.brand.clone().flatten()),
        price: Set(price),
        original_price: Set(input.original_price.flatten().filter(|p| *p > 0.0)),
        stock: Set(input.stock.unwrap_or(0)),
        status: Set(input.status.unwrap_or(ProductStatus::Active)),
        color: Set(normalize_list(input.color.clone())),
        size: Set(normalize_list(input.size.clone())),
        tags: Set(normalize_list(input.tags.clone())),
        size_chart_template_id: Set(template_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    set_images(&mut model, input.images().unwrap_or_default());

    Ok(model.insert(db).await?)
}

/// Applies the fields present in `input`. Fails with 404 for unknown ids.
pub async fn update_product(
    db: &DatabaseConnection,
    id: Uuid,
    input: ProductInput,
) -> Result<product::Model, ApiError> {
    input.validate()?;

    let existing = ProductEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let mut model = existing.into_active_model();

    if let Some(name) = input.name.clone() {
        if name.trim().is_empty() {
            return Err(ApiError::validation("name must not be empty"));
        }
        model.name = Set(name);
    }
    if let Some(description) = input.description.clone() {
        model.description = Set(description);
    }
    if let Some(category) = input.category.clone() {
        model.category = Set(category);
    }
    if let Some(brand) = input.brand.clone() {
        model.brand = Set(brand);
    }
    if let Some(price) = input.price {
        model.price = Set(price);
    }
    if let Some(original_price) = input.original_price {
        model.original_price = Set(original_price.filter(|p| *p > 0.0));
    }
    if let Some(stock) = input.stock {
        model.stock = Set(stock);
    }
    if let Some(status) = input.status {
        model.status = Set(status);
    }
    if let Some(images) = input.images() {
        set_images(&mut model, images);
    }
    if input.color.is_some() {
        model.color = Set(normalize_list(input.color.clone()));
    }
    if input.size.is_some() {
        model.size = Set(normalize_list(input.size.clone()));
    }
    if input.tags.is_some() {
        model.tags = Set(normalize_list(input.tags.clone()));
    }
    if let Some(template_id) = input.size_chart_template_id {
        check_template(db, template_id).await?;
        model.size_chart_template_id = Set(template_id);
    }
    model.updated_at = Set(Utc::now());

    Ok(model.update(db).await?)
}

/// `out_of_stock`, `low_stock` or `active`, as shown on admin listings.
pub fn stock_status(stock: i32) -> &'static str {
    if stock <= 0 {
        "out_of_stock"
    } else if stock < LOW_STOCK_THRESHOLD {
        "low_stock"
    } else {
        "active"
    }
}

pub async fn sizes_for<C>(db: &C, product_id: Uuid) -> Result<Vec<product_size::Model>, ApiError>
where
    C: ConnectionTrait,
{
    Ok(ProductSizeEntity::find()
        .filter(product_size::Column::ProductId.eq(product_id))
        .order_by_asc(product_size::Column::SortOrder)
        .order_by_asc(product_size::Column::Id)
        .all(db)
        .await?)
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct SizeStockInput {
    #[validate(length(min = 1, message = "size_label is required"))]
    pub size_label: String,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: i32,
    pub sort_order: Option<i32>,
}

/// Upserts per-size stock rows by label, drops labels not listed, and sets the
/// product's total stock to the sum. Runs in one transaction.
pub async fn replace_sizes(
    db: &DatabaseConnection,
    product_id: Uuid,
    sizes: Vec<SizeStockInput>,
) -> Result<(product::Model, Vec<product_size::Model>), ApiError> {
    for size in &sizes {
        size.validate()?;
    }

    let txn = db.begin().await?;

    let product = ProductEntity::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let existing = sizes_for(&txn, product_id).await?;
    let labels: Vec<&str> = sizes.iter().map(|s| s.size_label.trim()).collect();

    let stale: Vec<i32> = existing
        .iter()
        .filter(|row| !labels.contains(&row.size_label.as_str()))
        .map(|row| row.id)
        .collect();
    if !stale.is_empty() {
        ProductSizeEntity::delete_many()
            .filter(product_size::Column::Id.is_in(stale))
            .exec(&txn)
            .await?;
    }

    for (index, size) in sizes.iter().enumerate() {
        let label = size.size_label.trim().to_string();
        let sort_order = size.sort_order.unwrap_or(index as i32);
        match existing.iter().find(|row| row.size_label == label) {
            Some(row) => {
                let mut row = row.clone().into_active_model();
                row.stock = Set(size.stock);
                row.sort_order = Set(sort_order);
                row.update(&txn).await?;
            }
            None => {
                product_size::ActiveModel {
                    product_id: Set(product_id),
                    size_label: Set(label),
                    stock: Set(size.stock),
                    sort_order: Set(sort_order),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    let total: i32 = sizes.iter().map(|s| s.stock).sum();
    let mut product = product.into_active_model();
    product.stock = Set(total);
    product.updated_at = Set(Utc::now());
    let product = product.update(&txn).await?;

    let rows = sizes_for(&txn, product_id).await?;
    txn.commit().await?;

    Ok((product, rows))
}
