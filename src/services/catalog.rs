//! Product listing engine: store-side filtering and ordering, the in-memory
//! list predicates the store cannot evaluate, pagination and ratings.

use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::entities::{
    product::{self, Entity as ProductEntity, ProductStatus},
    review::{self, Entity as ReviewEntity},
};

pub const OVERFETCH_FACTOR: u64 = 3;

/// Filters shared by every product listing. `color` and `tag` live in JSON
/// list columns and are evaluated in process.
#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub status: Option<ProductStatus>,
    pub color: Option<String>,
    pub tag: Option<String>,
}

impl ProductFilter {
    pub fn active_only(mut self) -> Self {
        self.status = Some(ProductStatus::Active);
        self
    }

    fn pushdown(&self) -> Condition {
        Condition::all()
            .add_option(
                self.category
                    .as_ref()
                    .map(|category| product::Column::Category.eq(category.clone())),
            )
            .add_option(self.min_price.map(|min| product::Column::Price.gte(min)))
            .add_option(self.max_price.map(|max| product::Column::Price.lte(max)))
            .add_option(self.status.map(|status| product::Column::Status.eq(status)))
    }

    pub fn has_list_predicate(&self) -> bool {
        self.color.is_some() || self.tag.is_some()
    }

    /// The predicates the store cannot express.
    pub fn matches_in_memory(&self, product: &product::Model) -> bool {
        let color_ok = self
            .color
            .as_deref()
            .map_or(true, |color| list_contains(&product.color, color));
        let tag_ok = self
            .tag
            .as_deref()
            .map_or(true, |tag| list_contains(&product.tags, tag));
        color_ok && tag_ok
    }
}

/// Reads a JSON field that may hold a string or a list into a list of strings.
pub fn json_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Case-insensitive membership: a list must contain `needle`, a bare string must equal it.
pub fn list_contains(value: &Value, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    json_list(value)
        .iter()
        .any(|item| item.to_lowercase() == needle)
}

/// Case-insensitive substring match over every entry, used for curated tags
/// such as "New Arrival".
pub fn list_mentions(value: &Value, fragment: &str) -> bool {
    let fragment = fragment.to_lowercase();
    json_list(value)
        .iter()
        .any(|item| item.to_lowercase().contains(&fragment))
}

/// Accepts a single string or a JSON list and returns a JSON list.
pub fn normalize_list(value: Option<Value>) -> Value {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            Value::Array(vec![Value::String(s.trim().to_string())])
        }
        Some(Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .filter(|item| !item.is_null())
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProductSort {
    PriceDesc,
    PriceAsc,
    #[default]
    Newest,
    Oldest,
    RatingDesc,
}

impl ProductSort {
    /// `price_high_low`, `price_low_high`, `newest`, `oldest`, `rating_high_low`.
    pub fn from_filter_param(value: &str) -> Self {
        match value {
            "price_high_low" => Self::PriceDesc,
            "price_low_high" => Self::PriceAsc,
            "oldest" => Self::Oldest,
            "rating_high_low" => Self::RatingDesc,
            _ => Self::Newest,
        }
    }

    /// `price-high`, `price-low`, anything else is newest first.
    pub fn from_listing_param(value: &str) -> Self {
        match value {
            "price-high" => Self::PriceDesc,
            "price-low" => Self::PriceAsc,
            _ => Self::Newest,
        }
    }

    fn apply(self, select: Select<ProductEntity>) -> Select<ProductEntity> {
        match self {
            Self::PriceDesc => select.order_by_desc(product::Column::Price),
            Self::PriceAsc => select.order_by_asc(product::Column::Price),
            Self::Oldest => select.order_by_asc(product::Column::CreatedAt),
            // Rating is only known after the page is fetched.
            Self::Newest | Self::RatingDesc => select.order_by_desc(product::Column::CreatedAt),
        }
    }
}

/// Largest page size a client can ask for.
pub const MAX_PAGE_SIZE: u64 = 100;
/// Offsets are bound as signed 64-bit integers by the store.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// 1-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: u64) -> Self {
        let page = page.filter(|p| *p >= 1).map_or(1, |p| p as u64);
        let limit = limit
            .filter(|l| *l >= 1)
            .map_or(default_limit, |l| l as u64)
            .min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit).min(MAX_OFFSET)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showing: Option<String>,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.limit);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
            showing: None,
        }
    }

    /// Adds the "01-09 of 24 Products" caption for a page holding `count` items.
    pub fn with_showing(mut self, request: PageRequest, count: u64) -> Self {
        let offset = request.offset();
        let last = offset.saturating_add(count).min(self.total);
        self.showing = Some(format!(
            "{:02}-{:02} of {} Products",
            offset.saturating_add(1),
            last,
            self.total
        ));
        self
    }
}

pub struct ProductPage {
    pub products: Vec<product::Model>,
    pub total: u64,
}

/// Runs a filtered, ordered and paginated product listing.
///
/// Without list predicates the store does all the work. With them, see
/// [`overfetch_and_filter`] for the page and [`count_matching`] for the total.
pub async fn list_products<C>(
    db: &C,
    filter: &ProductFilter,
    sort: ProductSort,
    request: PageRequest,
) -> Result<ProductPage, DbErr>
where
    C: ConnectionTrait,
{
    let base = ProductEntity::find().filter(filter.pushdown());

    if !filter.has_list_predicate() {
        let total = base.clone().count(db).await?;
        let products = sort
            .apply(base)
            .offset(request.offset())
            .limit(request.limit)
            .all(db)
            .await?;
        return Ok(ProductPage { products, total });
    }

    let products = overfetch_and_filter(db, sort.apply(base.clone()), filter, request).await?;
    let total = count_matching(db, base, filter).await?;
    Ok(ProductPage { products, total })
}

/// Fetches `limit * 3` rows from the page offset, keeps those passing the
/// in-memory predicates and truncates to `limit`.
///
/// The offset counts unfiltered rows, so a page can come back short even when
/// more matches exist further on in table order. The window is exactly
/// `limit * 3` rows, one fewer than an inclusive `offset..=offset + limit * 3`
/// range would read.
pub async fn overfetch_and_filter<C>(
    db: &C,
    select: Select<ProductEntity>,
    filter: &ProductFilter,
    request: PageRequest,
) -> Result<Vec<product::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let candidates = select
        .offset(request.offset())
        .limit(request.limit.saturating_mul(OVERFETCH_FACTOR))
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|product| filter.matches_in_memory(product))
        .take(request.limit as usize)
        .collect())
}

/// Total for a listing with list predicates: scans every row passing the
/// pushed-down filters.
pub async fn count_matching<C>(
    db: &C,
    select: Select<ProductEntity>,
    filter: &ProductFilter,
) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let rows = select.all(db).await?;
    Ok(rows
        .iter()
        .filter(|product| filter.matches_in_memory(product))
        .count() as u64)
}

/// Mean review rating, unrounded. `None` when the product has no reviews.
pub async fn average_rating<C>(db: &C, product_id: Uuid) -> Result<Option<f64>, DbErr>
where
    C: ConnectionTrait,
{
    let ratings: Vec<i32> = ReviewEntity::find()
        .select_only()
        .column(review::Column::Rating)
        .filter(review::Column::ProductId.eq(product_id))
        .into_tuple()
        .all(db)
        .await?;

    let ratings: Vec<i32> = ratings.into_iter().filter(|r| *r > 0).collect();
    if ratings.is_empty() {
        return Ok(None);
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    Ok(Some(sum as f64 / ratings.len() as f64))
}

/// Average rating rounded to `decimals`, 0.0 when there are no reviews.
pub async fn rating<C>(db: &C, product_id: Uuid, decimals: u32) -> Result<f64, DbErr>
where
    C: ConnectionTrait,
{
    Ok(average_rating(db, product_id)
        .await?
        .map_or(0.0, |avg| round_to(avg, decimals)))
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Stable descending sort by rating; only reorders what it is given.
pub fn sort_by_rating_desc<T, F>(items: &mut [T], rating: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| rating(b).total_cmp(&rating(a)));
}

/// Case-insensitive `column LIKE %needle%`, portable across SQLite and Postgres.
pub fn contains_ci<C>(column: C, needle: &str) -> SimpleExpr
where
    C: ColumnTrait,
{
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column)))
        .like(sea_orm::sea_query::LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}

/// First `n` images of a product.
pub fn first_images(product: &product::Model, n: usize) -> Vec<String> {
    product.images().into_iter().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn product(color: Value, tags: Value) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: "Tee".into(),
            description: String::new(),
            category: Some("T-shirts".into()),
            brand: None,
            price: 10.0,
            original_price: None,
            stock: 5,
            status: ProductStatus::Active,
            image_url: None,
            image_urls: json!([]),
            color,
            size: json!([]),
            tags,
            size_chart_template_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn list_predicates_accept_strings_and_arrays() {
        let filter = ProductFilter {
            color: Some("RED".into()),
            ..Default::default()
        };
        assert!(filter.matches_in_memory(&product(json!(["Blue", "red"]), json!([]))));
        assert!(filter.matches_in_memory(&product(json!("Red"), json!([]))));
        assert!(!filter.matches_in_memory(&product(json!("Dark red"), json!([]))));
        assert!(!filter.matches_in_memory(&product(json!(null), json!([]))));
    }

    #[test]
    fn tag_and_color_must_both_match() {
        let filter = ProductFilter {
            color: Some("black".into()),
            tag: Some("new arrival".into()),
            ..Default::default()
        };
        assert!(filter.matches_in_memory(&product(json!(["Black"]), json!(["New Arrival"]))));
        assert!(!filter.matches_in_memory(&product(json!(["Black"]), json!(["Best Seller"]))));
    }

    #[test]
    fn mentions_is_a_substring_match() {
        assert!(list_mentions(&json!(["Hot New Arrival!"]), "new arrival"));
        assert!(list_mentions(&json!("featured product"), "Featured Product"));
        assert!(!list_mentions(&json!([]), "new arrival"));
    }

    #[test]
    fn normalize_list_wraps_strings() {
        assert_eq!(normalize_list(Some(json!(" Red "))), json!(["Red"]));
        assert_eq!(normalize_list(Some(json!(""))), json!([]));
        assert_eq!(normalize_list(Some(json!(["Red", null]))), json!(["Red"]));
        assert_eq!(normalize_list(None), json!([]));
    }

    #[test]
    fn pagination_maths() {
        for (total, limit, page) in [(0u64, 9u64, 1u64), (3, 2, 1), (3, 2, 2), (10, 5, 2), (11, 5, 3)] {
            let request = PageRequest { page, limit };
            let pagination = Pagination::new(request, total);
            assert_eq!(pagination.total_pages, total.div_ceil(limit));
            assert_eq!(pagination.has_next, page < pagination.total_pages);
            assert_eq!(pagination.has_prev, page > 1);
        }
    }

    #[test]
    fn showing_caption_is_zero_padded() {
        let request = PageRequest { page: 2, limit: 9 };
        let pagination = Pagination::new(request, 14).with_showing(request, 5);
        assert_eq!(pagination.showing.as_deref(), Some("10-14 of 14 Products"));

        let first = PageRequest { page: 1, limit: 9 };
        let pagination = Pagination::new(first, 3).with_showing(first, 3);
        assert_eq!(pagination.showing.as_deref(), Some("01-03 of 3 Products"));
    }

    #[test]
    fn page_request_defaults_and_clamps() {
        assert_eq!(PageRequest::new(None, None, 9), PageRequest { page: 1, limit: 9 });
        assert_eq!(PageRequest::new(Some(0), Some(-3), 9), PageRequest { page: 1, limit: 9 });
        assert_eq!(PageRequest::new(Some(3), Some(4), 9).offset(), 8);
    }

    #[test]
    fn page_request_caps_limit_and_saturates_offset() {
        let huge = PageRequest::new(Some(i64::MAX), Some(i64::MAX), 9);
        assert_eq!(huge.limit, MAX_PAGE_SIZE);
        assert_eq!(huge.offset(), i64::MAX as u64);

        let pagination = Pagination::new(huge, 3).with_showing(huge, 0);
        assert_eq!(pagination.total_pages, 1);
        assert!(!pagination.has_next);
        assert!(pagination.showing.is_some());
    }

    #[test]
    fn sort_params() {
        assert_eq!(ProductSort::from_filter_param("price_low_high"), ProductSort::PriceAsc);
        assert_eq!(ProductSort::from_filter_param("bogus"), ProductSort::Newest);
        assert_eq!(ProductSort::from_listing_param("price-high"), ProductSort::PriceDesc);
        assert_eq!(ProductSort::from_listing_param("popular"), ProductSort::Newest);
    }

    #[test]
    fn rating_sort_is_stable() {
        let mut items = vec![("a", 4.0), ("b", 5.0), ("c", 4.0)];
        sort_by_rating_desc(&mut items, |item| item.1);
        assert_eq!(items.iter().map(|i| i.0).collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(4.666_666, 2), 4.67);
        assert_eq!(round_to(4.666_666, 1), 4.7);
    }
}
