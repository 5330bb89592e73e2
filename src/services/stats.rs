//! Aggregates for the admin dashboard, analytics and stock pages. Everything
//! is recomputed from the rows on each call.

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::entities::{
    customer::{self, Entity as CustomerEntity},
    order::{self, Entity as OrderEntity, Status},
    order_item::{self, Entity as OrderItemEntity},
    product::{self, Entity as ProductEntity},
};
use crate::services::catalog::round_to;
use crate::services::inventory::LOW_STOCK_THRESHOLD;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const SALES_MONTHS: usize = 7;
pub const ANALYTICS_MONTHS: usize = 6;

/// Calendar month as (year, month) so buckets sort chronologically.
pub type MonthKey = (i32, u32);

pub fn month_key(at: DateTime<Utc>) -> MonthKey {
    (at.year(), at.month())
}

pub fn month_label(key: MonthKey) -> &'static str {
    MONTH_NAMES[(key.1 as usize).saturating_sub(1) % 12]
}

/// Sums `points` per month and keeps the latest `keep` months that have data.
pub fn monthly_totals<I>(points: I, keep: usize) -> Vec<(MonthKey, f64)>
where
    I: IntoIterator<Item = (DateTime<Utc>, f64)>,
{
    let mut buckets: BTreeMap<MonthKey, f64> = BTreeMap::new();
    for (at, amount) in points {
        *buckets.entry(month_key(at)).or_default() += amount;
    }
    let skip = buckets.len().saturating_sub(keep);
    buckets.into_iter().skip(skip).collect()
}

/// Percentage change between the last two points, 0 when undefined.
pub fn growth(data: &[f64]) -> f64 {
    match data {
        [.., previous, last] if *previous > 0.0 => round_to((last - previous) / previous * 100.0, 1),
        _ => 0.0,
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SeriesReport {
    pub labels: Vec<&'static str>,
    pub data: Vec<f64>,
    pub total: f64,
    pub growth: f64,
}

impl SeriesReport {
    pub fn new(buckets: Vec<(MonthKey, f64)>, decimals: u32) -> Self {
        let labels = buckets.iter().map(|(key, _)| month_label(*key)).collect();
        let data: Vec<f64> = buckets.iter().map(|(_, v)| round_to(*v, decimals)).collect();
        let total = round_to(data.iter().sum(), decimals);
        let growth = growth(&data);
        Self {
            labels,
            data,
            total,
            growth,
        }
    }
}

struct OrderRow {
    status: Status,
    total: f64,
    created_at: DateTime<Utc>,
}

async fn order_rows<C>(db: &C) -> Result<Vec<OrderRow>, DbErr>
where
    C: ConnectionTrait,
{
    let rows: Vec<(Status, f64, DateTime<Utc>)> = OrderEntity::find()
        .select_only()
        .column(order::Column::Status)
        .column(order::Column::Total)
        .column(order::Column::CreatedAt)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(status, total, created_at)| OrderRow {
            status,
            total,
            created_at,
        })
        .collect())
}

async fn customer_dates<C>(db: &C) -> Result<Vec<DateTime<Utc>>, DbErr>
where
    C: ConnectionTrait,
{
    CustomerEntity::find()
        .select_only()
        .column(customer::Column::CreatedAt)
        .into_tuple()
        .all(db)
        .await
}

fn revenue(orders: &[OrderRow]) -> f64 {
    orders
        .iter()
        .filter(|order| !order.status.is_lost_sale())
        .map(|order| order.total)
        .sum()
}

fn created_this_month(dates: &[DateTime<Utc>], now: DateTime<Utc>) -> usize {
    let current = month_key(now);
    dates.iter().filter(|at| month_key(**at) == current).count()
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub new_customers: usize,
    pub total_products: usize,
    pub low_stock_count: usize,
    pub pending_orders: usize,
    pub completed_orders: usize,
    pub failed_orders: usize,
    pub returned_orders: usize,
    pub total_customers: usize,
}

pub async fn dashboard_stats<C>(db: &C) -> Result<DashboardStats, DbErr>
where
    C: ConnectionTrait,
{
    let orders = order_rows(db).await?;
    let customers = customer_dates(db).await?;
    let stock: Vec<i32> = ProductEntity::find()
        .select_only()
        .column(product::Column::Stock)
        .into_tuple()
        .all(db)
        .await?;

    let count = |pred: fn(&Status) -> bool| orders.iter().filter(|o| pred(&o.status)).count();

    Ok(DashboardStats {
        total_revenue: round_to(revenue(&orders), 2),
        total_orders: orders.len(),
        new_customers: created_this_month(&customers, Utc::now()),
        total_products: stock.len(),
        low_stock_count: stock
            .iter()
            .filter(|s| **s > 0 && **s < LOW_STOCK_THRESHOLD)
            .count(),
        pending_orders: count(|s| *s == Status::Pending),
        completed_orders: count(Status::is_fulfilled),
        failed_orders: count(|s| *s == Status::Failed),
        returned_orders: count(|s| *s == Status::Returned),
        total_customers: customers.len(),
    })
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MonthlySales {
    pub name: &'static str,
    pub revenue: f64,
}

/// Revenue per month for the last seven months with sales.
pub async fn monthly_sales<C>(db: &C) -> Result<Vec<MonthlySales>, DbErr>
where
    C: ConnectionTrait,
{
    let orders = order_rows(db).await?;
    let points = orders
        .iter()
        .filter(|order| !order.status.is_lost_sale())
        .map(|order| (order.created_at, order.total));
    Ok(monthly_totals(points, SALES_MONTHS)
        .into_iter()
        .map(|(key, revenue)| MonthlySales {
            name: month_label(key),
            revenue: round_to(revenue, 2),
        })
        .collect())
}

pub async fn revenue_report<C>(db: &C) -> Result<SeriesReport, DbErr>
where
    C: ConnectionTrait,
{
    let orders = order_rows(db).await?;
    let points = orders
        .iter()
        .filter(|order| !order.status.is_lost_sale())
        .map(|order| (order.created_at, order.total));
    Ok(SeriesReport::new(monthly_totals(points, ANALYTICS_MONTHS), 2))
}

pub async fn order_volume_report<C>(db: &C) -> Result<SeriesReport, DbErr>
where
    C: ConnectionTrait,
{
    let orders = order_rows(db).await?;
    let points = orders.iter().map(|order| (order.created_at, 1.0));
    Ok(SeriesReport::new(monthly_totals(points, ANALYTICS_MONTHS), 0))
}

#[derive(Debug, Serialize)]
pub struct BestSeller {
    pub id: Uuid,
    pub name: String,
    pub sales: i64,
    pub stock: i32,
}

/// Products ranked by total quantity ordered. Lines whose product is gone
/// are skipped.
pub async fn best_sellers<C>(db: &C, limit: usize) -> Result<Vec<BestSeller>, DbErr>
where
    C: ConnectionTrait,
{
    let lines: Vec<(Uuid, i32)> = OrderItemEntity::find()
        .select_only()
        .column(order_item::Column::ProductId)
        .column(order_item::Column::Quantity)
        .into_tuple()
        .all(db)
        .await?;

    let mut sold: HashMap<Uuid, i64> = HashMap::new();
    for (product_id, quantity) in lines {
        *sold.entry(product_id).or_default() += i64::from(quantity);
    }
    let mut ranked: Vec<(Uuid, i64)> = sold.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut best = Vec::with_capacity(limit);
    for (product_id, sales) in ranked {
        if best.len() >= limit {
            break;
        }
        if let Some(product) = ProductEntity::find_by_id(product_id).one(db).await? {
            best.push(BestSeller {
                id: product.id,
                name: product.name,
                sales,
                stock: product.stock,
            });
        }
    }
    Ok(best)
}

/// Units sold across all orders for one product.
pub async fn total_sold<C>(db: &C, product_id: Uuid) -> Result<i64, DbErr>
where
    C: ConnectionTrait,
{
    let quantities: Vec<i32> = OrderItemEntity::find()
        .select_only()
        .column(order_item::Column::Quantity)
        .filter(order_item::Column::ProductId.eq(product_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(quantities.into_iter().map(i64::from).sum())
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct OrderStatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub returned: usize,
}

impl OrderStatusCounts {
    /// Delivered orders count as completed; shipped and cancelled are not shown.
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                Status::Pending => counts.pending += 1,
                Status::Processing => counts.processing += 1,
                Status::Completed | Status::Delivered => counts.completed += 1,
                Status::Failed => counts.failed += 1,
                Status::Returned => counts.returned += 1,
                Status::Shipped | Status::Cancelled => {}
            }
        }
        counts
    }
}

pub async fn order_status_counts<C>(db: &C) -> Result<OrderStatusCounts, DbErr>
where
    C: ConnectionTrait,
{
    let statuses: Vec<Status> = OrderEntity::find()
        .select_only()
        .column(order::Column::Status)
        .into_tuple()
        .all(db)
        .await?;
    Ok(OrderStatusCounts::tally(statuses))
}

#[derive(Debug, Serialize)]
pub struct CustomerStats {
    pub total: usize,
    pub active: usize,
    pub new_this_month: usize,
    pub total_revenue: f64,
}

pub async fn customer_stats<C>(db: &C) -> Result<CustomerStats, DbErr>
where
    C: ConnectionTrait,
{
    let customers = customer_dates(db).await?;
    let orders = order_rows(db).await?;
    Ok(CustomerStats {
        total: customers.len(),
        active: customers.len(),
        new_this_month: created_this_month(&customers, Utc::now()),
        total_revenue: round_to(revenue(&orders), 2),
    })
}

#[derive(Debug, Serialize)]
pub struct CustomerMix {
    pub new_customers: usize,
    pub returning_customers: usize,
    pub churn_rate: f64,
}

pub async fn customer_mix<C>(db: &C) -> Result<CustomerMix, DbErr>
where
    C: ConnectionTrait,
{
    let customers = customer_dates(db).await?;
    let new_customers = created_this_month(&customers, Utc::now());
    Ok(CustomerMix {
        new_customers,
        returning_customers: customers.len() - new_customers,
        churn_rate: 0.0,
    })
}

fn category_name(category: Option<String>) -> String {
    category
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "Uncategorized".to_string())
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CategoryStock {
    pub category: String,
    pub total_items: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub value: f64,
}

/// Per-category item counts and stock value (price x stock).
pub fn stock_by_category<I>(products: I) -> Vec<CategoryStock>
where
    I: IntoIterator<Item = (Option<String>, i32, f64)>,
{
    let mut categories: BTreeMap<String, CategoryStock> = BTreeMap::new();
    for (category, stock, price) in products {
        let name = category_name(category);
        let entry = categories.entry(name.clone()).or_insert_with(|| CategoryStock {
            category: name,
            ..Default::default()
        });
        entry.total_items += 1;
        entry.value += price * f64::from(stock);
        if stock <= 0 {
            entry.out_of_stock += 1;
        } else if stock < LOW_STOCK_THRESHOLD {
            entry.low_stock += 1;
        }
    }
    categories
        .into_values()
        .map(|mut entry| {
            entry.value = round_to(entry.value, 2);
            entry
        })
        .collect()
}

pub async fn stock_overview<C>(db: &C) -> Result<Vec<CategoryStock>, DbErr>
where
    C: ConnectionTrait,
{
    let rows: Vec<(Option<String>, i32, f64)> = ProductEntity::find()
        .select_only()
        .column(product::Column::Category)
        .column(product::Column::Stock)
        .column(product::Column::Price)
        .into_tuple()
        .all(db)
        .await?;
    Ok(stock_by_category(rows))
}

#[derive(Debug, Serialize)]
pub struct ProductMix {
    pub by_category: Vec<serde_json::Value>,
    pub by_status: Vec<serde_json::Value>,
}

pub async fn product_mix<C>(db: &C) -> Result<ProductMix, DbErr>
where
    C: ConnectionTrait,
{
    let rows: Vec<(Option<String>, i32)> = ProductEntity::find()
        .select_only()
        .column(product::Column::Category)
        .column(product::Column::Stock)
        .into_tuple()
        .all(db)
        .await?;

    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    let (mut in_stock, mut low_stock, mut out_of_stock) = (0, 0, 0);
    for (category, stock) in rows {
        *by_category.entry(category_name(category)).or_default() += 1;
        if stock <= 0 {
            out_of_stock += 1;
        } else if stock < LOW_STOCK_THRESHOLD {
            low_stock += 1;
        } else {
            in_stock += 1;
        }
    }

    Ok(ProductMix {
        by_category: by_category
            .into_iter()
            .map(|(category, count)| serde_json::json!({ "category": category, "count": count }))
            .collect(),
        by_status: [
            ("in_stock", in_stock),
            ("low_stock", low_stock),
            ("out_of_stock", out_of_stock),
        ]
        .into_iter()
        .map(|(status, count)| serde_json::json!({ "status": status, "count": count }))
        .collect(),
    })
}
