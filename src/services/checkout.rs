//! Session cart merging and cart-to-order conversion.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{
    cart_item::{self, Entity as CartItemEntity},
    customer,
    discount::{self, Entity as DiscountEntity},
    order::{self, Status},
    order_item,
    product::{self, Entity as ProductEntity},
};
use crate::error::ApiError;
use crate::services::catalog::round_to;

/// One line to add to a session cart.
#[derive(Clone, Debug)]
pub struct CartLine {
    pub session_id: String,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
}

/// Adds `line` to its session cart, merging into an existing row with the
/// same product, size and colour.
///
/// Returns the id of the row that now holds the quantity.
pub async fn add_to_cart(db: &DatabaseConnection, line: &CartLine) -> Result<Uuid, ApiError> {
    match merge_line(db, line).await {
        Err(MergeError::Db(err)) if is_unique_violation(&err) => {
            // A concurrent request inserted the same line first; it exists now.
            warn!(session_id = %line.session_id, "Cart insert raced, retrying as increment");
            merge_line(db, line).await.map_err(ApiError::from)
        }
        other => other.map_err(ApiError::from),
    }
}

enum MergeError {
    ProductNotFound,
    Db(DbErr),
}

impl From<DbErr> for MergeError {
    fn from(err: DbErr) -> Self {
        MergeError::Db(err)
    }
}

impl From<MergeError> for ApiError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::ProductNotFound => ApiError::not_found("Product not found"),
            MergeError::Db(err) => err.into(),
        }
    }
}

async fn merge_line(db: &DatabaseConnection, line: &CartLine) -> Result<Uuid, MergeError> {
    let txn = db.begin().await?;

    let product = ProductEntity::find_by_id(line.product_id)
        .one(&txn)
        .await?
        .ok_or(MergeError::ProductNotFound)?;

    let existing = CartItemEntity::find()
        .filter(same_line(line))
        .one(&txn)
        .await?;

    let id = match existing {
        Some(item) => {
            CartItemEntity::update_many()
                .col_expr(
                    cart_item::Column::Quantity,
                    Expr::col(cart_item::Column::Quantity).add(line.quantity),
                )
                .filter(cart_item::Column::Id.eq(item.id))
                .exec(&txn)
                .await?;
            item.id
        }
        None => {
            let new_item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                session_id: Set(line.session_id.clone()),
                product_id: Set(line.product_id),
                size: Set(line.size.clone()),
                color: Set(line.color.clone()),
                quantity: Set(line.quantity),
                price: Set(product.price),
                created_at: Set(Utc::now()),
            };
            new_item.insert(&txn).await?.id
        }
    };

    txn.commit().await?;
    Ok(id)
}

fn same_line(line: &CartLine) -> Condition {
    let size = match &line.size {
        Some(size) => cart_item::Column::Size.eq(size.clone()),
        None => cart_item::Column::Size.is_null(),
    };
    let color = match &line.color {
        Some(color) => cart_item::Column::Color.eq(color.clone()),
        None => cart_item::Column::Color.is_null(),
    };
    Condition::all()
        .add(cart_item::Column::SessionId.eq(line.session_id.clone()))
        .add(cart_item::Column::ProductId.eq(line.product_id))
        .add(size)
        .add(color)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone, Debug, Default)]
pub struct CustomerDetails {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub district: Option<String>,
    pub thana: Option<String>,
    pub full_address: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewOrder {
    pub session_id: String,
    pub customer: CustomerDetails,
    pub discount_percentage: f64,
    pub discount_code: Option<String>,
    pub delivery_fee: f64,
    pub user_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub delivery_fee: f64,
    pub total: f64,
}

impl OrderTotals {
    /// `lines` are (unit price, quantity) pairs.
    pub fn compute(lines: &[(f64, i32)], discount: f64, delivery_fee: f64) -> Self {
        let subtotal: f64 = lines.iter().map(|(price, qty)| price * f64::from(*qty)).sum();
        Self {
            subtotal,
            discount,
            delivery_fee,
            total: subtotal - discount + delivery_fee,
        }
    }

    pub fn percentage_discount(subtotal: f64, percentage: f64) -> f64 {
        subtotal * (percentage.clamp(0.0, 100.0) / 100.0)
    }

    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_to(self.subtotal, 2),
            discount: round_to(self.discount, 2),
            delivery_fee: self.delivery_fee,
            total: round_to(self.total, 2),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub totals: OrderTotals,
}

/// Converts the session cart into an order in a single transaction: the
/// customer, order, order items, discount usage and cart clearing commit
/// together or not at all.
pub async fn place_order(db: &DatabaseConnection, new_order: NewOrder) -> Result<PlacedOrder, ApiError> {
    let txn = db.begin().await?;

    let cart = CartItemEntity::find()
        .filter(cart_item::Column::SessionId.eq(new_order.session_id.clone()))
        .order_by_asc(cart_item::Column::CreatedAt)
        .find_also_related(ProductEntity)
        .all(&txn)
        .await?;

    if cart.is_empty() {
        return Err(ApiError::validation("Cart is empty"));
    }

    let lines: Vec<(f64, i32)> = cart.iter().map(|(item, _)| (item.price, item.quantity)).collect();
    let subtotal = OrderTotals::compute(&lines, 0.0, 0.0).subtotal;

    let (discount_amount, discount_code) = match new_order.discount_code.as_deref() {
        Some(code) if !code.trim().is_empty() => {
            let amount = redeem_code(&txn, code, subtotal).await?;
            (amount, Some(code.trim().to_uppercase()))
        }
        _ => (
            OrderTotals::percentage_discount(subtotal, new_order.discount_percentage),
            None,
        ),
    };
    let totals = OrderTotals::compute(&lines, discount_amount, new_order.delivery_fee);

    let now = Utc::now();
    let details = new_order.customer;
    let customer = customer::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(new_order.user_id.clone()),
        full_name: Set(details.full_name),
        email: Set(details.email),
        phone_number: Set(details.phone_number),
        district: Set(details.district),
        thana: Set(details.thana),
        full_address: Set(details.full_address),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer.id),
        user_id: Set(new_order.user_id),
        session_id: Set(new_order.session_id.clone()),
        subtotal: Set(totals.subtotal),
        discount: Set(totals.discount),
        delivery_fee: Set(totals.delivery_fee),
        total: Set(totals.total),
        status: Set(Status::Pending),
        discount_code: Set(discount_code),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let items: Vec<order_item::ActiveModel> = cart
        .iter()
        .map(|(item, product)| order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            product_name: Set(product.as_ref().map(|p| p.name.clone())),
            product_image: Set(product.as_ref().and_then(product::Model::primary_image)),
            size: Set(item.size.clone()),
            color: Set(item.color.clone()),
            quantity: Set(item.quantity),
            price: Set(item.price),
        })
        .collect();
    order_item::Entity::insert_many(items).exec(&txn).await?;

    CartItemEntity::delete_many()
        .filter(cart_item::Column::SessionId.eq(new_order.session_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    info!(order_id = %order.id, total = totals.total, "Order created");

    Ok(PlacedOrder {
        order_id: order.id,
        totals,
    })
}

/// Checks a discount code against `subtotal`, bumps its usage and returns the
/// amount taken off.
async fn redeem_code<C>(db: &C, code: &str, subtotal: f64) -> Result<f64, ApiError>
where
    C: ConnectionTrait,
{
    let discount = check_code(db, code, subtotal).await?;

    discount::Entity::update_many()
        .col_expr(
            discount::Column::UsageCount,
            Expr::col(discount::Column::UsageCount).add(1),
        )
        .filter(discount::Column::Id.eq(discount.id))
        .exec(db)
        .await?;

    Ok(discount.amount_off(subtotal))
}

/// Looks up a code (case-insensitively) and verifies it can be used on `subtotal`.
pub async fn check_code<C>(db: &C, code: &str, subtotal: f64) -> Result<discount::Model, ApiError>
where
    C: ConnectionTrait,
{
    let today = Utc::now().date_naive();
    let discount = DiscountEntity::find()
        .filter(discount::Column::Code.eq(code.trim().to_uppercase()))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Discount code not found"))?;

    if !discount.is_redeemable(today) {
        return Err(ApiError::validation("Discount code is not active"));
    }
    if subtotal < discount.min_order_value {
        return Err(ApiError::Validation(format!(
            "Minimum order value for this code is {:.2}",
            discount.min_order_value
        )));
    }
    Ok(discount)
}
