use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::UserQuery;
use crate::api::{non_blank, parse_id, respond, ApiResult};
use crate::entities::user_address::{self, Entity as UserAddressEntity};
use crate::error::ApiError;
use crate::AppContext;

pub fn addresses_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/addresses", get(list_addresses).post(add_address))
        .route("/addresses/:id", put(update_address).delete(delete_address))
        .layer(Extension(ctx.db.clone()))
}

#[derive(Deserialize)]
struct AddressPayload {
    user_id: Option<String>,
    label: Option<String>,
    full_name: Option<String>,
    phone_number: Option<String>,
    district: Option<String>,
    thana: Option<String>,
    full_address: Option<String>,
    #[serde(default)]
    is_default: bool,
}

impl AddressPayload {
    fn apply(self, address: &mut user_address::ActiveModel) {
        address.label = Set(self.label);
        address.full_name = Set(self.full_name);
        address.phone_number = Set(self.phone_number);
        address.district = Set(self.district);
        address.thana = Set(self.thana);
        address.full_address = Set(self.full_address);
        address.is_default = Set(self.is_default);
    }
}

/// Clears the default flag on every other address of `user_id`. Must run in
/// the same transaction as the write that sets the new default.
async fn clear_default<C>(db: &C, user_id: &str, keep: Option<Uuid>) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let mut update = UserAddressEntity::update_many()
        .col_expr(user_address::Column::IsDefault, Expr::value(false))
        .filter(user_address::Column::UserId.eq(user_id))
        .filter(user_address::Column::IsDefault.eq(true));
    if let Some(id) = keep {
        update = update.filter(user_address::Column::Id.ne(id));
    }
    update.exec(db).await?;
    Ok(())
}

async fn list_addresses(
    Query(params): Query<UserQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let user_id = params.require()?;

    let addresses = UserAddressEntity::find()
        .filter(user_address::Column::UserId.eq(user_id))
        .order_by_desc(user_address::Column::IsDefault)
        .order_by_desc(user_address::Column::CreatedAt)
        .all(db.as_ref())
        .await?;

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "data": addresses }),
    ))
}

async fn add_address(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(mut payload): Json<AddressPayload>,
) -> ApiResult {
    let user_id = non_blank(payload.user_id.take())
        .ok_or_else(|| ApiError::validation("user_id is required"))?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    if payload.is_default {
        clear_default(&txn, &user_id, None).await?;
    }

    let mut address = user_address::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    payload.apply(&mut address);
    let address = address.insert(&txn).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "data": address,
            "message": "Address added successfully",
        }),
    ))
}

async fn update_address(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<AddressPayload>,
) -> ApiResult {
    let id = parse_id(&id, "Address not found")?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    let existing = UserAddressEntity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::not_found("Address not found"))?;

    if payload.is_default {
        // The stored owner wins over whatever the body claims.
        clear_default(&txn, &existing.user_id, Some(id)).await?;
    }

    let mut address = existing.into_active_model();
    payload.apply(&mut address);
    let address = address.update(&txn).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": address,
            "message": "Address updated successfully",
        }),
    ))
}

async fn delete_address(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = parse_id(&id, "Address not found")?;
    let result = UserAddressEntity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Address not found"));
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Address deleted successfully" }),
    ))
}
