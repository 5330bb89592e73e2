use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::UserQuery;
use crate::api::{non_blank, respond, ApiResult};
use crate::entities::user_profile::{self, Entity as UserProfileEntity};
use crate::error::ApiError;
use crate::AppContext;

pub fn profile_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .layer(Extension(ctx.db.clone()))
}

async fn get_profile(
    Query(params): Query<UserQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let user_id = params.require()?;

    let profile = UserProfileEntity::find()
        .filter(user_profile::Column::UserId.eq(user_id.as_str()))
        .one(db.as_ref())
        .await?;

    let data = match profile {
        Some(profile) => json!(profile),
        None => json!({
            "user_id": user_id,
            "first_name": null,
            "last_name": null,
            "phone_number": null,
            "email_notifications": true,
            "order_updates": true,
            "promotional_emails": false,
            "sms_notifications": false,
        }),
    };

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

#[derive(Deserialize)]
struct ProfilePayload {
    user_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone_number: Option<String>,
    email_notifications: Option<bool>,
    order_updates: Option<bool>,
    promotional_emails: Option<bool>,
    sms_notifications: Option<bool>,
}

async fn update_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ProfilePayload>,
) -> ApiResult {
    let user_id =
        non_blank(payload.user_id).ok_or_else(|| ApiError::validation("user_id is required"))?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;

    let existing = UserProfileEntity::find()
        .filter(user_profile::Column::UserId.eq(user_id.as_str()))
        .one(&txn)
        .await?;

    let now = Utc::now();
    let is_new = existing.is_none();
    let mut profile = match existing {
        Some(profile) => profile.into_active_model(),
        None => user_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(now),
            ..Default::default()
        },
    };
    // PUT replaces every field; omitted preferences fall back to their defaults.
    profile.first_name = Set(payload.first_name);
    profile.last_name = Set(payload.last_name);
    profile.phone_number = Set(payload.phone_number);
    profile.email_notifications = Set(payload.email_notifications.unwrap_or(true));
    profile.order_updates = Set(payload.order_updates.unwrap_or(true));
    profile.promotional_emails = Set(payload.promotional_emails.unwrap_or(false));
    profile.sms_notifications = Set(payload.sms_notifications.unwrap_or(false));
    profile.updated_at = Set(now);

    // The id is Set up front, so `save` would issue an UPDATE for a new row.
    let profile = if is_new {
        profile.insert(&txn).await?
    } else {
        profile.update(&txn).await?
    };
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": profile,
            "message": "Profile updated successfully",
        }),
    ))
}
