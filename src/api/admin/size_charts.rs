use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::{non_blank, respond, ApiResult};
use crate::entities::{
    size_chart_column::{self, Entity as ColumnEntity},
    size_chart_row::{self, Entity as RowEntity},
    size_chart_template::{self, Entity as TemplateEntity},
};
use crate::error::ApiError;
use crate::services::size_chart::{self, CellInput};
use crate::AppContext;

const DEFAULT_UNIT: &str = "cm";

pub fn admin_size_charts_router(ctx: &AppContext) -> Router {
    Router::new()
        .route("/size-charts", get(list_templates).post(create_template))
        .route(
            "/size-charts/:id",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/size-charts/:id/rows", post(add_row))
        .route("/size-charts/:id/rows/:row_id", delete(delete_row))
        .route("/size-charts/:id/columns", post(add_column))
        .route("/size-charts/:id/columns/:column_id", delete(delete_column))
        .route("/size-charts/:id/values", put(update_values))
        .layer(Extension(ctx.db.clone()))
}

/// Template ids are integers; anything else cannot name a chart.
fn template_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::not_found("Size chart not found"))
}

async fn list_templates(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult {
    let templates = TemplateEntity::find()
        .order_by_desc(size_chart_template::Column::CreatedAt)
        .all(db.as_ref())
        .await?;

    let mut data = Vec::with_capacity(templates.len());
    for template in templates {
        let row_count = RowEntity::find()
            .filter(size_chart_row::Column::TemplateId.eq(template.id))
            .count(db.as_ref())
            .await?;
        let column_count = ColumnEntity::find()
            .filter(size_chart_column::Column::TemplateId.eq(template.id))
            .count(db.as_ref())
            .await?;
        data.push(json!({
            "id": template.id,
            "name": template.name,
            "description": template.description,
            "created_at": template.created_at,
            "updated_at": template.updated_at,
            "row_count": row_count,
            "column_count": column_count,
        }));
    }

    Ok(respond(StatusCode::OK, json!({ "success": true, "data": data })))
}

#[derive(Deserialize)]
struct TemplatePayload {
    name: Option<String>,
    description: Option<String>,
}

async fn create_template(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<TemplatePayload>,
) -> ApiResult {
    let name = non_blank(payload.name).ok_or_else(|| ApiError::validation("name is required"))?;

    let now = Utc::now();
    let template = size_chart_template::ActiveModel {
        name: Set(name),
        description: Set(non_blank(payload.description)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db.as_ref())
    .await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({
            "success": true,
            "data": template,
            "message": "Size chart created successfully",
        }),
    ))
}

async fn get_template(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let chart = size_chart::load_chart(db.as_ref(), template_id(&id)?).await?;
    Ok(respond(StatusCode::OK, json!({ "success": true, "data": chart })))
}

async fn update_template(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<TemplatePayload>,
) -> ApiResult {
    let id = template_id(&id)?;
    if payload.name.is_none() && payload.description.is_none() {
        return Err(ApiError::validation("No fields to update"));
    }

    let template = size_chart::require_template(db.as_ref(), id).await?;
    let mut template = template.into_active_model();
    if let Some(name) = payload.name {
        let name = non_blank(Some(name)).ok_or_else(|| ApiError::validation("name must not be empty"))?;
        template.name = Set(name);
    }
    if let Some(description) = payload.description {
        template.description = Set(non_blank(Some(description)));
    }
    template.updated_at = Set(Utc::now());
    let template = template.update(db.as_ref()).await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "data": template,
            "message": "Size chart updated successfully",
        }),
    ))
}

async fn delete_template(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = template_id(&id)?;
    // Rows, columns and cells cascade; products fall back to no chart.
    let result = TemplateEntity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Size chart not found"));
    }

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Size chart deleted successfully" }),
    ))
}

#[derive(Deserialize, Validate)]
struct RowPayload {
    #[validate(length(min = 1, message = "size_label is required"))]
    size_label: String,
    sort_order: Option<i32>,
}

async fn add_row(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(mut payload): Json<RowPayload>,
) -> ApiResult {
    let id = template_id(&id)?;
    payload.size_label = payload.size_label.trim().to_string();
    payload.validate()?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;
    size_chart::require_template(&txn, id).await?;

    let sort_order = match payload.sort_order {
        Some(order) => order,
        None => RowEntity::find()
            .filter(size_chart_row::Column::TemplateId.eq(id))
            .count(&txn)
            .await? as i32,
    };
    let row = size_chart_row::ActiveModel {
        template_id: Set(id),
        size_label: Set(payload.size_label),
        sort_order: Set(sort_order),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    size_chart::touch_template(&txn, id).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({ "success": true, "data": row, "message": "Row added successfully" }),
    ))
}

async fn delete_row(
    Path((id, row_id)): Path<(String, String)>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = template_id(&id)?;
    let row_id: i32 = row_id
        .trim()
        .parse()
        .map_err(|_| ApiError::not_found("Row not found"))?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;
    let result = RowEntity::delete_many()
        .filter(size_chart_row::Column::Id.eq(row_id))
        .filter(size_chart_row::Column::TemplateId.eq(id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Row not found"));
    }
    size_chart::touch_template(&txn, id).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Row deleted successfully" }),
    ))
}

#[derive(Deserialize, Validate)]
struct ColumnPayload {
    #[validate(length(min = 1, message = "column_key is required"))]
    column_key: String,
    display_name: Option<String>,
    unit: Option<String>,
    sort_order: Option<i32>,
}

/// Lower-cased with whitespace runs turned into `_`, e.g. "Chest Width" -> "chest_width".
fn column_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

async fn add_column(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(mut payload): Json<ColumnPayload>,
) -> ApiResult {
    let id = template_id(&id)?;
    payload.column_key = column_key(&payload.column_key);
    payload.validate()?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;
    size_chart::require_template(&txn, id).await?;

    let sort_order = match payload.sort_order {
        Some(order) => order,
        None => ColumnEntity::find()
            .filter(size_chart_column::Column::TemplateId.eq(id))
            .count(&txn)
            .await? as i32,
    };
    let display_name =
        non_blank(payload.display_name).unwrap_or_else(|| payload.column_key.clone());
    let column = size_chart_column::ActiveModel {
        template_id: Set(id),
        column_key: Set(payload.column_key),
        display_name: Set(display_name),
        unit: Set(non_blank(payload.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string())),
        sort_order: Set(sort_order),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    size_chart::touch_template(&txn, id).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::CREATED,
        json!({ "success": true, "data": column, "message": "Column added successfully" }),
    ))
}

async fn delete_column(
    Path((id, column_id)): Path<(String, String)>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult {
    let id = template_id(&id)?;
    let column_id: i32 = column_id
        .trim()
        .parse()
        .map_err(|_| ApiError::not_found("Column not found"))?;

    let txn = db
        .begin()
        .await
        .map_err(|_| ApiError::TransactionCreationFailed)?;
    let result = ColumnEntity::delete_many()
        .filter(size_chart_column::Column::Id.eq(column_id))
        .filter(size_chart_column::Column::TemplateId.eq(id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Column not found"));
    }
    size_chart::touch_template(&txn, id).await?;
    txn.commit().await?;

    Ok(respond(
        StatusCode::OK,
        json!({ "success": true, "message": "Column deleted successfully" }),
    ))
}

#[derive(Deserialize)]
struct ValuesPayload {
    #[serde(default)]
    values: Vec<CellInput>,
}

async fn update_values(
    Path(id): Path<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<ValuesPayload>,
) -> ApiResult {
    let id = template_id(&id)?;
    let updated = size_chart::upsert_values(db.as_ref(), id, payload.values).await?;

    Ok(respond(
        StatusCode::OK,
        json!({
            "success": true,
            "message": "Values updated successfully",
            "updated": updated,
        }),
    ))
}
