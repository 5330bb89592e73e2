//! Size chart templates as a sparse row x column grid.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::{
    size_chart_column::{self, Entity as ColumnEntity},
    size_chart_row::{self, Entity as RowEntity},
    size_chart_template::{self, Entity as TemplateEntity},
    size_chart_value::{self, Entity as ValueEntity},
};
use crate::error::ApiError;

/// `size_label -> column_key -> value`, only for populated cells.
pub type ValuesGrid = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Serialize)]
pub struct SizeChart {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub rows: Vec<size_chart_row::Model>,
    pub columns: Vec<size_chart_column::Model>,
    pub values_grid: ValuesGrid,
}

/// Builds the label/key grid from cell rows. Cells pointing at unknown rows or
/// columns are skipped.
pub fn build_grid(
    rows: &[size_chart_row::Model],
    columns: &[size_chart_column::Model],
    values: &[size_chart_value::Model],
) -> ValuesGrid {
    let mut grid = ValuesGrid::new();
    for value in values {
        let row = rows.iter().find(|row| row.id == value.row_id);
        let column = columns.iter().find(|column| column.id == value.column_id);
        if let (Some(row), Some(column)) = (row, column) {
            grid.entry(row.size_label.clone())
                .or_default()
                .insert(column.column_key.clone(), value.value.clone());
        }
    }
    grid
}

pub async fn load_chart<C>(db: &C, template_id: i32) -> Result<SizeChart, ApiError>
where
    C: ConnectionTrait,
{
    let template = TemplateEntity::find_by_id(template_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Size chart not found"))?;

    let rows = RowEntity::find()
        .filter(size_chart_row::Column::TemplateId.eq(template_id))
        .order_by_asc(size_chart_row::Column::SortOrder)
        .order_by_asc(size_chart_row::Column::Id)
        .all(db)
        .await?;
    let columns = ColumnEntity::find()
        .filter(size_chart_column::Column::TemplateId.eq(template_id))
        .order_by_asc(size_chart_column::Column::SortOrder)
        .order_by_asc(size_chart_column::Column::Id)
        .all(db)
        .await?;

    let row_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let values = if row_ids.is_empty() {
        Vec::new()
    } else {
        ValueEntity::find()
            .filter(size_chart_value::Column::RowId.is_in(row_ids))
            .all(db)
            .await?
    };

    let values_grid = build_grid(&rows, &columns, &values);
    Ok(SizeChart {
        id: template.id,
        name: template.name,
        description: template.description,
        created_at: template.created_at,
        updated_at: template.updated_at,
        rows,
        columns,
        values_grid,
    })
}

/// Fails with 404 unless the template exists.
pub async fn require_template<C>(db: &C, template_id: i32) -> Result<size_chart_template::Model, ApiError>
where
    C: ConnectionTrait,
{
    TemplateEntity::find_by_id(template_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Size chart not found"))
}

#[derive(Clone, Debug, Deserialize)]
pub struct CellInput {
    pub row_id: i32,
    pub column_id: i32,
    #[serde(default)]
    pub value: Option<String>,
}

/// Writes the given cells of one template. A blank value removes the cell.
/// Returns the number of cells written or removed.
pub async fn upsert_values(
    db: &DatabaseConnection,
    template_id: i32,
    cells: Vec<CellInput>,
) -> Result<usize, ApiError> {
    let txn = db.begin().await?;
    require_template(&txn, template_id).await?;

    let row_ids: Vec<i32> = RowEntity::find()
        .filter(size_chart_row::Column::TemplateId.eq(template_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();
    let column_ids: Vec<i32> = ColumnEntity::find()
        .filter(size_chart_column::Column::TemplateId.eq(template_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|column| column.id)
        .collect();

    let mut touched = 0;
    for cell in cells {
        if !row_ids.contains(&cell.row_id) || !column_ids.contains(&cell.column_id) {
            return Err(ApiError::Validation(format!(
                "Cell ({}, {}) does not belong to this size chart",
                cell.row_id, cell.column_id
            )));
        }

        let existing = ValueEntity::find()
            .filter(size_chart_value::Column::RowId.eq(cell.row_id))
            .filter(size_chart_value::Column::ColumnId.eq(cell.column_id))
            .one(&txn)
            .await?;
        let value = cell
            .value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        match (existing, value) {
            (Some(existing), Some(value)) => {
                let mut existing = existing.into_active_model();
                existing.value = Set(value);
                existing.update(&txn).await?;
            }
            (Some(existing), None) => {
                ValueEntity::delete_by_id(existing.id).exec(&txn).await?;
            }
            (None, Some(value)) => {
                size_chart_value::ActiveModel {
                    row_id: Set(cell.row_id),
                    column_id: Set(cell.column_id),
                    value: Set(value),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
            (None, None) => continue,
        }
        touched += 1;
    }

    touch_template(&txn, template_id).await?;
    txn.commit().await?;
    Ok(touched)
}

/// Bumps `updated_at` on the template after a grid edit.
pub async fn touch_template<C>(db: &C, template_id: i32) -> Result<(), ApiError>
where
    C: ConnectionTrait,
{
    TemplateEntity::update_many()
        .col_expr(
            size_chart_template::Column::UpdatedAt,
            sea_orm::sea_query::Expr::value(Utc::now()),
        )
        .filter(size_chart_template::Column::Id.eq(template_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, label: &str) -> size_chart_row::Model {
        size_chart_row::Model {
            id,
            template_id: 1,
            size_label: label.into(),
            sort_order: id,
        }
    }

    fn column(id: i32, key: &str) -> size_chart_column::Model {
        size_chart_column::Model {
            id,
            template_id: 1,
            column_key: key.into(),
            display_name: key.to_uppercase(),
            unit: "cm".into(),
            sort_order: id,
        }
    }

    fn cell(id: i32, row_id: i32, column_id: i32, value: &str) -> size_chart_value::Model {
        size_chart_value::Model {
            id,
            row_id,
            column_id,
            value: value.into(),
        }
    }

    #[test]
    fn grid_is_keyed_by_label_and_column_key() {
        let rows = [row(1, "S"), row(2, "M")];
        let columns = [column(10, "chest"), column(11, "length")];
        let values = [cell(1, 1, 10, "96"), cell(2, 2, 11, "72"), cell(3, 9, 10, "orphan")];

        let grid = build_grid(&rows, &columns, &values);

        assert_eq!(grid.len(), 2);
        assert_eq!(grid["S"]["chest"], "96");
        assert_eq!(grid["M"]["length"], "72");
        assert!(!grid["S"].contains_key("length"));
    }
}
