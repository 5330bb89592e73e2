use sea_orm::entity::prelude::*;
use serde::Serialize;

/// One populated cell of a size chart grid; absent cells have no row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "size_chart_values")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub row_id: i32,
    #[sea_orm(indexed)]
    pub column_id: i32,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::size_chart_row::Entity",
        from = "Column::RowId",
        to = "crate::entities::size_chart_row::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Row,
    #[sea_orm(
        belongs_to = "crate::entities::size_chart_column::Entity",
        from = "Column::ColumnId",
        to = "crate::entities::size_chart_column::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    SizeColumn,
}

impl ActiveModelBehavior for ActiveModel {}
