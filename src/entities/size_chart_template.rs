use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "size_chart_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::entities::size_chart_row::Entity")]
    Row,
    #[sea_orm(has_many = "crate::entities::size_chart_column::Entity")]
    SizeColumn,
}

impl Related<crate::entities::size_chart_row::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Row.def()
    }
}

impl Related<crate::entities::size_chart_column::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SizeColumn.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
