use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::entities::size_chart_template::Entity as SizeChartTemplate;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(indexed, nullable)]
    pub category: Option<String>,
    #[sea_orm(nullable)]
    pub brand: Option<String>,
    pub price: f64,
    #[sea_orm(nullable)]
    pub original_price: Option<f64>,
    pub stock: i32,
    pub status: ProductStatus,
    // Mirrors image_urls[0] for older clients.
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub image_urls: Json,
    #[sea_orm(column_type = "Json")]
    pub color: Json,
    #[sea_orm(column_type = "Json")]
    pub size: Json,
    #[sea_orm(column_type = "Json")]
    pub tags: Json,
    #[sea_orm(nullable)]
    pub size_chart_template_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "SizeChartTemplate",
        from = "crate::entities::product::Column::SizeChartTemplateId",
        to = "crate::entities::size_chart_template::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    SizeChartTemplate,
    #[sea_orm(has_many = "crate::entities::review::Entity")]
    Review,
    #[sea_orm(has_many = "crate::entities::product_size::Entity")]
    ProductSize,
}

impl Related<crate::entities::size_chart_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SizeChartTemplate.def()
    }
}

impl Related<crate::entities::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl Related<crate::entities::product_size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductSize.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Ordered image list, falling back to the single legacy `image_url`.
    pub fn images(&self) -> Vec<String> {
        match self.image_urls.as_array() {
            Some(urls) => urls
                .iter()
                .filter_map(|url| url.as_str().map(str::to_owned))
                .collect(),
            None => self.image_url.iter().cloned().collect(),
        }
    }

    pub fn primary_image(&self) -> Option<String> {
        self.images().into_iter().next().or_else(|| self.image_url.clone())
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "product_status_enum",
    db_type = "String(StringLen::N(32))",
    rs_type = "String"
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("Invalid product status: {s}")),
        }
    }
}
