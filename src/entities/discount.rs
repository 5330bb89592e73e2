use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub discount: f64,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    #[sea_orm(nullable)]
    pub expiration_date: Option<Date>,
    pub status: DiscountStatus,
    pub usage_count: i32,
    pub usage_limit: i32,
    pub min_order_value: f64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stored status with expiry applied lazily against `today`.
    pub fn effective_status(&self, today: NaiveDate) -> DiscountStatus {
        match self.expiration_date {
            Some(date) if date < today => DiscountStatus::Expired,
            _ => self.status,
        }
    }

    pub fn is_redeemable(&self, today: NaiveDate) -> bool {
        self.effective_status(today) == DiscountStatus::Active
            && self.usage_count < self.usage_limit
    }

    /// Amount taken off `subtotal`, never more than the subtotal itself.
    pub fn amount_off(&self, subtotal: f64) -> f64 {
        let amount = match self.discount_type {
            DiscountType::Percentage => subtotal * (self.discount.clamp(0.0, 100.0) / 100.0),
            DiscountType::Fixed => self.discount.max(0.0),
        };
        amount.min(subtotal)
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "discount_type_enum",
    db_type = "String(StringLen::N(32))",
    rs_type = "String"
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "discount_status_enum",
    db_type = "String(StringLen::N(32))",
    rs_type = "String"
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl FromStr for DiscountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Invalid discount status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn discount(discount_type: DiscountType, value: f64, expires: Option<NaiveDate>) -> Model {
        Model {
            id: Uuid::new_v4(),
            code: "SUMMER".into(),
            discount: value,
            discount_type,
            expiration_date: expires,
            status: DiscountStatus::Active,
            usage_count: 0,
            usage_limit: 1,
            min_order_value: 0.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_is_applied_at_read_time() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();

        let expired = discount(DiscountType::Percentage, 10.0, Some(yesterday));
        assert_eq!(expired.effective_status(today), DiscountStatus::Expired);
        assert!(!expired.is_redeemable(today));

        let last_day = discount(DiscountType::Percentage, 10.0, Some(today));
        assert_eq!(last_day.effective_status(today), DiscountStatus::Active);
    }

    #[test]
    fn usage_limit_blocks_redemption() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let mut used_up = discount(DiscountType::Fixed, 5.0, None);
        used_up.usage_count = 1;
        assert!(!used_up.is_redeemable(today));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let fixed = discount(DiscountType::Fixed, 50.0, None);
        assert_eq!(fixed.amount_off(20.0), 20.0);
        let pct = discount(DiscountType::Percentage, 25.0, None);
        assert_eq!(pct.amount_off(80.0), 20.0);
    }
}
