use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_IMAGE: &str = "products/default.jpg";

/// Catalog item
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "items")]
#[schema(as = Item)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub discount_price: Option<Decimal>,
    pub category: ItemCategory,
    pub label: ItemLabel,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub image: String,
    pub initial_stock: i32,
    pub topup_stock: i32,
    /// Always `initial_stock + topup_stock`, maintained on save
    pub total_stock: i32,
    pub current_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::stock::Entity")]
    Stock,
    #[sea_orm(has_many = "super::deal::Entity")]
    Deals,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stock.def()
    }
}

impl Related<super::deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deals.def()
    }
}

fn current<V: Copy + Into<sea_orm::Value>>(value: &ActiveValue<V>) -> Option<V> {
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(*v),
        ActiveValue::NotSet => None,
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let (Some(initial), Some(topup)) =
            (current(&self.initial_stock), current(&self.topup_stock))
        {
            self.total_stock = Set(initial + topup);
        }
        self.updated_at = Set(Utc::now());
        Ok(self)
    }
}

impl Model {
    /// Discount price when one is set and non-zero, otherwise the list price
    pub fn effective_price(&self) -> Decimal {
        match self.discount_price {
            Some(discount) if !discount.is_zero() => discount,
            _ => self.price,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(2))")]
pub enum ItemCategory {
    #[sea_orm(string_value = "S")]
    #[serde(rename = "S")]
    Fish,
    #[sea_orm(string_value = "SP")]
    #[serde(rename = "SP")]
    PalmOil,
    #[sea_orm(string_value = "OW")]
    #[serde(rename = "OW")]
    Honey,
}

impl ItemCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fish => "Fish",
            Self::PalmOil => "Palm Oil",
            Self::Honey => "Honey",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(2))")]
pub enum ItemLabel {
    #[sea_orm(string_value = "N")]
    #[serde(rename = "N")]
    New,
    #[sea_orm(string_value = "BS")]
    #[serde(rename = "BS")]
    Discount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, discount: Option<Decimal>) -> Model {
        Model {
            id: Uuid::new_v4(),
            name: "Smoked catfish".into(),
            price,
            discount_price: discount,
            category: ItemCategory::Fish,
            label: ItemLabel::New,
            description: String::new(),
            image: DEFAULT_IMAGE.into(),
            initial_stock: 10,
            topup_stock: 0,
            total_stock: 10,
            current_stock: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn effective_price_prefers_discount() {
        assert_eq!(item(dec!(10), Some(dec!(8))).effective_price(), dec!(8));
        assert_eq!(item(dec!(10), None).effective_price(), dec!(10));
    }

    #[test]
    fn zero_discount_falls_back_to_price() {
        assert_eq!(item(dec!(10), Some(dec!(0))).effective_price(), dec!(10));
    }

    #[test]
    fn category_serializes_as_code() {
        assert_eq!(
            serde_json::to_string(&ItemCategory::PalmOil).unwrap(),
            "\"SP\""
        );
        assert_eq!(ItemCategory::Honey.display_name(), "Honey");
    }
}
