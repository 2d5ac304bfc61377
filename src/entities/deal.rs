use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Promotional bundle shown on the home page
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub packaging: Packaging,
    pub deal: i32,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(6))")]
pub enum Packaging {
    #[sea_orm(string_value = "0")]
    #[serde(rename = "0")]
    Kg,
    #[sea_orm(string_value = "1")]
    #[serde(rename = "1")]
    Bag,
    #[sea_orm(string_value = "2")]
    #[serde(rename = "2")]
    Bottle,
    #[sea_orm(string_value = "3")]
    #[serde(rename = "3")]
    Tonne,
    #[sea_orm(string_value = "4")]
    #[serde(rename = "4")]
    Bunch,
}

impl Default for Packaging {
    fn default() -> Self {
        Self::Kg
    }
}
