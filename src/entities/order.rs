use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer order. While `ordered` is false the order is the user's cart.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub ordered_date: DateTime<Utc>,
    pub ordered: bool,
    pub delivery_status: DeliveryStatus,
    pub checkout_address_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::checkout_address::Entity",
        from = "Column::CheckoutAddressId",
        to = "super::checkout_address::Column::Id"
    )]
    CheckoutAddress,
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id"
    )]
    Payment,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::checkout_address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutAddress.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Delivery status, stored as its single-digit code
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "1")]
    #[serde(rename = "1")]
    New,
    #[sea_orm(string_value = "2")]
    #[serde(rename = "2")]
    Processing,
    #[sea_orm(string_value = "3")]
    #[serde(rename = "3")]
    Shipped,
    #[sea_orm(string_value = "4")]
    #[serde(rename = "4")]
    Delivered,
}

impl DeliveryStatus {
    /// Parses a status code; `None` for anything outside `1`..=`4`
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::New),
            "2" => Some(Self::Processing),
            "3" => Some(Self::Shipped),
            "4" => Some(Self::Delivered),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::New => "1",
            Self::Processing => "2",
            Self::Shipped => "3",
            Self::Delivered => "4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New Order",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
        }
    }
}
