//! Lookups shared by the cart, checkout and payment services: the user's
//! open order, its lines and their totals.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{item, order, order_item, user, DeliveryStatus};
use crate::errors::ServiceError;

pub const NO_ORDER_MESSAGE: &str = "You do not have an order";

/// One cart line joined with its catalog item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub line: order_item::Model,
    pub item: item::Model,
}

impl OrderLine {
    fn quantity(&self) -> Decimal {
        Decimal::from(self.line.quantity)
    }

    pub fn total_item_price(&self) -> Decimal {
        self.quantity() * self.item.price
    }

    pub fn total_discount_item_price(&self) -> Option<Decimal> {
        match self.item.discount_price {
            Some(discount) if !discount.is_zero() => Some(self.quantity() * discount),
            _ => None,
        }
    }

    pub fn amount_saved(&self) -> Decimal {
        self.total_discount_item_price()
            .map(|discounted| self.total_item_price() - discounted)
            .unwrap_or_default()
    }

    /// Discounted line total when a discount applies, list total otherwise
    pub fn final_price(&self) -> Decimal {
        self.total_discount_item_price()
            .unwrap_or_else(|| self.total_item_price())
    }
}

/// Sum of every line's final price
pub fn order_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::final_price).sum()
}

/// Amount in the currency's minor unit, truncated
pub fn minor_units(total: Decimal) -> Result<i64, ServiceError> {
    (total * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| ServiceError::InvalidInput(format!("Order total {} is out of range", total)))
}

/// Line as presented in summaries
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderLineView {
    pub item_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub total_item_price: Decimal,
    pub total_discount_item_price: Option<Decimal>,
    pub amount_saved: Decimal,
    pub final_price: Decimal,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            item_id: line.item.id,
            name: line.item.name.clone(),
            quantity: line.line.quantity,
            price: line.item.price,
            discount_price: line.item.discount_price,
            total_item_price: line.total_item_price(),
            total_discount_item_price: line.total_discount_item_price(),
            amount_saved: line.amount_saved(),
            final_price: line.final_price(),
        }
    }
}

/// Open order as shown on the summary and checkout pages
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub start_date: chrono::DateTime<Utc>,
    pub checkout_address_id: Option<Uuid>,
    pub lines: Vec<OrderLineView>,
    pub amount_saved: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    pub fn new(order: &order::Model, lines: &[OrderLine]) -> Self {
        Self {
            order_id: order.id,
            start_date: order.start_date,
            checkout_address_id: order.checkout_address_id,
            lines: lines.iter().map(OrderLineView::from).collect(),
            amount_saved: lines.iter().map(OrderLine::amount_saved).sum(),
            total: order_total(lines),
        }
    }
}

/// Summary of the user's open order, 404 when there is none
pub async fn open_order_summary<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<OrderSummary, ServiceError> {
    let order = require_open_order(conn, user_id).await?;
    let lines = order_lines(conn, order.id).await?;
    Ok(OrderSummary::new(&order, &lines))
}

pub async fn find_open_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<order::Model>, ServiceError> {
    Ok(order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Ordered.eq(false))
        .order_by_desc(order::Column::StartDate)
        .one(conn)
        .await?)
}

/// Open order or a 404 carrying the shopper-facing message
pub async fn require_open_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<order::Model, ServiceError> {
    find_open_order(conn, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(NO_ORDER_MESSAGE.to_string()))
}

/// Returns the open order, creating one when the user has none. The flag is
/// true when the order was created by this call.
pub async fn open_or_create<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<(order::Model, bool), ServiceError> {
    // Serializes first adds from the same user so only one order gets opened
    user::Entity::find_by_id(user_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

    if let Some(existing) = find_open_order(conn, user_id).await? {
        return Ok((existing, false));
    }

    let now = Utc::now();
    let created = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        start_date: Set(now),
        ordered_date: Set(now),
        ordered: Set(false),
        delivery_status: Set(DeliveryStatus::New),
        checkout_address_id: Set(None),
        payment_id: Set(None),
    }
    .insert(conn)
    .await?;

    debug!(order_id = %created.id, %user_id, "opened new order");
    Ok((created, true))
}

/// Lines of an order with their items, oldest first
pub async fn order_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<OrderLine>, ServiceError> {
    let rows = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::CreatedAt)
        .find_also_related(item::Entity)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(line, item)| match item {
            Some(item) => Some(OrderLine { line, item }),
            None => {
                warn!(line_id = %line.id, "order line references a missing item");
                None
            }
        })
        .collect())
}
