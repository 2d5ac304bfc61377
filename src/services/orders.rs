use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{checkout_address, item, order, order_item, payment, user, DeliveryStatus},
    errors::ServiceError,
    events::{Event, EventHandler, EventSender, Feed},
    services::open_order::{open_order_summary, OrderSummary},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const LATEST_ORDERS_LIMIT: u64 = 10;
pub const ORDERS_TOPIC: &str = "orders";
const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub id: Uuid,
    /// Delivery status code, `1` to `4`
    pub status: String,
}

/// Order as listed on the orders page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub ordered_date: DateTime<Utc>,
    pub ordered: bool,
    pub delivery_status: DeliveryStatus,
    pub delivery_status_label: String,
    pub checkout_address_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
}

impl From<order::Model> for OrderView {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            start_date: model.start_date,
            ordered_date: model.ordered_date,
            ordered: model.ordered,
            delivery_status: model.delivery_status,
            delivery_status_label: model.delivery_status.label().to_string(),
            checkout_address_id: model.checkout_address_id,
            payment_id: model.payment_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SnapshotUser {
    pub first_name: String,
    pub last_name: String,
}

/// One entry of the latest-orders snapshot. Absent address or payment are
/// rendered as an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LatestOrder {
    pub id: Uuid,
    pub user: SnapshotUser,
    pub items: Vec<String>,
    pub start_date: String,
    pub ordered_date: String,
    pub ordered: bool,
    #[schema(value_type = Object)]
    pub checkout_address: Value,
    #[schema(value_type = Object)]
    pub payment: Value,
    pub delivery_status: DeliveryStatus,
}

fn address_json(address: Option<checkout_address::Model>) -> Value {
    match address {
        Some(a) => serde_json::json!({
            "street": a.street_address,
            "apartment": a.apartment_address,
            "country": a.country,
            "zip": a.zip,
            "phone": a.phone,
        }),
        None => Value::String(String::new()),
    }
}

fn payment_json(payment: Option<payment::Model>) -> Value {
    match payment {
        Some(p) => serde_json::json!({
            "transaction_id": p.transaction_id,
            "tx_ref": p.tx_ref,
            "pay_status": p.pay_status,
            "amount": p.amount,
        }),
        None => Value::String(String::new()),
    }
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Staff see every order, shoppers only their own. Newest first.
    #[instrument(skip(self, viewer), fields(user_id = %viewer.user_id))]
    pub async fn list_orders(&self, viewer: &AuthUser) -> Result<Vec<OrderView>, ServiceError> {
        let mut query = order::Entity::find().order_by_desc(order::Column::OrderedDate);
        if !viewer.is_staff() {
            query = query.filter(order::Column::UserId.eq(viewer.user_id));
        }

        let orders = query.all(&*self.db_pool).await?;
        debug!(count = orders.len(), "orders listed");
        Ok(orders.into_iter().map(OrderView::from).collect())
    }

    /// The open order with lines, totals and savings
    #[instrument(skip(self))]
    pub async fn order_summary(&self, user_id: Uuid) -> Result<OrderSummary, ServiceError> {
        open_order_summary(&*self.db_pool, user_id).await
    }

    /// The ten most recent orders in the snapshot shape pushed to the feed
    #[instrument(skip(self))]
    pub async fn latest_orders(&self) -> Result<Vec<LatestOrder>, ServiceError> {
        let db = &*self.db_pool;
        let orders = order::Entity::find()
            .order_by_desc(order::Column::OrderedDate)
            .limit(LATEST_ORDERS_LIMIT)
            .all(db)
            .await?;

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
        let address_ids: Vec<Uuid> = orders.iter().filter_map(|o| o.checkout_address_id).collect();
        let payment_ids: Vec<Uuid> = orders.iter().filter_map(|o| o.payment_id).collect();

        let users: HashMap<Uuid, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let addresses: HashMap<Uuid, checkout_address::Model> = checkout_address::Entity::find()
            .filter(checkout_address::Column::Id.is_in(address_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let payments: HashMap<Uuid, payment::Model> = payment::Entity::find()
            .filter(payment::Column::Id.is_in(payment_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut items_by_order: HashMap<Uuid, Vec<String>> = HashMap::new();
        let lines = order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .order_by_asc(order_item::Column::CreatedAt)
            .find_also_related(item::Entity)
            .all(db)
            .await?;
        for (line, item) in lines {
            if let Some(item) = item {
                items_by_order
                    .entry(line.order_id)
                    .or_default()
                    .push(format!("{} of {}", line.quantity, item.name));
            }
        }

        let mut snapshot = Vec::with_capacity(orders.len());
        for order in orders {
            let address = order.checkout_address_id.and_then(|id| addresses.get(&id).cloned());
            let payment = order.payment_id.and_then(|id| payments.get(&id).cloned());
            let user = users
                .get(&order.user_id)
                .map(|u| SnapshotUser {
                    first_name: u.first_name.clone(),
                    last_name: u.last_name.clone(),
                })
                .unwrap_or(SnapshotUser {
                    first_name: String::new(),
                    last_name: String::new(),
                });

            snapshot.push(LatestOrder {
                id: order.id,
                user,
                items: items_by_order.remove(&order.id).unwrap_or_default(),
                start_date: order.start_date.format(SNAPSHOT_TIME_FORMAT).to_string(),
                ordered_date: order.ordered_date.format(SNAPSHOT_TIME_FORMAT).to_string(),
                ordered: order.ordered,
                checkout_address: address_json(address),
                payment: payment_json(payment),
                delivery_status: order.delivery_status,
            });
        }

        Ok(snapshot)
    }

    /// Staff-only overwrite of an order's delivery status
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn update_status(
        &self,
        actor: &AuthUser,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderView, ServiceError> {
        actor.ensure_staff()?;

        let new_status = DeliveryStatus::from_code(&request.status).ok_or_else(|| {
            warn!(status = %request.status, "rejected unknown delivery status");
            ServiceError::InvalidStatus(format!(
                "Unknown delivery status '{}'; expected 1, 2, 3 or 4",
                request.status
            ))
        })?;

        let db = &*self.db_pool;
        let existing = order::Entity::find_by_id(request.id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", request.id)))?;

        let old_status = existing.delivery_status;
        let mut active = existing.into_active_model();
        active.delivery_status = Set(new_status);
        let updated = active.update(db).await?;

        info!(order_id = %updated.id, from = old_status.code(), to = new_status.code(), "delivery status updated");

        if let Some(sender) = &self.event_sender {
            sender
                .publish(Event::OrderStatusChanged {
                    order_id: updated.id,
                    old_status: old_status.code().to_string(),
                    new_status: new_status.code().to_string(),
                })
                .await;
        }

        Ok(OrderView::from(updated))
    }
}

/// Pushes a fresh latest-orders snapshot whenever an order is placed or its
/// status changes
pub struct OrderFeedPublisher {
    orders: OrderService,
    feed: Feed,
}

impl OrderFeedPublisher {
    pub fn new(orders: OrderService, feed: Feed) -> Self {
        Self { orders, feed }
    }
}

#[async_trait]
impl EventHandler for OrderFeedPublisher {
    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        if !event.affects_order_feed() {
            return Ok(());
        }
        if self.feed.subscriber_count() == 0 {
            debug!(topic = self.feed.topic(), "no subscribers, snapshot skipped");
            return Ok(());
        }

        let snapshot = self.orders.latest_orders().await.map_err(|e| e.to_string())?;
        let value = serde_json::to_value(&snapshot).map_err(|e| e.to_string())?;
        let reached = self.feed.publish(value);
        debug!(topic = self.feed.topic(), reached, "order snapshot pushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_address_and_payment_render_empty() {
        assert_eq!(address_json(None), Value::String(String::new()));
        assert_eq!(payment_json(None), Value::String(String::new()));
    }

    #[test]
    fn payment_snapshot_carries_reference_and_status() {
        let value = payment_json(Some(payment::Model {
            id: Uuid::new_v4(),
            transaction_id: "9001".into(),
            tx_ref: "ref-1".into(),
            pay_status: "Verification successful".into(),
            user_id: None,
            amount: dec!(21.00),
            timestamp: Utc::now(),
        }));
        assert_eq!(value["tx_ref"], "ref-1");
        assert_eq!(value["pay_status"], "Verification successful");
    }
}
