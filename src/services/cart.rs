use crate::{
    db::DbPool,
    entities::{item, order_item},
    errors::ServiceError,
    events::{Event, EventSender},
    services::open_order::{find_open_order, open_or_create},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const ORDER_SUMMARY_PATH: &str = "/api/v1/order-summary";

pub fn product_path(item_id: Uuid) -> String {
    format!("/api/v1/items/{}", item_id)
}

/// What a cart mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CartOutcome {
    ItemAdded,
    QuantityIncreased,
    ItemRemoved,
    QuantityUpdated,
    OutOfStock,
    NoOpenOrder,
    ItemNotInCart,
}

/// Outcome of a cart mutation with the message and the path to show next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartNotice {
    pub outcome: CartOutcome,
    pub message: String,
    pub next: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

impl CartNotice {
    fn new(outcome: CartOutcome, message: impl Into<String>, next: String) -> Self {
        Self {
            outcome,
            message: message.into(),
            next,
            order_id: None,
        }
    }

    fn for_order(mut self, order_id: Uuid) -> Self {
        self.order_id = Some(order_id);
        self
    }

    fn then_summary(mut self) -> Self {
        self.next = ORDER_SUMMARY_PATH.to_string();
        self
    }

    fn out_of_stock(item_id: Uuid) -> Self {
        Self::new(CartOutcome::OutOfStock, "Item out of stock", product_path(item_id))
    }

    fn no_open_order(item_id: Uuid) -> Self {
        Self::new(
            CartOutcome::NoOpenOrder,
            "You do not have an Order",
            product_path(item_id),
        )
    }

    fn not_in_cart(item_id: Uuid) -> Self {
        Self::new(
            CartOutcome::ItemNotInCart,
            "This Item not in your cart",
            product_path(item_id),
        )
    }
}

/// Cart mutations. Each runs in one transaction covering the line and the
/// item's stock counter.
#[derive(Clone)]
pub struct CartService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CartService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, user_id: Uuid, item_id: Uuid) -> Result<CartNotice, ServiceError> {
        let txn = self.db_pool.begin().await?;
        fetch_item(&txn, item_id).await?;

        // Claim one unit first; zero rows means nothing left to sell
        let claimed = item::Entity::update_many()
            .col_expr(
                item::Column::CurrentStock,
                Expr::col(item::Column::CurrentStock).sub(1),
            )
            .filter(item::Column::Id.eq(item_id))
            .filter(item::Column::CurrentStock.gt(0))
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            info!(%item_id, "add to cart refused: out of stock");
            return Ok(CartNotice::out_of_stock(item_id));
        }

        let (order, created) = open_or_create(&txn, user_id).await?;
        let existing = find_line(&txn, user_id, order.id, item_id).await?;

        let outcome = match existing {
            Some(line) => {
                order_item::Entity::update_many()
                    .col_expr(
                        order_item::Column::Quantity,
                        Expr::col(order_item::Column::Quantity).add(1),
                    )
                    .filter(order_item::Column::Id.eq(line.id))
                    .exec(&txn)
                    .await?;
                CartOutcome::QuantityIncreased
            }
            None => {
                order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    order_id: Set(order.id),
                    item_id: Set(item_id),
                    quantity: Set(1),
                    ordered: Set(false),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
                CartOutcome::ItemAdded
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, %item_id, "Failed to commit add to cart");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order.id, created_order = created, ?outcome, "cart updated");
        self.publish(user_id, order.id, item_id).await;

        let message = match outcome {
            CartOutcome::QuantityIncreased => "Added quantity Item",
            _ => "Item added to your cart",
        };
        Ok(CartNotice::new(outcome, message, ORDER_SUMMARY_PATH.to_string()).for_order(order.id))
    }

    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartNotice, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let item = fetch_item(&txn, item_id).await?;

        let Some(order) = find_open_order(&txn, user_id).await? else {
            return Ok(CartNotice::no_open_order(item_id));
        };
        let Some(line) = find_line(&txn, user_id, order.id, item_id).await? else {
            return Ok(CartNotice::not_in_cart(item_id));
        };

        let quantity = line.quantity;
        // A concurrent removal may have deleted the line since it was read
        if !delete_line(&txn, line.id).await? {
            return Ok(CartNotice::not_in_cart(item_id));
        }
        restore_stock(&txn, item_id, quantity).await?;
        txn.commit().await?;

        info!(order_id = %order.id, quantity, "line removed from cart");
        self.publish(user_id, order.id, item_id).await;

        Ok(CartNotice::new(
            CartOutcome::ItemRemoved,
            format!("Item \"{}\" remove from your cart", item.name),
            ORDER_SUMMARY_PATH.to_string(),
        )
        .for_order(order.id))
    }

    #[instrument(skip(self))]
    pub async fn decrement_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartNotice, ServiceError> {
        let txn = self.db_pool.begin().await?;
        fetch_item(&txn, item_id).await?;

        let Some(order) = find_open_order(&txn, user_id).await? else {
            return Ok(CartNotice::no_open_order(item_id).then_summary());
        };
        let Some(line) = find_line(&txn, user_id, order.id, item_id).await? else {
            return Ok(CartNotice::not_in_cart(item_id).then_summary());
        };

        let restored = if decrement_line(&txn, line.id).await? {
            1
        } else if delete_line(&txn, line.id).await? {
            line.quantity
        } else {
            return Ok(CartNotice::not_in_cart(item_id).then_summary());
        };
        restore_stock(&txn, item_id, restored).await?;
        txn.commit().await?;

        info!(order_id = %order.id, restored, "cart line decremented");
        self.publish(user_id, order.id, item_id).await;

        Ok(CartNotice::new(
            CartOutcome::QuantityUpdated,
            "Item quantity was updated",
            ORDER_SUMMARY_PATH.to_string(),
        )
        .for_order(order.id))
    }

    async fn publish(&self, user_id: Uuid, order_id: Uuid, item_id: Uuid) {
        if let Some(sender) = &self.event_sender {
            sender
                .publish(Event::CartUpdated {
                    user_id,
                    order_id,
                    item_id,
                })
                .await;
        }
    }
}

async fn fetch_item<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> Result<item::Model, ServiceError> {
    item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
}

/// Open line for the item, locked until the transaction ends
async fn find_line<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_id: Uuid,
    item_id: Uuid,
) -> Result<Option<order_item::Model>, ServiceError> {
    Ok(order_item::Entity::find()
        .filter(order_item::Column::UserId.eq(user_id))
        .filter(order_item::Column::OrderId.eq(order_id))
        .filter(order_item::Column::ItemId.eq(item_id))
        .filter(order_item::Column::Ordered.eq(false))
        .lock_exclusive()
        .one(conn)
        .await?)
}

/// Takes one unit off a line holding more than one; false when nothing matched
async fn decrement_line<C: ConnectionTrait>(conn: &C, line_id: Uuid) -> Result<bool, ServiceError> {
    let result = order_item::Entity::update_many()
        .col_expr(
            order_item::Column::Quantity,
            Expr::col(order_item::Column::Quantity).sub(1),
        )
        .filter(order_item::Column::Id.eq(line_id))
        .filter(order_item::Column::Quantity.gt(1))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn delete_line<C: ConnectionTrait>(conn: &C, line_id: Uuid) -> Result<bool, ServiceError> {
    let result = order_item::Entity::delete_many()
        .filter(order_item::Column::Id.eq(line_id))
        .filter(order_item::Column::Ordered.eq(false))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn restore_stock<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    item::Entity::update_many()
        .col_expr(
            item::Column::CurrentStock,
            Expr::col(item::Column::CurrentStock).add(quantity),
        )
        .filter(item::Column::Id.eq(item_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_point_back_to_the_product() {
        let item_id = Uuid::new_v4();
        let notice = CartNotice::out_of_stock(item_id);
        assert_eq!(notice.outcome, CartOutcome::OutOfStock);
        assert_eq!(notice.next, format!("/api/v1/items/{}", item_id));

        assert_eq!(CartNotice::no_open_order(item_id).message, "You do not have an Order");
        assert_eq!(CartNotice::not_in_cart(item_id).message, "This Item not in your cart");
    }

    #[test]
    fn decrement_fallbacks_go_to_the_summary() {
        let item_id = Uuid::new_v4();
        let notice = CartNotice::no_open_order(item_id).then_summary();
        assert_eq!(notice.outcome, CartOutcome::NoOpenOrder);
        assert_eq!(notice.next, ORDER_SUMMARY_PATH);
    }

    #[test]
    fn outcome_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CartOutcome::QuantityIncreased).unwrap(),
            "\"quantity_increased\""
        );
    }
}
