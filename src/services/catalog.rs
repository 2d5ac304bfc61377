use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{deal, item, stock, ItemCategory, ItemLabel, Packaging},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("amount must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Product fields accepted on create and update
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ItemRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom = "non_negative")]
    pub discount_price: Option<Decimal>,
    pub category: ItemCategory,
    pub label: ItemLabel,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[validate(range(min = 0))]
    pub initial_stock: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub topup_stock: i32,
    /// Defaults to the total stock on create and is left alone on update
    #[serde(default)]
    #[validate(range(min = 0))]
    pub current_stock: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DealRequest {
    pub item_id: Uuid,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(default)]
    pub packaging: Packaging,
    #[validate(range(min = 0))]
    pub deal: i32,
    #[validate(length(min = 1, max = 50))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StockRequest {
    pub item_id: Uuid,
    #[validate(range(min = 0))]
    pub initial_stock: i32,
    #[validate(range(min = 0))]
    pub current_stock: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DealView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub price: Decimal,
    pub packaging: Packaging,
    pub deal: i32,
    pub title: String,
    pub description: String,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<deal::Model> for DealView {
    fn from(m: deal::Model) -> Self {
        Self {
            id: m.id,
            item_id: m.item_id,
            price: m.price,
            packaging: m.packaging,
            deal: m.deal,
            title: m.title,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub initial_stock: i32,
    pub current_stock: i32,
}

impl From<stock::Model> for StockView {
    fn from(m: stock::Model) -> Self {
        Self {
            id: m.id,
            item_id: m.item_id,
            initial_stock: m.initial_stock,
            current_stock: m.current_stock,
        }
    }
}

/// Landing page content
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HomePage {
    pub deal: Option<DealView>,
    pub items: Vec<item::Model>,
}

#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<item::Model>, ServiceError> {
        Ok(item::Entity::find()
            .order_by_desc(item::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, id: Uuid) -> Result<item::Model, ServiceError> {
        item::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn home(&self) -> Result<HomePage, ServiceError> {
        let deal = deal::Entity::find()
            .order_by_desc(deal::Column::CreatedAt)
            .one(&*self.db_pool)
            .await?;
        Ok(HomePage {
            deal: deal.map(DealView::from),
            items: self.list_items().await?,
        })
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id))]
    pub async fn create_item(
        &self,
        actor: &AuthUser,
        request: ItemRequest,
    ) -> Result<item::Model, ServiceError> {
        actor.ensure_staff()?;
        request.validate()?;

        let now = Utc::now();
        let current = request
            .current_stock
            .unwrap_or(request.initial_stock + request.topup_stock);

        // total_stock is filled in by the entity's before_save hook
        let saved = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            price: Set(request.price),
            discount_price: Set(request.discount_price),
            category: Set(request.category),
            label: Set(request.label),
            description: Set(request.description),
            image: Set(request
                .image
                .unwrap_or_else(|| item::DEFAULT_IMAGE.to_string())),
            initial_stock: Set(request.initial_stock),
            topup_stock: Set(request.topup_stock),
            total_stock: Set(0),
            current_stock: Set(current),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(item_id = %saved.id, total_stock = saved.total_stock, "item created");
        self.publish(Event::ItemSaved(saved.id)).await;
        Ok(saved)
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id))]
    pub async fn update_item(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: ItemRequest,
    ) -> Result<item::Model, ServiceError> {
        actor.ensure_staff()?;
        request.validate()?;

        let existing = self.get_item(id).await?;
        let mut active = existing.into_active_model();
        active.name = Set(request.name);
        active.price = Set(request.price);
        active.discount_price = Set(request.discount_price);
        active.category = Set(request.category);
        active.label = Set(request.label);
        active.description = Set(request.description);
        if let Some(image) = request.image {
            active.image = Set(image);
        }
        active.initial_stock = Set(request.initial_stock);
        active.topup_stock = Set(request.topup_stock);
        if let Some(current) = request.current_stock {
            active.current_stock = Set(current);
        }

        let saved = active.update(&*self.db_pool).await?;
        info!(item_id = %saved.id, total_stock = saved.total_stock, "item updated");
        self.publish(Event::ItemSaved(saved.id)).await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn list_deals(&self) -> Result<Vec<DealView>, ServiceError> {
        let deals = deal::Entity::find()
            .order_by_desc(deal::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(deals.into_iter().map(DealView::from).collect())
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id))]
    pub async fn create_deal(
        &self,
        actor: &AuthUser,
        request: DealRequest,
    ) -> Result<DealView, ServiceError> {
        actor.ensure_staff()?;
        request.validate()?;
        self.get_item(request.item_id).await?;

        let saved = deal::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(request.item_id),
            price: Set(request.price),
            packaging: Set(request.packaging),
            deal: Set(request.deal),
            title: Set(request.title),
            description: Set(request.description),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(deal_id = %saved.id, item_id = %saved.item_id, "deal created");
        Ok(saved.into())
    }

    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn list_stock(&self, actor: &AuthUser) -> Result<Vec<StockView>, ServiceError> {
        actor.ensure_staff()?;
        let rows = stock::Entity::find().all(&*self.db_pool).await?;
        Ok(rows.into_iter().map(StockView::from).collect())
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id))]
    pub async fn create_stock(
        &self,
        actor: &AuthUser,
        request: StockRequest,
    ) -> Result<StockView, ServiceError> {
        actor.ensure_staff()?;
        request.validate()?;
        self.get_item(request.item_id).await?;

        let saved = stock::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(request.item_id),
            initial_stock: Set(request.initial_stock),
            current_stock: Set(request.current_stock),
        }
        .insert(&*self.db_pool)
        .await?;
        Ok(saved.into())
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.publish(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_prices_fail_validation() {
        let request = ItemRequest {
            name: "Honey 1L".into(),
            price: dec!(-1),
            discount_price: None,
            category: ItemCategory::Honey,
            label: ItemLabel::New,
            description: String::new(),
            image: None,
            initial_stock: 3,
            topup_stock: 0,
            current_stock: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn deal_title_is_limited() {
        let request = DealRequest {
            item_id: Uuid::new_v4(),
            price: dec!(5),
            packaging: Packaging::Bottle,
            deal: 10,
            title: "x".repeat(51),
            description: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
