use crate::{
    db::DbPool,
    entities::{order, order_item, payment},
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{ChargeRequest, PaymentGateways, VerificationGateway},
    services::open_order::{
        find_open_order, minor_units, order_lines, order_total, require_open_order,
        NO_ORDER_MESSAGE,
    },
    services::checkout::{PaymentMethod, PaymentStart},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const CARD_SUCCESS_MESSAGE: &str = "Success make an order";
pub const REDIRECT_SUCCESS_MESSAGE: &str = "Your order was successful";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CardChargeForm {
    #[validate(length(min = 1, message = "stripe_token is required"))]
    pub stripe_token: String,
}

/// Query string a provider redirects back with
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompletePaymentQuery {
    /// Paystack transaction reference
    pub reference: Option<String>,
    /// Flutterwave transaction reference
    pub tx_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyPaymentQuery {
    pub tx_ref: Option<String>,
    pub status: Option<String>,
    pub transaction_id: Option<String>,
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PaymentOutcome {
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub transaction_id: String,
    pub tx_ref: String,
    pub pay_status: String,
    pub amount: Decimal,
    pub message: String,
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VerificationReport {
    pub verified: bool,
    pub message: String,
}

struct NewPayment {
    transaction_id: String,
    tx_ref: String,
    pay_status: String,
    amount: Decimal,
}

/// Confirms payments with the gateways and finalizes orders
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    gateways: PaymentGateways,
    currency: String,
    flutterwave_public_key: Option<String>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        gateways: PaymentGateways,
        currency: String,
        flutterwave_public_key: Option<String>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            gateways,
            currency,
            flutterwave_public_key,
            event_sender,
        }
    }

    /// Open order total for a payment page
    #[instrument(skip(self))]
    pub async fn payment_start(
        &self,
        user_id: Uuid,
        method: PaymentMethod,
    ) -> Result<PaymentStart, ServiceError> {
        let db = &*self.db_pool;
        let order = require_open_order(db, user_id).await?;
        let lines = order_lines(db, order.id).await?;

        Ok(PaymentStart {
            order_id: order.id,
            payment_method: method,
            total: order_total(&lines),
            currency: self.currency.clone(),
            public_key: match method {
                PaymentMethod::Flutterwave => self.flutterwave_public_key.clone(),
                _ => None,
            },
        })
    }

    /// Charges the open order's total to a card token
    #[instrument(skip(self, form))]
    pub async fn charge_card(
        &self,
        user_id: Uuid,
        form: CardChargeForm,
    ) -> Result<PaymentOutcome, ServiceError> {
        form.validate()?;
        let db = &*self.db_pool;
        let order = require_open_order(db, user_id).await?;
        let lines = order_lines(db, order.id).await?;
        let total = order_total(&lines);

        let request = ChargeRequest {
            amount_minor: minor_units(total)?,
            currency: self.currency.clone(),
            source: form.stripe_token,
        };

        let charge = match self.gateways.card.charge(request).await {
            Ok(charge) => charge,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "card charge failed");
                self.publish(Event::PaymentFailed {
                    user_id,
                    reason: e.to_string(),
                })
                .await;
                return Err(e.into());
            }
        };

        let new_payment = NewPayment {
            transaction_id: charge.id.clone(),
            tx_ref: charge.id,
            pay_status: charge.status,
            amount: total,
        };

        self.finalize(user_id, order.id, new_payment, CARD_SUCCESS_MESSAGE)
            .await
    }

    /// Verifies a redirect callback (`reference` for Paystack, `tx_ref` for
    /// Flutterwave) and finalizes the order
    #[instrument(skip(self))]
    pub async fn complete_payment(
        &self,
        user_id: Uuid,
        query: CompletePaymentQuery,
    ) -> Result<PaymentOutcome, ServiceError> {
        let (gateway, reference) = self.select_gateway(&query)?;

        let verified = gateway.verify(&reference).await.map_err(|e| {
            warn!(provider = gateway.provider(), error = %e, "payment verification failed");
            ServiceError::PaymentFailed(e.verification_message())
        })?;

        let order_id = self.order_for_payment(user_id, &verified.reference).await?;

        let new_payment = NewPayment {
            transaction_id: verified.transaction_id,
            tx_ref: verified.reference,
            pay_status: verified.status,
            amount: verified.amount,
        };

        self.finalize(user_id, order_id, new_payment, REDIRECT_SUCCESS_MESSAGE)
            .await
    }

    /// Re-verifies a Flutterwave transaction without touching any order
    #[instrument(skip(self))]
    pub async fn verify_only(&self, query: VerifyPaymentQuery) -> Result<VerificationReport, ServiceError> {
        let tx_ref = query
            .tx_ref
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ServiceError::InvalidInput("tx_ref is required".to_string()))?;
        let status = query.status.unwrap_or_default();
        debug!(%tx_ref, transaction_id = ?query.transaction_id, %status, "verifying payment");

        let report = match self.gateways.flutterwave.verify(&tx_ref).await {
            Ok(_) => VerificationReport {
                verified: true,
                message: format!("Payment {}", status),
            },
            Err(e) => {
                warn!(%tx_ref, error = %e, "verification check failed");
                VerificationReport {
                    verified: false,
                    message: format!("Payment {} {}", status, e.verification_message()),
                }
            }
        };
        Ok(report)
    }

    fn select_gateway(
        &self,
        query: &CompletePaymentQuery,
    ) -> Result<(Arc<dyn VerificationGateway>, String), ServiceError> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        if let Some(reference) = non_empty(&query.reference) {
            return Ok((self.gateways.paystack.clone(), reference));
        }
        if let Some(tx_ref) = non_empty(&query.tx_ref) {
            return Ok((self.gateways.flutterwave.clone(), tx_ref));
        }
        Err(ServiceError::InvalidInput(
            "A payment reference or tx_ref is required".to_string(),
        ))
    }

    /// The open order, or for a replayed callback the finalized order that
    /// already carries a payment with the same reference
    async fn order_for_payment(&self, user_id: Uuid, tx_ref: &str) -> Result<Uuid, ServiceError> {
        let db = &*self.db_pool;
        if let Some(open) = find_open_order(db, user_id).await? {
            return Ok(open.id);
        }

        let earlier: Vec<Uuid> = payment::Entity::find()
            .filter(payment::Column::TxRef.eq(tx_ref))
            .filter(payment::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        if earlier.is_empty() {
            return Err(ServiceError::NotFound(NO_ORDER_MESSAGE.to_string()));
        }

        let replayed = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::Ordered.eq(true))
            .filter(order::Column::PaymentId.is_in(earlier))
            .order_by_desc(order::Column::OrderedDate)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(NO_ORDER_MESSAGE.to_string()))?;

        info!(order_id = %replayed.id, %tx_ref, "replayed payment callback for finalized order");
        Ok(replayed.id)
    }

    async fn finalize(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        new_payment: NewPayment,
        message: &str,
    ) -> Result<PaymentOutcome, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(NO_ORDER_MESSAGE.to_string()))?;

        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(new_payment.transaction_id),
            tx_ref: Set(new_payment.tx_ref),
            pay_status: Set(new_payment.pay_status),
            user_id: Set(Some(user_id)),
            amount: Set(new_payment.amount),
            timestamp: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let mut active = order.into_active_model();
        active.ordered = Set(true);
        active.payment_id = Set(Some(payment.id));
        active.update(&txn).await?;

        flag_lines_ordered(&txn, order_id).await?;
        txn.commit().await?;

        info!(%order_id, payment_id = %payment.id, amount = %payment.amount, "order finalized");

        self.publish(Event::PaymentRecorded {
            payment_id: payment.id,
            tx_ref: payment.tx_ref.clone(),
            amount: payment.amount,
        })
        .await;
        self.publish(Event::OrderPlaced {
            order_id,
            payment_id: payment.id,
        })
        .await;

        Ok(PaymentOutcome {
            order_id,
            payment_id: payment.id,
            transaction_id: payment.transaction_id,
            tx_ref: payment.tx_ref,
            pay_status: payment.pay_status,
            amount: payment.amount,
            message: message.to_string(),
            next: "/api/v1/".to_string(),
        })
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.publish(event).await;
        }
    }
}

async fn flag_lines_ordered<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> Result<(), ServiceError> {
    order_item::Entity::update_many()
        .col_expr(order_item::Column::Ordered, Expr::value(true))
        .filter(order_item::Column::OrderId.eq(order_id))
        .exec(conn)
        .await?;
    Ok(())
}
