use std::fmt::Debug;

use cpg_common::{PaymentStatusType, Transition};
use log::*;
use serde_json::{json, Value};

use crate::{
    cpg_api::{
        errors::PaymentFlowError,
        payment_objects::{CreatedPayment, Requester},
    },
    db_types::{
        LogAction,
        LogOutcome,
        NewPayment,
        NewPaymentLog,
        Order,
        OrderNumber,
        Payment,
        PaymentLog,
        PaymentStatusUpdate,
        TransitionOutcome,
    },
    events::{EventProducers, OrderPaidEvent, PaymentRefundedEvent},
    helpers::new_payment_id,
    traits::{GatewayPaymentRequest, PaymentGateway, PaymentGatewayDatabase, PaymentGatewayError},
};

const MAX_PAYMENT_ID_ATTEMPTS: usize = 3;

/// `PaymentFlowApi` is the primary API for the payment lifecycle.
///
/// A payment is created synchronously with [`Self::create_payment`], and then reconciled with the provider along one
/// of two paths: signed notifications ([`Self::process_ipn`]) or polling ([`Self::check_payment_status`]). Both paths
/// funnel through the same forward-only transition rule, so duplicate, late or racing updates converge on the same
/// final state.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: PaymentGatewayDatabase,
    G: PaymentGateway,
{
    /// Starts a new payment attempt for an order.
    ///
    /// The payment is recorded locally as `pending` before the provider is called. If the provider call fails, the
    /// payment is marked `failed`, the order is left alone, and `GatewayUnavailable` is returned.
    pub async fn create_payment(
        &self,
        order_number: &OrderNumber,
        requester: &Requester,
        ip_address: Option<String>,
    ) -> Result<CreatedPayment, PaymentFlowError> {
        let order = self
            .db
            .fetch_order_by_order_number(order_number)
            .await?
            .ok_or_else(|| PaymentFlowError::OrderNotFound(order_number.to_string()))?;
        if order.user_id != requester.user_id {
            warn!("🔄️💳️ {} tried to pay for order {order_number}, which they do not own", requester.user_id);
            return Err(PaymentFlowError::Unauthorized);
        }
        if order.is_paid() {
            return Err(PaymentFlowError::AlreadyPaid(order_number.to_string()));
        }
        let (order, payment) = self.insert_payment(order_number, ip_address.clone()).await?;
        let request = GatewayPaymentRequest {
            payment_id: payment.payment_id.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            order_number: order.order_number.clone(),
            customer_email: requester.email.clone(),
        };
        let report = match self.gateway.create_payment(request).await {
            Ok(report) => report,
            Err(e) => {
                error!("🔄️💳️ Gateway could not create payment {} for order {order_number}. {e}", payment.payment_id);
                self.db.record_gateway_failure(&payment.payment_id, e.reason(), ip_address).await?;
                return Err(PaymentFlowError::GatewayUnavailable(e.reason().to_string()));
            },
        };
        let payment = self
            .db
            .record_gateway_created(&payment.payment_id, &report.transaction_id, report.raw.clone(), ip_address)
            .await?;
        info!(
            "🔄️💳️ Payment {} for order {order_number} created with gateway transaction {}",
            payment.payment_id, report.transaction_id
        );
        Ok(CreatedPayment { payment, gateway_data: report.raw })
    }

    async fn insert_payment(
        &self,
        order_number: &OrderNumber,
        ip_address: Option<String>,
    ) -> Result<(Order, Payment), PaymentFlowError> {
        let data = json!({ "order_id": order_number });
        let mut attempts = 0;
        loop {
            attempts += 1;
            let new_payment = NewPayment::new(new_payment_id(), order_number.clone());
            match self.db.create_payment_for_order(new_payment, data.clone(), ip_address.clone()).await {
                Err(PaymentGatewayError::PaymentAlreadyExists(id)) if attempts < MAX_PAYMENT_ID_ATTEMPTS => {
                    warn!("🔄️💳️ Payment id {id} is already taken. Trying again.");
                },
                result => return Ok(result?),
            }
        }
    }

    /// Handles an Instant Payment Notification from the provider.
    ///
    /// Nothing in the body is trusted until the signature has been verified. Missing or invalid signatures are
    /// rejected without touching the database. Once verified, the notification is always logged against the payment,
    /// whether or not it changes anything.
    pub async fn process_ipn(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        ip_address: Option<String>,
    ) -> Result<TransitionOutcome, PaymentFlowError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PaymentFlowError::ValidationError("Missing signature".into()))?;
        let body = serde_json::from_slice::<Value>(raw_body)
            .map_err(|e| PaymentFlowError::ValidationError(format!("Invalid JSON. {e}")))?;
        if !self.gateway.verify_signature(raw_body, signature) {
            warn!("🔄️🔔️ IPN with an invalid signature received from {}", ip_address.as_deref().unwrap_or("unknown"));
            return Err(PaymentFlowError::SignatureInvalid);
        }
        let report = self.gateway.parse_notification(&body)?;
        let payment = self
            .db
            .fetch_payment_by_transaction_id(&report.transaction_id)
            .await?
            .ok_or_else(|| PaymentFlowError::PaymentNotFound(report.transaction_id.clone()))?;
        if let Some(order_number) = &report.order_number {
            let order = self.db.fetch_order_by_id(payment.order_id).await?;
            if order.map(|o| o.order_number.as_str() != order_number).unwrap_or(true) {
                warn!(
                    "🔄️🔔️ IPN for transaction {} names order {order_number}, but payment {} belongs to another order",
                    report.transaction_id, payment.payment_id
                );
                return Err(PaymentFlowError::OrderNotFound(order_number.clone()));
            }
        }
        debug!(
            "🔄️🔔️ IPN for payment {} reports {} ({})",
            payment.payment_id, report.provider_status, report.status
        );
        let update = PaymentStatusUpdate {
            payment_id: payment.payment_id,
            new_status: report.status,
            action: LogAction::Webhook,
            data: body,
            ip_address,
        };
        let outcome = self.db.apply_status_update(update).await?;
        self.publish_events(&outcome).await;
        Ok(outcome)
    }

    /// Returns the payment, reconciling it with the provider first if it is still in flight.
    pub async fn check_payment_status(
        &self,
        payment_id: &str,
        requester: &Requester,
        ip_address: Option<String>,
    ) -> Result<Payment, PaymentFlowError> {
        let (payment, _) = self.fetch_payment_for(payment_id, requester).await?;
        self.reconcile_payment(payment, ip_address).await
    }

    /// Polls the provider for the current status of the payment and applies it.
    ///
    /// Terminal payments, and payments the provider never accepted, are returned as they are with no provider call
    /// and no writes. If the provider cannot be reached, an `error` entry is logged and the payment is returned
    /// unchanged.
    pub async fn reconcile_payment(
        &self,
        payment: Payment,
        ip_address: Option<String>,
    ) -> Result<Payment, PaymentFlowError> {
        if payment.is_terminal() {
            trace!("🔄️🔎️ Payment {} is {}. Not polling the gateway.", payment.payment_id, payment.status);
            return Ok(payment);
        }
        let transaction_id = match &payment.transaction_id {
            Some(t) => t.clone(),
            None => {
                trace!("🔄️🔎️ Payment {} has no gateway transaction. Not polling the gateway.", payment.payment_id);
                return Ok(payment);
            },
        };
        let report = match self.gateway.check_status(&transaction_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!("🔄️🔎️ Could not poll gateway for payment {}. {e}", payment.payment_id);
                let log =
                    NewPaymentLog::new(&payment.payment_id, LogAction::Error, payment.status, LogOutcome::Error)
                        .with_data(json!({ "error": e.to_string(), "transaction_id": transaction_id }))
                        .with_ip_address(ip_address);
                self.db.append_log(log).await?;
                return Ok(payment);
            },
        };
        let update = PaymentStatusUpdate {
            payment_id: payment.payment_id.clone(),
            new_status: report.status,
            action: LogAction::StatusCheck,
            data: report.raw,
            ip_address,
        };
        let outcome = self.db.apply_status_update(update).await?;
        self.publish_events(&outcome).await;
        Ok(outcome.payment)
    }

    /// Refunds a completed payment. Any other payment status results in `InvalidTransition`.
    ///
    /// This only records the refund. Returning the funds is done with the provider directly.
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        requester: &Requester,
        reason: Option<String>,
        ip_address: Option<String>,
    ) -> Result<Payment, PaymentFlowError> {
        if !requester.is_staff {
            return Err(PaymentFlowError::Unauthorized);
        }
        let payment = self
            .db
            .fetch_payment_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| PaymentFlowError::PaymentNotFound(payment_id.to_string()))?;
        let to = PaymentStatusType::Refunded;
        if payment.status.transition_to(to) != Transition::Apply {
            return Err(PaymentFlowError::InvalidTransition { from: payment.status, to });
        }
        let update = PaymentStatusUpdate {
            payment_id: payment_id.to_string(),
            new_status: to,
            action: LogAction::Refund,
            data: json!({ "refunded_by": requester.user_id, "reason": reason }),
            ip_address,
        };
        let outcome = self.db.apply_status_update(update).await?;
        if !outcome.transition.is_applied() {
            // Another update got to the payment first
            return Err(PaymentFlowError::InvalidTransition { from: outcome.payment.status, to });
        }
        info!("🔄️💸️ Payment {payment_id} has been refunded by {}", requester.user_id);
        self.publish_events(&outcome).await;
        Ok(outcome.payment)
    }

    pub async fn payment_logs(
        &self,
        payment_id: &str,
        requester: &Requester,
    ) -> Result<Vec<PaymentLog>, PaymentFlowError> {
        let (payment, _) = self.fetch_payment_for(payment_id, requester).await?;
        let logs = self.db.fetch_logs_for_payment(&payment.payment_id).await?;
        Ok(logs)
    }

    pub async fn payments_for_order(
        &self,
        order_number: &OrderNumber,
        requester: &Requester,
    ) -> Result<Vec<Payment>, PaymentFlowError> {
        let order = self
            .db
            .fetch_order_by_order_number(order_number)
            .await?
            .ok_or_else(|| PaymentFlowError::OrderNotFound(order_number.to_string()))?;
        if !requester.can_access(&order.user_id) {
            return Err(PaymentFlowError::Unauthorized);
        }
        let payments = self.db.fetch_payments_for_order(order_number).await?;
        Ok(payments)
    }

    async fn fetch_payment_for(
        &self,
        payment_id: &str,
        requester: &Requester,
    ) -> Result<(Payment, Order), PaymentFlowError> {
        let payment = self
            .db
            .fetch_payment_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| PaymentFlowError::PaymentNotFound(payment_id.to_string()))?;
        let order = self
            .db
            .fetch_order_by_id(payment.order_id)
            .await?
            .ok_or_else(|| PaymentFlowError::OrderNotFound(format!("id {}", payment.order_id)))?;
        if !requester.can_access(&order.user_id) {
            warn!("🔄️ {} tried to access payment {payment_id}, which they do not own", requester.user_id);
            return Err(PaymentFlowError::Unauthorized);
        }
        Ok((payment, order))
    }

    async fn publish_events(&self, outcome: &TransitionOutcome) {
        if outcome.order_paid {
            for emitter in &self.producers.order_paid_producer {
                debug!("🔄️📦️ Notifying order paid hook subscribers");
                emitter.publish_event(OrderPaidEvent::new(outcome.order.clone(), outcome.payment.clone())).await;
            }
        }
        if outcome.transition.is_applied() && outcome.payment.status == PaymentStatusType::Refunded {
            for emitter in &self.producers.payment_refunded_producer {
                debug!("🔄️💸️ Notifying payment refunded hook subscribers");
                emitter
                    .publish_event(PaymentRefundedEvent::new(outcome.order.clone(), outcome.payment.clone()))
                    .await;
            }
        }
    }
}
