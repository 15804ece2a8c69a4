//! Connects the payment engine to NOWPayments.
use futures::future::BoxFuture;
use log::*;
use nowpayments_tools::{GatewayPayment, IpnNotification, NowPaymentsApi, NowPaymentsApiError, PaymentRequest};
use payment_engine::{
    events::{EventHandlers, EventHooks, OrderPaidEvent, PaymentRefundedEvent},
    traits::{GatewayError, GatewayPaymentReport, GatewayPaymentRequest, PaymentGateway},
};
use serde_json::Value;

pub const PAYMENT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone)]
pub struct NowPaymentsGateway {
    api: NowPaymentsApi,
}

impl NowPaymentsGateway {
    pub fn new(api: NowPaymentsApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &NowPaymentsApi {
        &self.api
    }
}

fn to_report(payment: GatewayPayment) -> GatewayPaymentReport {
    GatewayPaymentReport {
        status: payment.payment_status.to_local(),
        provider_status: payment.payment_status.to_string(),
        transaction_id: payment.payment_id,
        order_number: payment.order_id,
        raw: payment.raw,
    }
}

fn unavailable(e: NowPaymentsApiError) -> GatewayError {
    GatewayError::Unavailable(e.to_string())
}

impl PaymentGateway for NowPaymentsGateway {
    async fn create_payment(&self, request: GatewayPaymentRequest) -> Result<GatewayPaymentReport, GatewayError> {
        let request = PaymentRequest {
            payment_id: request.payment_id,
            amount: request.amount,
            currency: request.currency,
            order_id: Some(request.order_number.to_string()),
            customer_email: request.customer_email,
        };
        let payment = self.api.create_payment(&request).await.map_err(unavailable)?;
        Ok(to_report(payment))
    }

    async fn check_status(&self, transaction_id: &str) -> Result<GatewayPaymentReport, GatewayError> {
        let payment = self.api.payment_status(transaction_id).await.map_err(unavailable)?;
        Ok(to_report(payment))
    }

    fn verify_signature(&self, raw_body: &[u8], signature: &str) -> bool {
        self.api.verify_ipn_signature(raw_body, signature)
    }

    fn parse_notification(&self, body: &Value) -> Result<GatewayPaymentReport, GatewayError> {
        let ipn = IpnNotification::from_json(body).map_err(|e| GatewayError::InvalidNotification(e.to_string()))?;
        Ok(GatewayPaymentReport {
            status: ipn.payment_status.to_local(),
            provider_status: ipn.payment_status.to_string(),
            transaction_id: ipn.payment_id,
            order_number: ipn.order_id,
            raw: body.clone(),
        })
    }
}

/// Hooks that record settled and refunded orders in the server log.
///
/// Merchants that need to react to paid orders (fulfilment, emails, and so on) add their own hooks alongside these.
pub fn create_payment_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev: OrderPaidEvent| -> BoxFuture<'static, ()> {
        Box::pin(async move {
            info!(
                "📦️ Order {} has been paid in full by payment {} ({} {})",
                ev.order.order_number, ev.payment.payment_id, ev.payment.amount, ev.payment.currency
            );
        })
    });
    hooks.on_payment_refunded(|ev: PaymentRefundedEvent| -> BoxFuture<'static, ()> {
        Box::pin(async move {
            info!("💸️ Payment {} for order {} has been refunded", ev.payment.payment_id, ev.order.order_number);
        })
    });
    EventHandlers::new(PAYMENT_EVENT_BUFFER_SIZE, hooks)
}
