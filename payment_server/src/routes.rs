//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: the payment rules live in
//! [`payment_engine::PaymentFlowApi`], and handlers only translate between HTTP and the engine.
//!
//! Since each worker thread processes its requests sequentially, handlers must never block the current thread. Every
//! database or gateway call is awaited.
use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use nowpayments_tools::SIGNATURE_HEADER;
use payment_engine::{
    db_types::OrderNumber,
    traits::{PaymentGateway, PaymentGatewayDatabase},
    PaymentFlowApi,
    PaymentFlowError,
};

use crate::{
    auth::JwtClaims,
    config::ServerOptions,
    data_objects::{CreatePaymentRequest, CreatePaymentResponse, JsonResponse, PaymentStatusResponse, RefundRequest},
    errors::ServerError,
    helpers::remote_ip_for_log,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

type FlowApi<B, G> = web::Data<PaymentFlowApi<B, G>>;

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_payment => Post "/payments/create" impl PaymentGatewayDatabase, PaymentGateway);
/// Starts a new payment attempt for one of the caller's orders.
///
/// The body is `{"order_id": "<order number>"}`. On success the response is `201 Created` with the new payment id, its
/// status (always `pending`) and the provider's response, which carries the deposit address the customer must pay.
pub async fn create_payment<B, G>(
    req: HttpRequest,
    claims: JwtClaims,
    body: web::Json<CreatePaymentRequest>,
    options: web::Data<ServerOptions>,
    api: FlowApi<B, G>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    G: PaymentGateway,
{
    let order_number = OrderNumber::from_str(&body.order_id)
        .map_err(|e| PaymentFlowError::ValidationError(format!("order_id is required. {e}")))?;
    debug!("💻️ POST create payment for order {order_number} by {}", claims.sub);
    let ip = remote_ip_for_log(&req, &options);
    let created = api.create_payment(&order_number, &claims.requester(), ip).await?;
    Ok(HttpResponse::Created().json(CreatePaymentResponse::from(created)))
}

route!(payment_status => Get "/payments/{payment_id}/status" impl PaymentGatewayDatabase, PaymentGateway);
/// Returns the current status of a payment. Payments that are still in flight are reconciled with the provider first.
pub async fn payment_status<B, G>(
    req: HttpRequest,
    claims: JwtClaims,
    path: web::Path<String>,
    options: web::Data<ServerOptions>,
    api: FlowApi<B, G>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    G: PaymentGateway,
{
    let payment_id = path.into_inner();
    debug!("💻️ GET status of payment {payment_id} for {}", claims.sub);
    let ip = remote_ip_for_log(&req, &options);
    let payment = api.check_payment_status(&payment_id, &claims.requester(), ip).await?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(payment)))
}

route!(payment_logs => Get "/payments/{payment_id}/logs" impl PaymentGatewayDatabase, PaymentGateway);
pub async fn payment_logs<B, G>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: FlowApi<B, G>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    G: PaymentGateway,
{
    let payment_id = path.into_inner();
    debug!("💻️ GET audit log of payment {payment_id} for {}", claims.sub);
    let logs = api.payment_logs(&payment_id, &claims.requester()).await?;
    Ok(HttpResponse::Ok().json(logs))
}

route!(order_payments => Get "/orders/{order_number}/payments" impl PaymentGatewayDatabase, PaymentGateway);
pub async fn order_payments<B, G>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: FlowApi<B, G>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    G: PaymentGateway,
{
    let order_number = OrderNumber::from_str(&path.into_inner())
        .map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
    debug!("💻️ GET payments for order {order_number} for {}", claims.sub);
    let payments = api.payments_for_order(&order_number, &claims.requester()).await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(refund_payment => Post "/admin/payments/{payment_id}/refund" impl PaymentGatewayDatabase, PaymentGateway);
/// Staff only. Records that a completed payment has been refunded with the provider.
///
/// The body is optional. When present, it may carry a `reason` that is kept in the audit log.
pub async fn refund_payment<B, G>(
    req: HttpRequest,
    claims: JwtClaims,
    path: web::Path<String>,
    body: Option<web::Json<RefundRequest>>,
    options: web::Data<ServerOptions>,
    api: FlowApi<B, G>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    G: PaymentGateway,
{
    let payment_id = path.into_inner();
    info!("💻️ POST refund for payment {payment_id} by {}", claims.sub);
    let reason = body.and_then(|b| b.into_inner().reason);
    let ip = remote_ip_for_log(&req, &options);
    let payment = api.refund_payment(&payment_id, &claims.requester(), reason, ip).await?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(payment)))
}

//----------------------------------------------   IPN  ----------------------------------------------------
route!(ipn => Post "/payments/ipn" impl PaymentGatewayDatabase, PaymentGateway);
/// Receives Instant Payment Notifications from NOWPayments.
///
/// The body is taken raw, since the signature in the `x-nowpayments-sig` header covers the body exactly as it was
/// sent. Duplicate notifications are acknowledged like any other.
pub async fn ipn<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    options: web::Data<ServerOptions>,
    api: FlowApi<B, G>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    G: PaymentGateway,
{
    let ip = remote_ip_for_log(&req, &options);
    trace!("💻️ Received IPN from {}", ip.as_deref().unwrap_or("unknown"));
    let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = api.process_ipn(&body, signature, ip).await?;
    debug!(
        "💻️ IPN for payment {} handled. Status is {} ({:?})",
        outcome.payment.payment_id, outcome.payment.status, outcome.log.outcome
    );
    Ok(HttpResponse::Ok().json(JsonResponse::success()))
}
