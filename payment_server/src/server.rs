use std::time::Duration;

use actix_web::{
    dev::Server,
    http::KeepAlive,
    middleware::{Logger, NormalizePath},
    web,
    App,
    HttpServer,
};
use log::*;
use nowpayments_tools::NowPaymentsApi;
use payment_engine::{events::EventProducers, PaymentFlowApi, SqliteDatabase};

use crate::{
    auth::TokenValidator,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::nowpayments::{create_payment_event_handlers, NowPaymentsGateway},
    routes::{
        health,
        CreatePaymentRoute,
        IpnRoute,
        OrderPaymentsRoute,
        PaymentLogsRoute,
        PaymentStatusRoute,
        RefundPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    let api = NowPaymentsApi::new(config.nowpayments.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the NOWPayments client. {e}")))?;
    if config.nowpayments.ipn_secret.is_empty() {
        warn!("🪛️ NOWPAYMENTS_IPN_SECRET is not set. IPN notifications cannot be authenticated.");
    }
    let gateway = NowPaymentsGateway::new(api);
    let handlers = create_payment_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: NowPaymentsGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    info!("💻️ Payments are created against {}", config.nowpayments.base_url);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let flow_api = PaymentFlowApi::new(db.clone(), gateway.clone(), producers.clone());
        let validator = TokenValidator::new(&config.auth);
        let options = ServerOptions::from_config(&config);
        let api_scope = web::scope("/api")
            .service(CreatePaymentRoute::<SqliteDatabase, NowPaymentsGateway>::new())
            .service(IpnRoute::<SqliteDatabase, NowPaymentsGateway>::new())
            .service(PaymentStatusRoute::<SqliteDatabase, NowPaymentsGateway>::new())
            .service(PaymentLogsRoute::<SqliteDatabase, NowPaymentsGateway>::new())
            .service(OrderPaymentsRoute::<SqliteDatabase, NowPaymentsGateway>::new())
            .service(RefundPaymentRoute::<SqliteDatabase, NowPaymentsGateway>::new());
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("cpg::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(validator))
            .app_data(web::Data::new(options))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
