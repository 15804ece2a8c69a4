use mockall::mock;
use payment_engine::{
    db_types::{
        NewOrder,
        NewPayment,
        NewPaymentLog,
        Order,
        OrderNumber,
        Payment,
        PaymentLog,
        PaymentStatusUpdate,
        TransitionOutcome,
    },
    traits::{
        GatewayError,
        GatewayPaymentReport,
        GatewayPaymentRequest,
        PaymentGateway,
        PaymentGatewayDatabase,
        PaymentGatewayError,
    },
};
use serde_json::Value;

mock! {
    pub PaymentDb {}
    impl PaymentGatewayDatabase for PaymentDb {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;
        async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, PaymentGatewayError>;
        async fn create_payment_for_order(&self, payment: NewPayment, data: Value, ip_address: Option<String>) -> Result<(Order, Payment), PaymentGatewayError>;
        async fn record_gateway_created(&self, payment_id: &str, transaction_id: &str, payment_data: Value, ip_address: Option<String>) -> Result<Payment, PaymentGatewayError>;
        async fn record_gateway_failure(&self, payment_id: &str, reason: &str, ip_address: Option<String>) -> Result<Payment, PaymentGatewayError>;
        async fn apply_status_update(&self, update: PaymentStatusUpdate) -> Result<TransitionOutcome, PaymentGatewayError>;
        async fn append_log(&self, log: NewPaymentLog) -> Result<PaymentLog, PaymentGatewayError>;
        async fn fetch_payment_by_payment_id(&self, payment_id: &str) -> Result<Option<Payment>, PaymentGatewayError>;
        async fn fetch_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, PaymentGatewayError>;
        async fn fetch_payments_for_order(&self, order_number: &OrderNumber) -> Result<Vec<Payment>, PaymentGatewayError>;
        async fn fetch_logs_for_payment(&self, payment_id: &str) -> Result<Vec<PaymentLog>, PaymentGatewayError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_payment(&self, request: GatewayPaymentRequest) -> Result<GatewayPaymentReport, GatewayError>;
        async fn check_status(&self, transaction_id: &str) -> Result<GatewayPaymentReport, GatewayError>;
        fn verify_signature(&self, raw_body: &[u8], signature: &str) -> bool;
        fn parse_notification(&self, body: &Value) -> Result<GatewayPaymentReport, GatewayError>;
    }
}
