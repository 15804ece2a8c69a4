use crate::db_types::{Order, Payment};

/// Published when a completed payment marks its order as paid.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderPaidEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRefundedEvent {
    pub order: Order,
    pub payment: Payment,
}

impl PaymentRefundedEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}
