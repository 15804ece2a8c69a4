use serde::Serialize;
use serde_json::Value;

use crate::db_types::Payment;

/// The authenticated caller on whose behalf an operation is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub user_id: String,
    pub email: Option<String>,
    /// Staff may view and act on any order.
    pub is_staff: bool,
}

impl Requester {
    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), ..Default::default() }
    }

    pub fn staff<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into(), email: None, is_staff: true }
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn can_access(&self, owner: &str) -> bool {
        self.is_staff || self.user_id == owner
    }
}

/// The result of a successful payment creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayment {
    pub payment: Payment,
    /// The provider's response, as received.
    pub gateway_data: Value,
}
