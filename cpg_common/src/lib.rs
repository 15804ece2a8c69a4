mod helpers;
mod money;
mod payment_status;
mod secret;

pub mod op;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY_CODE};
pub use payment_status::{PaymentStatusType, StatusConversionError, Transition};
pub use secret::Secret;
