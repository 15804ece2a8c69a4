use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// The local lifecycle of a single payment attempt.
///
/// `Completed`, `Failed` and `Refunded` are terminal. The only way out of a terminal state is a refund of a completed
/// payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatusType {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

/// The outcome of asking whether a payment may move from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The new status should be written.
    Apply,
    /// The payment is already in the requested status.
    NoOp,
    /// The move is backwards, or out of an absorbing state.
    Reject,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Apply)
    }
}

impl PaymentStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Refunded)
    }

    /// Decide whether a payment in this status may move to `next`.
    ///
    /// Payments only ever progress forward, so duplicate or out-of-order notifications resolve to `NoOp` or `Reject`
    /// and the first terminal status that arrives wins.
    pub fn transition_to(&self, next: PaymentStatusType) -> Transition {
        use PaymentStatusType::*;
        if *self == next {
            return Transition::NoOp;
        }
        match (self, next) {
            (Pending, Processing | Completed | Failed) => Transition::Apply,
            (Processing, Completed | Failed) => Transition::Apply,
            (Completed, Refunded) => Transition::Apply,
            _ => Transition::Reject,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for PaymentStatusType {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}
