//! Status enums and the order transition table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 订单状态
///
/// ```text
/// pending ──> process ──> completed
///    │         │  ▲
///    │         ▼  │
///    │       invalid
///    ▼         │
/// canceled <───┘ (also from process)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum OrderStatus {
    /// Paid, waiting for delivery details
    Pending,
    /// Details submitted, being fulfilled
    Process,
    Completed,
    Canceled,
    /// Details were rejected, customer must resubmit
    Invalid,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Process,
        OrderStatus::Completed,
        OrderStatus::Canceled,
        OrderStatus::Invalid,
    ];

    /// Whether `self -> target` is in the transition table.
    ///
    /// Same-status pairs are never transitions; `invalid -> invalid` is
    /// accepted as a no-op by the state machine, not by this table.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Process)
                | (Pending, Canceled)
                | (Process, Completed)
                | (Process, Canceled)
                | (Process, Invalid)
                | (Invalid, Process)
                | (Invalid, Canceled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Process => "process",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Invalid => "invalid",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// 支付状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
pub enum Currency {
    Rub,
    Usdt,
}

impl Currency {
    /// Asset code as the wallet provider spells it
    pub fn code(self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum TransactionKind {
    /// Referral payout for a completed order
    Order,
    /// Refund of a canceled order
    Refund,
}
