//! Error code ranges

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Leading digit of the code
///
/// 0xxx general, 1xxx auth, 2xxx permission, 4xxx order, 5xxx payment,
/// anything else system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Order,
    Payment,
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            4 => Self::Order,
            5 => Self::Payment,
            _ => Self::System,
        }
    }

    /// Server-side faults, logged at error level
    pub fn is_system(self) -> bool {
        self == Self::System
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1008), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2006), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(4008), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(5007), ErrorCategory::Payment);
        // 3xxx unused
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::System);
    }

    #[test]
    fn test_code_category() {
        assert_eq!(ErrorCode::SettlementFailed.category(), ErrorCategory::Payment);
        assert!(ErrorCode::DatabaseError.category().is_system());
        assert!(!ErrorCode::InvalidTransition.category().is_system());
    }
}
