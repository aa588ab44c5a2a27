//! Authentication
//!
//! - Customers: Telegram WebApp `initData`, either `Authorization: tma <initData>`
//!   or `?init_data=` on the socket upgrade.
//! - Admins: a static token, `Authorization: Bearer <token>` or `?token=`.

mod extractor;
pub mod telegram;

pub use extractor::{AdminSession, CurrentCustomer};
pub use telegram::{InitDataError, WebAppUser, verify_init_data};

/// Constant-time byte comparison
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
        assert!(constant_time_eq(b"", b""));
    }
}
