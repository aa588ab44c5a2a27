//! Wallet webhook body

use serde::Deserialize;
use shared::order::PaymentStatus;
use std::fmt;

const INVOICE_PAID: &str = "invoice_paid";

/// `{update_id, update_type, payload: {invoice_id, status, ...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookUpdate {
    pub update_id: i64,
    pub update_type: String,
    pub payload: InvoicePayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicePayload {
    pub invoice_id: InvoiceId,
    pub status: ProviderStatus,
}

/// Crypto Pay sends numeric ids; stored payments key on the string form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InvoiceId {
    Number(i64),
    Text(String),
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceId::Number(n) => write!(f, "{n}"),
            InvoiceId::Text(s) => f.write_str(s),
        }
    }
}

/// Invoice status as the wallet reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Active,
    Paid,
    Expired,
}

impl From<ProviderStatus> for PaymentStatus {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::Paid => PaymentStatus::Completed,
            ProviderStatus::Expired => PaymentStatus::Failed,
            ProviderStatus::Active => PaymentStatus::Pending,
        }
    }
}

impl WebhookUpdate {
    pub fn is_invoice_update(&self) -> bool {
        self.update_type == INVOICE_PAID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_invoice_paid() {
        let body = r#"{
            "update_id": 7,
            "update_type": "invoice_paid",
            "request_date": "2026-01-01T00:00:00.000Z",
            "payload": {"invoice_id": 528890, "status": "paid", "asset": "USDT", "amount": "100"}
        }"#;
        let update: WebhookUpdate = serde_json::from_str(body).unwrap();
        assert!(update.is_invoice_update());
        assert_eq!(update.payload.invoice_id.to_string(), "528890");
        assert_eq!(PaymentStatus::from(update.payload.status), PaymentStatus::Completed);
    }

    #[test]
    fn test_string_invoice_id() {
        let body = r#"{"update_id":1,"update_type":"invoice_paid","payload":{"invoice_id":"inv_1","status":"expired"}}"#;
        let update: WebhookUpdate = serde_json::from_str(body).unwrap();
        assert_eq!(update.payload.invoice_id, InvoiceId::Text("inv_1".into()));
        assert_eq!(update.payload.status, ProviderStatus::Expired);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(PaymentStatus::from(ProviderStatus::Expired), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::from(ProviderStatus::Active), PaymentStatus::Pending);
    }
}
