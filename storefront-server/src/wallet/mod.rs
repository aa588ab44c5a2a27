//! Wallet provider (Crypto Pay)
//!
//! The engine reaches the wallet only through [`WalletProvider`]: invoice
//! creation for checkout and transfers for refunds. Webhook signature
//! checks live in [`signature`].

mod crypto_pay;
pub mod signature;

pub use crypto_pay::CryptoPayClient;

use async_trait::async_trait;
use shared::{Amount, Currency};

#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub amount: Amount,
    pub currency: Currency,
    pub description: String,
    /// Opaque payload echoed back in the webhook
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    /// Provider invoice id, the reconciliation key
    pub external_id: String,
    pub pay_url: String,
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub telegram_user_id: i64,
    pub currency: Currency,
    pub amount: Amount,
    /// Idempotency key; the provider refuses a second transfer with the same id
    pub spend_id: String,
    pub comment: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet rejected request: {0}")]
    Rejected(String),
    #[error("Wallet transport error: {0}")]
    Transport(String),
    /// The spend id was already used: the transfer happened before
    #[error("Transfer already applied")]
    AlreadyApplied,
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, WalletError>;

    async fn transfer(&self, request: TransferRequest) -> Result<(), WalletError>;
}
