use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use shared::Currency;
use std::time::Duration;

use super::{CreateInvoice, Invoice, TransferRequest, WalletError, WalletProvider};

const TOKEN_HEADER: &str = "Crypto-Pay-API-Token";
const SPEND_ID_USED: &str = "SPEND_ID_ALREADY_USED";

/// Crypto Pay REST client
pub struct CryptoPayClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct InvoiceResult {
    invoice_id: i64,
    #[serde(default)]
    bot_invoice_url: Option<String>,
    #[serde(default)]
    pay_url: Option<String>,
}

impl CryptoPayClient {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, WalletError> {
        let envelope: Envelope<T> = self
            .client
            .post(format!("{}/{method}", self.api_url))
            .header(TOKEN_HEADER, &self.token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, WalletError> {
    if envelope.ok
        && let Some(result) = envelope.result
    {
        return Ok(result);
    }
    match envelope.error {
        Some(err) if err.name == SPEND_ID_USED => Err(WalletError::AlreadyApplied),
        Some(err) => Err(WalletError::Rejected(err.name)),
        None => Err(WalletError::Rejected("empty response".into())),
    }
}

pub(super) fn invoice_body(request: &CreateInvoice) -> Value {
    let mut body = json!({
        "amount": request.amount.to_string(),
        "description": request.description,
        "payload": request.payload,
    });
    match request.currency {
        Currency::Rub => {
            body["currency_type"] = json!("fiat");
            body["fiat"] = json!(request.currency.code());
        }
        Currency::Usdt => {
            body["currency_type"] = json!("crypto");
            body["asset"] = json!(request.currency.code());
        }
    }
    body
}

pub(super) fn transfer_body(request: &TransferRequest) -> Value {
    let mut body = json!({
        "user_id": request.telegram_user_id,
        "asset": request.currency.code(),
        "amount": request.amount.to_string(),
        "spend_id": request.spend_id,
    });
    if let Some(comment) = &request.comment {
        body["comment"] = json!(comment);
    }
    body
}

#[async_trait]
impl WalletProvider for CryptoPayClient {
    async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, WalletError> {
        let result: InvoiceResult = self.call("createInvoice", invoice_body(&request)).await?;
        let pay_url = result
            .bot_invoice_url
            .or(result.pay_url)
            .ok_or_else(|| WalletError::Rejected("invoice without pay url".into()))?;
        Ok(Invoice {
            external_id: result.invoice_id.to_string(),
            pay_url,
        })
    }

    async fn transfer(&self, request: TransferRequest) -> Result<(), WalletError> {
        let _: Value = self.call("transfer", transfer_body(&request)).await?;
        tracing::info!(
            spend_id = %request.spend_id,
            telegram_user_id = request.telegram_user_id,
            amount = %request.amount,
            "Wallet transfer sent"
        );
        Ok(())
    }
}
