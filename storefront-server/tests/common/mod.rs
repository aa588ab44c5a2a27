//! Shared harness: real router, file-backed SQLite, in-process wallet

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

use shared::Amount;
use shared::models::{InvoiceResponse, Offer, User};
use storefront_server::bot::{PushMessage, PushQueue};
use storefront_server::db::DbService;
use storefront_server::db::repository::{offer, user};
use storefront_server::settlement::{RetryJob, RetryQueue};
use storefront_server::wallet::{
    CreateInvoice, Invoice, TransferRequest, WalletError, WalletProvider, signature,
};
use storefront_server::{Config, ServerState, api};

pub const WALLET_TOKEN: &str = "wallet-test-token";
pub const BOT_TOKEN: &str = "123456:bot-test-token";
pub const ADMIN_TOKEN: &str = "admin-test-token";

/// Wallet double: numbered invoices, spend-id deduplicated transfers
#[derive(Default)]
pub struct TestWallet {
    invoices: Mutex<Vec<CreateInvoice>>,
    transfers: Mutex<Vec<TransferRequest>>,
    failing: AtomicBool,
}

impl TestWallet {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().clone()
    }
}

#[async_trait]
impl WalletProvider for TestWallet {
    async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, WalletError> {
        let mut invoices = self.invoices.lock();
        invoices.push(request);
        let n = invoices.len();
        Ok(Invoice {
            external_id: format!("inv_{n}"),
            pay_url: format!("https://t.me/CryptoBot?start=IV{n}"),
        })
    }

    async fn transfer(&self, request: TransferRequest) -> Result<(), WalletError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("INSUFFICIENT_FUNDS".into()));
        }
        let mut transfers = self.transfers.lock();
        if transfers.iter().any(|t| t.spend_id == request.spend_id) {
            return Err(WalletError::AlreadyApplied);
        }
        transfers.push(request);
        Ok(())
    }
}

pub struct TestApp {
    pub state: ServerState,
    pub router: Router,
    pub wallet: Arc<TestWallet>,
    pub push_rx: mpsc::Receiver<PushMessage>,
    pub retry_rx: mpsc::Receiver<RetryJob>,
    _dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("storefront.db").display());
    let db = DbService::new(&url).await.unwrap();

    let config = Config::for_tests(WALLET_TOKEN, BOT_TOKEN, ADMIN_TOKEN);
    let wallet = Arc::new(TestWallet::default());
    let (push, push_rx) = PushQueue::channel(config.push_queue_capacity);
    let (retry, retry_rx) = RetryQueue::channel(config.settlement_queue_capacity);
    let state = ServerState::new(config, db.pool, wallet.clone(), push, retry);
    let router = api::create_router(state.clone());

    TestApp {
        state,
        router,
        wallet,
        push_rx,
        retry_rx,
        _dir: dir,
    }
}

/// Signed mini-app init data for a Telegram user
pub fn init_data(telegram_id: i64, start_param: Option<&str>) -> String {
    let user = serde_json::json!({ "id": telegram_id, "username": format!("tg{telegram_id}") })
        .to_string();
    let auth_date = shared::util::now_secs().to_string();
    let mut fields = vec![("auth_date", auth_date.as_str()), ("user", user.as_str())];
    if let Some(param) = start_param {
        fields.push(("start_param", param));
    }
    storefront_server::auth::telegram::sign_init_data(&fields, BOT_TOKEN)
}

pub fn webhook_body(invoice_id: &str, status: &str) -> String {
    serde_json::json!({
        "update_id": 1,
        "update_type": "invoice_paid",
        "payload": { "invoice_id": invoice_id, "status": status }
    })
    .to_string()
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn customer(&self, method: &str, uri: &str, telegram_id: i64, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("tma {}", init_data(telegram_id, None)));
        self.send(with_json(builder, body)).await
    }

    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {ADMIN_TOKEN}"));
        self.send(with_json(builder, body)).await
    }

    /// Deliver a webhook signed with the wallet token
    pub async fn webhook(&self, invoice_id: &str, status: &str) -> (StatusCode, Value) {
        let body = webhook_body(invoice_id, status);
        let secret = signature::webhook_secret(WALLET_TOKEN);
        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/wallet")
            .header("content-type", "application/json")
            .header(signature::SIGNATURE_HEADER, signature::sign(&secret, body.as_bytes()))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Registers the customer through the auth extractor
    pub async fn register(&self, telegram_id: i64, start_param: Option<&str>) -> User {
        let request = Request::builder()
            .uri("/api/orders")
            .header("authorization", format!("tma {}", init_data(telegram_id, start_param)))
            .body(Body::empty())
            .unwrap();
        let (status, _) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        self.user(telegram_id).await
    }

    pub async fn user(&self, telegram_id: i64) -> User {
        user::find_by_telegram_id(&self.state.pool, telegram_id)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn offer(&self, price_usdt: i64) -> Offer {
        offer::create(
            &self.state.pool,
            "pubg",
            "60 UC",
            Amount::from(price_usdt * 90),
            Amount::from(price_usdt),
        )
        .await
        .unwrap()
    }

    pub async fn invoice(&self, telegram_id: i64, offer_id: i64) -> InvoiceResponse {
        let (status, body) = self
            .customer(
                "POST",
                "/api/payments",
                telegram_id,
                Some(serde_json::json!({ "offer_id": offer_id, "currency": "USDT" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        serde_json::from_value(body).unwrap()
    }

    /// Invoice + paid webhook, returns the new order id
    pub async fn paid_order(&self, telegram_id: i64, price_usdt: i64) -> i64 {
        let item = self.offer(price_usdt).await;
        let invoice = self.invoice(telegram_id, item.id).await;
        let (status, ack) = self.webhook(&invoice.external_id, "paid").await;
        assert_eq!(status, StatusCode::OK, "{ack}");
        assert_eq!(ack["created"], true);
        ack["order_id"].as_i64().unwrap()
    }

    pub fn drain_pushes(&mut self) -> Vec<PushMessage> {
        let mut pushed = Vec::new();
        while let Ok(msg) = self.push_rx.try_recv() {
            pushed.push(msg);
        }
        pushed
    }
}

fn with_json(builder: http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
