//! Payment reconciliation
//!
//! Turns wallet webhooks into orders. The provider retries deliveries, so
//! every step is idempotent on the invoice id:
//!
//! ```text
//! handle_webhook(body, signature)
//!     ├─ verify HMAC signature (fail → Authentication, no writes)
//!     ├─ parse invoice update
//!     └─ reconcile(external_id, status)            [bounded by timeout]
//!           ├─ unknown payment        → PaymentNotFound
//!           ├─ already completed      → existing order, created = false
//!           └─ tx: guarded completed update → insert order → link → orders_count
//!                 (lost race → winner's order, created = false)
//! ```

mod webhook;

pub use webhook::{InvoiceId, ProviderStatus, WebhookUpdate};

use shared::models::{InvoiceResponse, Order, PaymentCreate, User};
use shared::order::{Currency, PaymentStatus};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::{RepoError, offer, order, payment, user};
use crate::error::{CoreError, CoreResult};
use crate::orders::OrdersManager;
use crate::wallet::{CreateInvoice, WalletProvider, signature};

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// An order was created by this call
    pub created: bool,
    pub order: Option<Order>,
}

impl ReconcileOutcome {
    fn unchanged(order: Option<Order>) -> Self {
        Self {
            created: false,
            order,
        }
    }
}

pub struct PaymentReconciler {
    pool: SqlitePool,
    wallet: Arc<dyn WalletProvider>,
    orders: Arc<OrdersManager>,
    webhook_secret: [u8; 32],
    timeout: Duration,
    wallet_timeout: Duration,
}

impl PaymentReconciler {
    pub fn new(
        pool: SqlitePool,
        wallet: Arc<dyn WalletProvider>,
        orders: Arc<OrdersManager>,
        wallet_api_token: &str,
        timeout: Duration,
        wallet_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            wallet,
            orders,
            webhook_secret: signature::webhook_secret(wallet_api_token),
            timeout,
            wallet_timeout,
        }
    }

    /// Entry point for the wallet webhook: raw body plus signature header
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> CoreResult<ReconcileOutcome> {
        let valid = signature_header
            .is_some_and(|sig| signature::verify(&self.webhook_secret, body, sig));
        if !valid {
            tracing::warn!(
                has_signature = signature_header.is_some(),
                "Wallet webhook rejected: bad signature"
            );
            return Err(CoreError::Authentication("invalid webhook signature".into()));
        }

        let update: WebhookUpdate = serde_json::from_slice(body)
            .map_err(|e| CoreError::Validation(format!("malformed webhook body: {e}")))?;
        if !update.is_invoice_update() {
            tracing::debug!(update_id = update.update_id, update_type = %update.update_type, "Webhook update ignored");
            return Ok(ReconcileOutcome::unchanged(None));
        }

        let external_id = update.payload.invoice_id.to_string();
        self.reconcile(&external_id, update.payload.status.into())
            .await
    }

    /// Apply a provider status to the payment keyed by `external_id`
    pub async fn reconcile(
        &self,
        external_id: &str,
        status: PaymentStatus,
    ) -> CoreResult<ReconcileOutcome> {
        let outcome = tokio::time::timeout(self.timeout, self.reconcile_inner(external_id, status))
            .await
            .map_err(|_| {
                tracing::warn!(external_id, "Reconciliation timed out");
                CoreError::Retriable(format!("reconciliation of {external_id} timed out"))
            })?
            .map_err(CoreError::into_retriable)?;

        if outcome.created
            && let Some(created) = &outcome.order
        {
            self.orders.on_created(created).await;
        }
        Ok(outcome)
    }

    async fn reconcile_inner(
        &self,
        external_id: &str,
        status: PaymentStatus,
    ) -> CoreResult<ReconcileOutcome> {
        let existing = payment::find_by_external_id(&self.pool, external_id)
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(external_id.to_string()))?;

        match status {
            PaymentStatus::Completed => {}
            PaymentStatus::Failed | PaymentStatus::Canceled => {
                if payment::resolve_pending(&self.pool, external_id, status).await? {
                    tracing::info!(external_id, status = %status, "Payment closed without order");
                }
                return Ok(ReconcileOutcome::unchanged(None));
            }
            PaymentStatus::Pending => return Ok(ReconcileOutcome::unchanged(None)),
        }

        if existing.status == PaymentStatus::Completed {
            tracing::debug!(external_id, "Payment already reconciled");
            let found = order::find_by_payment(&self.pool, existing.id).await?;
            return Ok(ReconcileOutcome::unchanged(found));
        }

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        if !payment::mark_completed(&mut *tx, external_id).await? {
            // another delivery won the guarded update
            drop(tx);
            let found = order::find_by_payment(&self.pool, existing.id).await?;
            return Ok(ReconcileOutcome::unchanged(found));
        }
        let created = order::create(&mut *tx, &existing).await?;
        payment::link_order(&mut *tx, existing.id, created.id).await?;
        user::increment_orders_count(&mut *tx, existing.user_id).await?;
        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(
            external_id,
            order_id = created.id,
            user_id = created.user_id,
            "Payment reconciled, order created"
        );
        Ok(ReconcileOutcome {
            created: true,
            order: Some(created),
        })
    }

    /// Open a wallet invoice for an offer and record the pending payment
    pub async fn create_invoice(
        &self,
        buyer: &User,
        offer_id: i64,
        currency: Currency,
    ) -> CoreResult<InvoiceResponse> {
        if buyer.is_banned {
            return Err(CoreError::Forbidden(format!("User {} is banned", buyer.id)));
        }
        let item = offer::find_by_id(&self.pool, offer_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Offer {offer_id}")))?;
        let amount = item.price(currency);

        let request = CreateInvoice {
            amount,
            currency,
            description: item.title.clone(),
            payload: format!("{}:{}", buyer.id, item.id),
        };
        let invoice = match tokio::time::timeout(self.wallet_timeout, self.wallet.create_invoice(request)).await {
            Ok(Ok(invoice)) => invoice,
            Ok(Err(e)) => {
                tracing::warn!(offer_id, user_id = buyer.id, error = %e, "Invoice creation failed");
                return Err(CoreError::Invoice(e.to_string()));
            }
            Err(_) => return Err(CoreError::Invoice("wallet timed out".into())),
        };

        let stored = payment::create(
            &self.pool,
            PaymentCreate {
                external_id: invoice.external_id,
                user_id: buyer.id,
                offer_id: item.id,
                amount_to_pay: amount,
                currency,
                pay_url: Some(invoice.pay_url.clone()),
            },
        )
        .await?;
        tracing::info!(
            external_id = %stored.external_id,
            user_id = buyer.id,
            amount = %amount,
            "Invoice created"
        );

        Ok(InvoiceResponse {
            payment_id: stored.id,
            external_id: stored.external_id,
            pay_url: invoice.pay_url,
            amount,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::PushQueue;
    use crate::db::repository::tests::{seed_offer, seed_user, test_pool};
    use crate::live::ConnectionRegistry;
    use crate::notify::Notifier;
    use crate::settlement::{RetryQueue, SettlementEngine};
    use crate::wallet::fake::FakeWallet;

    const TOKEN: &str = "1234:test-token";

    async fn reconciler(pool: &SqlitePool, wallet: Arc<FakeWallet>) -> PaymentReconciler {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let (push, _push_rx) = PushQueue::channel(32);
        let (retry, _retry_rx) = RetryQueue::channel(8);
        let settlement = Arc::new(SettlementEngine::new(
            pool.clone(),
            wallet.clone(),
            push.clone(),
            Duration::from_millis(200),
        ));
        let notifier = Notifier::new(pool.clone(), registry.clone(), push.clone(), "https://shop");
        let orders = Arc::new(OrdersManager::new(
            pool.clone(),
            settlement,
            notifier,
            registry,
            push,
            retry,
            "https://shop",
        ));
        PaymentReconciler::new(
            pool.clone(),
            wallet,
            orders,
            TOKEN,
            Duration::from_secs(5),
            Duration::from_millis(200),
        )
    }

    fn signed(body: &str) -> String {
        signature::sign(&signature::webhook_secret(TOKEN), body.as_bytes())
    }

    #[tokio::test]
    async fn test_invoice_then_paid_webhook_creates_one_order() {
        let pool = test_pool().await;
        let wallet = Arc::new(FakeWallet::default());
        let r = reconciler(&pool, wallet.clone()).await;
        let buyer = seed_user(&pool, 11).await;
        let item = seed_offer(&pool, 100).await;

        let invoice = r.create_invoice(&buyer, item.id, Currency::Usdt).await.unwrap();
        assert_eq!(invoice.external_id, "inv_1");
        assert_eq!(invoice.amount, shared::Amount::from(100));

        let first = r.reconcile("inv_1", PaymentStatus::Completed).await.unwrap();
        assert!(first.created);
        let again = r.reconcile("inv_1", PaymentStatus::Completed).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.order.as_ref().map(|o| o.id), first.order.as_ref().map(|o| o.id));

        let buyer = user::find_by_id(&pool, buyer.id).await.unwrap().unwrap();
        assert_eq!(buyer.orders_count, 1);
        let paid = payment::find_by_external_id(&pool, "inv_1").await.unwrap().unwrap();
        assert_eq!(paid.status, PaymentStatus::Completed);
        assert_eq!(paid.order_id, first.order.map(|o| o.id));
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let pool = test_pool().await;
        let r = reconciler(&pool, Arc::new(FakeWallet::default())).await;
        let err = r.reconcile("nope", PaymentStatus::Completed).await.unwrap_err();
        assert!(matches!(err, CoreError::PaymentNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_bad_signature_writes_nothing() {
        let pool = test_pool().await;
        let wallet = Arc::new(FakeWallet::default());
        let r = reconciler(&pool, wallet).await;
        let buyer = seed_user(&pool, 12).await;
        let item = seed_offer(&pool, 10).await;
        r.create_invoice(&buyer, item.id, Currency::Usdt).await.unwrap();

        let body = r#"{"update_id":1,"update_type":"invoice_paid","payload":{"invoice_id":"inv_1","status":"paid"}}"#;
        let err = r
            .handle_webhook(body.as_bytes(), Some(&signed("other body")))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Authentication(_)));
        let err = r.handle_webhook(body.as_bytes(), None).await.unwrap_err();
        assert!(matches!(err, CoreError::Authentication(_)));

        let untouched = payment::find_by_external_id(&pool, "inv_1").await.unwrap().unwrap();
        assert_eq!(untouched.status, PaymentStatus::Pending);

        let ok = r
            .handle_webhook(body.as_bytes(), Some(&signed(body)))
            .await
            .unwrap();
        assert!(ok.created);
    }

    #[tokio::test]
    async fn test_expired_invoice_fails_pending_payment() {
        let pool = test_pool().await;
        let r = reconciler(&pool, Arc::new(FakeWallet::default())).await;
        let buyer = seed_user(&pool, 13).await;
        let item = seed_offer(&pool, 10).await;
        r.create_invoice(&buyer, item.id, Currency::Rub).await.unwrap();

        let outcome = r.reconcile("inv_1", PaymentStatus::Failed).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::unchanged(None));
        let failed = payment::find_by_external_id(&pool, "inv_1").await.unwrap().unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_banned_user_and_wallet_failure() {
        let pool = test_pool().await;
        let wallet = Arc::new(FakeWallet::default());
        let r = reconciler(&pool, wallet.clone()).await;
        let mut buyer = seed_user(&pool, 14).await;
        let item = seed_offer(&pool, 10).await;

        wallet.set_failing(true);
        let err = r.create_invoice(&buyer, item.id, Currency::Usdt).await.unwrap_err();
        assert!(matches!(err, CoreError::Invoice(_)));

        wallet.set_failing(false);
        buyer.is_banned = true;
        let err = r.create_invoice(&buyer, item.id, Currency::Usdt).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
