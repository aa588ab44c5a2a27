use shared::models::{Order, Payment, Transaction, TransactionCreate, User};
use shared::order::{OrderStatus, TransactionKind};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::bot::{PushMessage, PushQueue};
use crate::db::repository::{RepoError, payment, referral, transaction, user};
use crate::error::{CoreError, CoreResult};
use crate::wallet::{TransferRequest, WalletError, WalletProvider};

/// Wallet idempotency key for an order's refund
pub fn refund_spend_id(order_id: i64) -> String {
    format!("refund_{order_id}")
}

pub struct SettlementEngine {
    pool: SqlitePool,
    wallet: Arc<dyn WalletProvider>,
    push: PushQueue,
    wallet_timeout: Duration,
}

impl SettlementEngine {
    pub fn new(
        pool: SqlitePool,
        wallet: Arc<dyn WalletProvider>,
        push: PushQueue,
        wallet_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            wallet,
            push,
            wallet_timeout,
        }
    }

    /// Credit the referrer's commission for a completed order.
    ///
    /// `Ok(None)` when there is nothing to pay: no referral edge, a zero
    /// commission, or the order was already settled.
    pub async fn settle_completed_order(&self, order: &Order) -> CoreResult<Option<Transaction>> {
        if order.status != OrderStatus::Completed {
            tracing::debug!(order_id = order.id, status = %order.status, "Settlement skipped, order not completed");
            return Ok(None);
        }

        let Some(edge) = referral::find_by_user(&self.pool, order.user_id).await? else {
            return Ok(None);
        };
        let referrer = user::find_by_id(&self.pool, edge.refer_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Referrer {}", edge.refer_id)))?;
        let payment = payment::find_by_id(&self.pool, order.payment_id)
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(order.payment_id.to_string()))?;

        let earned = payment.amount_to_pay.percent_of(referrer.referral_percent);
        if !earned.is_positive() {
            tracing::debug!(order_id = order.id, referrer_id = referrer.id, "Zero commission, nothing to settle");
            return Ok(None);
        }

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        let inserted = transaction::insert(
            &mut *tx,
            TransactionCreate {
                kind: TransactionKind::Order,
                order_id: order.id,
                user_id: order.user_id,
                referrer_id: Some(referrer.id),
                currency: payment.currency,
                amount: payment.amount_to_pay,
                earned: Some(earned),
            },
        )
        .await?;
        let Some(entry) = inserted else {
            // rollback on drop
            tracing::debug!(order_id = order.id, "Order already settled");
            return Ok(None);
        };
        user::credit_balance(&mut *tx, referrer.id, payment.currency, earned).await?;
        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(
            order_id = order.id,
            referrer_id = referrer.id,
            earned = %earned,
            currency = %payment.currency,
            "Referral commission credited"
        );

        self.push.push(PushMessage::new(
            referrer.telegram_id,
            format!(
                "You earned {earned} {} from a referral purchase (order #{}).",
                payment.currency, order.id
            ),
        ));

        Ok(Some(entry))
    }

    /// Send the refund transfer for a cancellation.
    ///
    /// Bounded by the wallet timeout. A reused spend id means the money
    /// already went out, which counts as success.
    pub async fn refund(&self, order: &Order, payment: &Payment, customer: &User) -> CoreResult<()> {
        let request = TransferRequest {
            telegram_user_id: customer.telegram_id,
            currency: payment.currency,
            amount: payment.amount_to_pay,
            spend_id: refund_spend_id(order.id),
            comment: Some(format!("Refund for order #{}", order.id)),
        };

        match tokio::time::timeout(self.wallet_timeout, self.wallet.transfer(request)).await {
            Ok(Ok(())) => {
                tracing::info!(order_id = order.id, amount = %payment.amount_to_pay, "Refund transferred");
                Ok(())
            }
            Ok(Err(WalletError::AlreadyApplied)) => {
                tracing::info!(order_id = order.id, "Refund already transferred earlier");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!(order_id = order.id, error = %e, "Refund transfer failed");
                Err(CoreError::Settlement(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(order_id = order.id, "Refund transfer timed out");
                Err(CoreError::Settlement("wallet transfer timed out".into()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repository::tests::{seed_offer, seed_user, test_pool};
    use crate::db::repository::order;
    use crate::wallet::fake::FakeWallet;
    use shared::Amount;
    use shared::models::{PaymentCreate, UserCreate};
    use shared::order::Currency;

    struct Fixture {
        pool: SqlitePool,
        engine: SettlementEngine,
        wallet: Arc<FakeWallet>,
        push_rx: tokio::sync::mpsc::Receiver<PushMessage>,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let wallet = Arc::new(FakeWallet::default());
        let (push, push_rx) = PushQueue::channel(16);
        let engine = SettlementEngine::new(
            pool.clone(),
            wallet.clone(),
            push,
            Duration::from_millis(200),
        );
        Fixture {
            pool,
            engine,
            wallet,
            push_rx,
        }
    }

    /// Referred buyer with a completed 100 USDT order
    pub(crate) async fn completed_order(pool: &SqlitePool, refer_id: Option<i64>) -> (Order, Payment) {
        let mut conn = pool.acquire().await.unwrap();
        let (buyer, _) = user::find_or_create(
            &mut conn,
            UserCreate {
                telegram_id: 9001,
                username: None,
                refer_id,
            },
        )
        .await
        .unwrap();
        drop(conn);

        let offer = seed_offer(pool, 100).await;
        let payment = payment::create(
            pool,
            PaymentCreate {
                external_id: "inv_1".into(),
                user_id: buyer.id,
                offer_id: offer.id,
                amount_to_pay: Amount::from(100),
                currency: Currency::Usdt,
                pay_url: None,
            },
        )
        .await
        .unwrap();
        let created = order::create(pool, &payment).await.unwrap();
        let order = order::update_status(pool, created.id, OrderStatus::Pending, OrderStatus::Process)
            .await
            .unwrap()
            .unwrap();
        let order = order::update_status(pool, order.id, OrderStatus::Process, OrderStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        (order, payment)
    }

    #[tokio::test]
    async fn test_five_percent_of_hundred_credits_five_once() {
        let mut f = fixture().await;
        let referrer = seed_user(&f.pool, 1000).await;
        user::set_referral_percent(&f.pool, referrer.id, Amount::from(5))
            .await
            .unwrap();
        let (order, _) = completed_order(&f.pool, Some(referrer.id)).await;

        let entry = f.engine.settle_completed_order(&order).await.unwrap().unwrap();
        assert_eq!(entry.earned, Some(Amount::from(5)));
        assert_eq!(entry.amount, Amount::from(100));
        assert_eq!(entry.referrer_id, Some(referrer.id));

        // replay is a no-op
        assert!(f.engine.settle_completed_order(&order).await.unwrap().is_none());

        let referrer = user::find_by_id(&f.pool, referrer.id).await.unwrap().unwrap();
        assert_eq!(referrer.balance_usdt, Amount::from(5));
        assert_eq!(referrer.balance_rub, Amount::ZERO);
        let entries = transaction::find_by_order(&f.pool, order.id).await.unwrap();
        assert_eq!(entries.len(), 1);

        let push = f.push_rx.try_recv().unwrap();
        assert_eq!(push.chat_id, 1000);
        assert!(f.push_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_referral_is_noop() {
        let f = fixture().await;
        let (order, _) = completed_order(&f.pool, None).await;
        assert!(f.engine.settle_completed_order(&order).await.unwrap().is_none());
        assert!(transaction::find_by_order(&f.pool, order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_percent_is_noop() {
        let f = fixture().await;
        let referrer = seed_user(&f.pool, 1000).await;
        let (order, _) = completed_order(&f.pool, Some(referrer.id)).await;
        assert!(f.engine.settle_completed_order(&order).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refund_uses_order_spend_id() {
        let f = fixture().await;
        let (order, payment) = completed_order(&f.pool, None).await;
        let customer = user::find_by_id(&f.pool, order.user_id).await.unwrap().unwrap();

        f.engine.refund(&order, &payment, &customer).await.unwrap();
        // same spend id again: the wallet answers "already used", still ok
        f.engine.refund(&order, &payment, &customer).await.unwrap();

        let transfers = f.wallet.transfers.lock().unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].spend_id, format!("refund_{}", order.id));
        assert_eq!(transfers[0].telegram_user_id, 9001);
    }

    #[tokio::test]
    async fn test_refund_failure_is_settlement_error() {
        let f = fixture().await;
        let (order, payment) = completed_order(&f.pool, None).await;
        let customer = user::find_by_id(&f.pool, order.user_id).await.unwrap().unwrap();
        f.wallet.set_failing(true);

        let err = f.engine.refund(&order, &payment, &customer).await.unwrap_err();
        assert!(matches!(err, CoreError::Settlement(_)));
    }
}
