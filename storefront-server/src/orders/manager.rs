//! OrdersManager - order state machine
//!
//! # Transition Flow
//!
//! ```text
//! transition(order_id, target, actor)
//!     ├─ 1. Per-order lock
//!     ├─ 2. Load order, check actor rights
//!     ├─ 3. Check the transition table (same status → error, invalid→invalid → no-op)
//!     ├─ 4. Commit
//!     │     ├─ →canceled: wallet refund, then status + refund ledger row in one tx
//!     │     └─ otherwise: guarded status update
//!     ├─ 5. →completed: settle referral (failure → retry queue), review prompt
//!     └─ 6. System chat message + OrderUpdated to customer and admin room
//! ```

use dashmap::DashMap;
use serde_json::{Map, Value};
use shared::models::{ChatSender, Order, TransactionCreate};
use shared::order::{OrderStatus, TransactionKind};
use shared::realtime::{AdminEvent, ClientEvent};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::messages;
use crate::bot::{PushMessage, PushQueue};
use crate::db::repository::{RepoError, order, order_details, payment, transaction, user};
use crate::error::{CoreError, CoreResult};
use crate::live::EventPublisher;
use crate::notify::Notifier;
use crate::settlement::{RetryQueue, SettlementEngine};

/// Who asked for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The buyer, through the mini-app
    Customer(i64),
    Admin,
    /// Bot or background flows
    System,
}

pub struct OrdersManager {
    pool: SqlitePool,
    settlement: Arc<SettlementEngine>,
    notifier: Notifier,
    publisher: Arc<dyn EventPublisher>,
    push: PushQueue,
    retry: RetryQueue,
    webapp_url: String,
    /// 每个订单一把锁，不同订单并行
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl OrdersManager {
    pub fn new(
        pool: SqlitePool,
        settlement: Arc<SettlementEngine>,
        notifier: Notifier,
        publisher: Arc<dyn EventPublisher>,
        push: PushQueue,
        retry: RetryQueue,
        webapp_url: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            settlement,
            notifier,
            publisher,
            push,
            retry,
            webapp_url: webapp_url.into(),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, order_id: i64) -> Arc<Mutex<()>> {
        self.locks.entry(order_id).or_default().clone()
    }

    /// Forget the lock once nobody else holds or waits on it
    fn release_lock(&self, order_id: i64) {
        self.locks
            .remove_if(&order_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Move an order to `target` and run the transition's side effects
    pub async fn transition(
        &self,
        order_id: i64,
        target: OrderStatus,
        actor: Actor,
    ) -> CoreResult<Order> {
        let lock = self.lock_for(order_id);
        let result = {
            let _guard = lock.lock().await;
            match order::find_by_id(&self.pool, order_id).await? {
                Some(current) => self.transition_locked(current, target, actor).await,
                None => Err(CoreError::OrderNotFound(order_id)),
            }
        };
        drop(lock);
        self.release_lock(order_id);
        result
    }

    /// Store order details and start processing.
    ///
    /// A `pending` order gets its first details; an `invalid` order gets
    /// them replaced. Both then move to `process`.
    pub async fn submit_details(
        &self,
        order_id: i64,
        user_id: i64,
        fields: Map<String, Value>,
    ) -> CoreResult<Order> {
        if fields.is_empty() {
            return Err(CoreError::Validation("order details must not be empty".into()));
        }

        let lock = self.lock_for(order_id);
        let result = {
            let _guard = lock.lock().await;
            self.submit_details_locked(order_id, user_id, &fields).await
        };
        drop(lock);
        self.release_lock(order_id);
        result
    }

    async fn submit_details_locked(
        &self,
        order_id: i64,
        user_id: i64,
        fields: &Map<String, Value>,
    ) -> CoreResult<Order> {
        let current = order::find_by_id(&self.pool, order_id)
            .await?
            .ok_or(CoreError::OrderNotFound(order_id))?;
        if current.user_id != user_id {
            return Err(CoreError::Forbidden(format!("Order {order_id} belongs to another user")));
        }
        if !matches!(current.status, OrderStatus::Pending | OrderStatus::Invalid) {
            return Err(CoreError::invalid_transition(
                order_id,
                current.status,
                OrderStatus::Process,
            ));
        }

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        let details = order_details::upsert(&mut *tx, order_id, user_id, fields).await?;
        order::set_details(&mut *tx, order_id, details.id).await?;
        tx.commit().await.map_err(RepoError::from)?;
        tracing::info!(order_id, details_id = details.id, "Order details stored");

        let current = Order {
            order_details_id: Some(details.id),
            ..current
        };
        self.transition_locked(current, OrderStatus::Process, Actor::Customer(user_id))
            .await
    }

    /// Announce a freshly reconciled order
    pub async fn on_created(&self, created: &Order) {
        if let Err(e) = self
            .notifier
            .post(created.user_id, ChatSender::System, &messages::created(created), true)
            .await
        {
            tracing::warn!(order_id = created.id, error = %e, "Order created message not stored");
        }
        self.broadcast_order(created);
    }

    async fn transition_locked(
        &self,
        current: Order,
        target: OrderStatus,
        actor: Actor,
    ) -> CoreResult<Order> {
        authorize(&current, target, actor)?;

        if current.status == target {
            if target == OrderStatus::Invalid {
                return Ok(current);
            }
            return Err(CoreError::invalid_transition(current.id, current.status, target));
        }
        if !current.status.can_transition_to(target) {
            return Err(CoreError::invalid_transition(current.id, current.status, target));
        }

        let updated = match target {
            OrderStatus::Canceled => self.cancel(&current).await?,
            _ => self.commit_status(&current, target).await?,
        };
        tracing::info!(
            order_id = updated.id,
            from = %current.status,
            to = %updated.status,
            actor = ?actor,
            "Order status changed"
        );

        if updated.status == OrderStatus::Completed {
            self.settle(&updated).await;
        }

        if let Err(e) = self
            .notifier
            .post(updated.user_id, ChatSender::System, &messages::status_changed(&updated), true)
            .await
        {
            tracing::warn!(order_id = updated.id, error = %e, "Status message not stored");
        }
        self.broadcast_order(&updated);

        if updated.status == OrderStatus::Completed {
            self.push_review_prompt(&updated).await;
        }

        Ok(updated)
    }

    async fn commit_status(&self, current: &Order, target: OrderStatus) -> CoreResult<Order> {
        match order::update_status(&self.pool, current.id, current.status, target).await? {
            Some(updated) => Ok(updated),
            None => Err(self.lost_race(current.id, target).await),
        }
    }

    /// Refund first; the status and the refund ledger row commit together
    /// only once the money went out.
    async fn cancel(&self, current: &Order) -> CoreResult<Order> {
        let paid = payment::find_by_id(&self.pool, current.payment_id).await?;
        let Some(paid) = paid else {
            tracing::warn!(order_id = current.id, "Canceling order without payment, no refund");
            return self.commit_status(current, OrderStatus::Canceled).await;
        };
        let customer = user::find_by_id(&self.pool, current.user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("User {}", current.user_id)))?;

        self.settlement.refund(current, &paid, &customer).await?;

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        let updated =
            order::update_status(&mut *tx, current.id, current.status, OrderStatus::Canceled)
                .await?;
        let Some(updated) = updated else {
            drop(tx);
            return Err(self.lost_race(current.id, OrderStatus::Canceled).await);
        };
        transaction::insert(
            &mut *tx,
            TransactionCreate {
                kind: TransactionKind::Refund,
                order_id: current.id,
                user_id: current.user_id,
                referrer_id: None,
                currency: paid.currency,
                amount: paid.amount_to_pay,
                earned: None,
            },
        )
        .await?;
        tx.commit().await.map_err(RepoError::from)?;
        Ok(updated)
    }

    /// Another writer moved the order between our read and the guarded update
    async fn lost_race(&self, order_id: i64, target: OrderStatus) -> CoreError {
        match order::find_by_id(&self.pool, order_id).await {
            Ok(Some(now)) => CoreError::invalid_transition(order_id, now.status, target),
            Ok(None) => CoreError::OrderNotFound(order_id),
            Err(e) => e.into(),
        }
    }

    /// Run settlement inline; a failure is queued for the retry worker
    async fn settle(&self, completed: &Order) {
        if let Err(e) = self.settlement.settle_completed_order(completed).await {
            tracing::error!(order_id = completed.id, error = %e, "Settlement failed, queued for retry");
            self.retry.enqueue(completed.id).await;
        }
    }

    async fn push_review_prompt(&self, completed: &Order) {
        match user::find_by_id(&self.pool, completed.user_id).await {
            Ok(Some(customer)) => {
                let url = format!(
                    "{}/orders/{}/review",
                    self.webapp_url.trim_end_matches('/'),
                    completed.id
                );
                self.push.push(
                    PushMessage::new(customer.telegram_id, messages::review_prompt(completed))
                        .with_web_app("Leave a review", url),
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(order_id = completed.id, error = %e, "Review prompt skipped");
            }
        }
    }

    fn broadcast_order(&self, updated: &Order) {
        self.publisher.send_to_user(
            updated.user_id,
            ClientEvent::OrderUpdated {
                order: updated.clone(),
            },
        );
        self.publisher.broadcast_admins(AdminEvent::OrderUpdated {
            order: updated.clone(),
        });
    }
}

fn authorize(current: &Order, target: OrderStatus, actor: Actor) -> CoreResult<()> {
    match actor {
        Actor::Admin | Actor::System => Ok(()),
        Actor::Customer(user_id) if user_id != current.user_id => Err(CoreError::Forbidden(
            format!("Order {} belongs to another user", current.id),
        )),
        Actor::Customer(_) if target != OrderStatus::Process => Err(CoreError::Forbidden(
            format!("Customers cannot move orders to {target}"),
        )),
        Actor::Customer(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::tests::{seed_offer, seed_user, test_pool};
    use crate::db::repository::chat;
    use crate::live::ConnectionRegistry;
    use crate::settlement::RetryJob;
    use crate::wallet::fake::FakeWallet;
    use shared::Amount;
    use shared::models::PaymentCreate;
    use shared::order::Currency;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Fixture {
        pool: SqlitePool,
        manager: Arc<OrdersManager>,
        wallet: Arc<FakeWallet>,
        registry: Arc<ConnectionRegistry>,
        push_rx: mpsc::Receiver<PushMessage>,
        retry_rx: mpsc::Receiver<RetryJob>,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let wallet = Arc::new(FakeWallet::default());
        let registry = Arc::new(ConnectionRegistry::new(16));
        let (push, push_rx) = PushQueue::channel(32);
        let (retry, retry_rx) = RetryQueue::channel(8);
        let settlement = Arc::new(SettlementEngine::new(
            pool.clone(),
            wallet.clone(),
            push.clone(),
            Duration::from_millis(200),
        ));
        let notifier = Notifier::new(pool.clone(), registry.clone(), push.clone(), "https://shop");
        let manager = Arc::new(OrdersManager::new(
            pool.clone(),
            settlement,
            notifier,
            registry.clone(),
            push,
            retry,
            "https://shop",
        ));
        Fixture {
            pool,
            manager,
            wallet,
            registry,
            push_rx,
            retry_rx,
        }
    }

    async fn pending_order(pool: &SqlitePool, telegram_id: i64) -> Order {
        let buyer = seed_user(pool, telegram_id).await;
        let offer = seed_offer(pool, 100).await;
        let paid = payment::create(
            pool,
            PaymentCreate {
                external_id: format!("inv_{telegram_id}"),
                user_id: buyer.id,
                offer_id: offer.id,
                amount_to_pay: Amount::from(100),
                currency: Currency::Usdt,
                pay_url: None,
            },
        )
        .await
        .unwrap();
        payment::mark_completed(pool, &paid.external_id).await.unwrap();
        order::create(pool, &paid).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_transition_table() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let f = fixture().await;
                let created = pending_order(&f.pool, 100).await;
                // force the starting status directly in storage
                if from != OrderStatus::Pending {
                    order::update_status(&f.pool, created.id, OrderStatus::Pending, from)
                        .await
                        .unwrap()
                        .unwrap();
                }

                let result = f.manager.transition(created.id, to, Actor::Admin).await;
                let stored = order::find_by_id(&f.pool, created.id).await.unwrap().unwrap();

                if from.can_transition_to(to) {
                    let updated = result.unwrap();
                    assert_eq!(updated.status, to, "{from} -> {to}");
                    assert_eq!(stored.status, to);
                } else if from == OrderStatus::Invalid && to == OrderStatus::Invalid {
                    assert_eq!(result.unwrap().status, OrderStatus::Invalid);
                } else {
                    match result {
                        Err(CoreError::InvalidTransition {
                            current, requested, ..
                        }) => {
                            assert_eq!(current, from);
                            assert_eq!(requested, to);
                        }
                        other => panic!("{from} -> {to}: unexpected {other:?}"),
                    }
                    assert_eq!(stored.status, from, "order untouched");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_missing_order() {
        let f = fixture().await;
        let err = f
            .manager
            .transition(404, OrderStatus::Process, Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::OrderNotFound(404)));
    }

    #[tokio::test]
    async fn test_cancel_refunds_and_records_once() {
        let f = fixture().await;
        let created = pending_order(&f.pool, 200).await;

        let canceled = f
            .manager
            .transition(created.id, OrderStatus::Canceled, Actor::Admin)
            .await
            .unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled);
        assert_eq!(f.wallet.transfer_count(), 1);
        let refund = transaction::find_by_order_kind(&f.pool, created.id, TransactionKind::Refund)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refund.amount, Amount::from(100));
    }

    #[tokio::test]
    async fn test_failed_refund_commits_nothing() {
        let f = fixture().await;
        let created = pending_order(&f.pool, 300).await;
        f.wallet.set_failing(true);

        let err = f
            .manager
            .transition(created.id, OrderStatus::Canceled, Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Settlement(_)));

        let stored = order::find_by_id(&f.pool, created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(transaction::find_by_order(&f.pool, created.id).await.unwrap().is_empty());
        assert!(chat::history(&f.pool, created.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_customer_rights() {
        let f = fixture().await;
        let created = pending_order(&f.pool, 400).await;

        let err = f
            .manager
            .transition(created.id, OrderStatus::Canceled, Actor::Customer(created.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = f
            .manager
            .transition(created.id, OrderStatus::Process, Actor::Customer(created.user_id + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let updated = f
            .manager
            .transition(created.id, OrderStatus::Process, Actor::Customer(created.user_id))
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Process);
    }

    #[tokio::test]
    async fn test_transition_notifies_customer_and_admins() {
        let f = fixture().await;
        let created = pending_order(&f.pool, 500).await;
        let (_sid, mut client_rx) = f.registry.register_user(created.user_id);
        let (_aid, mut admin_rx) = f.registry.register_admin();

        f.manager
            .transition(created.id, OrderStatus::Process, Actor::Admin)
            .await
            .unwrap();

        let mut saw_message = false;
        let mut saw_update = false;
        while let Ok(event) = client_rx.try_recv() {
            match event {
                ClientEvent::Message { message } => {
                    assert_eq!(message.sender(), ChatSender::System);
                    saw_message = true;
                }
                ClientEvent::OrderUpdated { order } => {
                    assert_eq!(order.status, OrderStatus::Process);
                    saw_update = true;
                }
                _ => {}
            }
        }
        assert!(saw_message && saw_update);

        let mut admin_updates = 0;
        while let Ok(event) = admin_rx.try_recv() {
            if matches!(event, AdminEvent::OrderUpdated { .. }) {
                admin_updates += 1;
            }
        }
        assert_eq!(admin_updates, 1);
        assert_eq!(chat::history(&f.pool, created.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_pushes_review_prompt() {
        let mut f = fixture().await;
        let created = pending_order(&f.pool, 600).await;
        f.manager
            .transition(created.id, OrderStatus::Process, Actor::Admin)
            .await
            .unwrap();
        f.manager
            .transition(created.id, OrderStatus::Completed, Actor::Admin)
            .await
            .unwrap();

        let mut pushes = Vec::new();
        while let Ok(push) = f.push_rx.try_recv() {
            pushes.push(push);
        }
        // offline customer: two status messages and the review prompt
        assert_eq!(pushes.len(), 3);
        assert!(pushes.iter().all(|p| p.chat_id == 600));
        assert!(pushes[2].text.contains("review"));
        assert!(f.retry_rx.try_recv().is_err(), "no referral, nothing to retry");

        // one chat row per status change; the review prompt is push-only
        let history = chat::history(&f.pool, created.user_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, pushes[0].text);
        assert_eq!(history[1].content, pushes[1].text);
    }

    #[tokio::test]
    async fn test_submit_details_from_pending_and_invalid() {
        let f = fixture().await;
        let created = pending_order(&f.pool, 700).await;
        let mut fields = Map::new();
        fields.insert("login".into(), Value::from("player1"));

        let updated = f
            .manager
            .submit_details(created.id, created.user_id, fields.clone())
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Process);
        assert!(updated.order_details_id.is_some());

        // process: details are locked
        let err = f
            .manager
            .submit_details(created.id, created.user_id, fields.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));

        f.manager
            .transition(created.id, OrderStatus::Invalid, Actor::Admin)
            .await
            .unwrap();
        fields.insert("login".into(), Value::from("player2"));
        let updated = f
            .manager
            .submit_details(created.id, created.user_id, fields)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Process);

        let details = order_details::find_by_order(&f.pool, created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.fields["login"], "player2");
        assert_eq!(Some(details.id), updated.order_details_id);
    }

    #[tokio::test]
    async fn test_submit_details_rejects_other_user_and_empty() {
        let f = fixture().await;
        let created = pending_order(&f.pool, 800).await;
        let mut fields = Map::new();
        fields.insert("login".into(), Value::from("x"));

        let err = f
            .manager
            .submit_details(created.id, created.user_id + 1, fields)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = f
            .manager
            .submit_details(created.id, created.user_id, Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_cancel_refunds_once() {
        let f = fixture().await;
        let created = pending_order(&f.pool, 900).await;

        let a = {
            let manager = f.manager.clone();
            tokio::spawn(async move {
                manager
                    .transition(created.id, OrderStatus::Canceled, Actor::Admin)
                    .await
            })
        };
        let b = {
            let manager = f.manager.clone();
            tokio::spawn(async move {
                manager
                    .transition(created.id, OrderStatus::Canceled, Actor::Admin)
                    .await
            })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(f.wallet.transfer_count(), 1);
        assert!(f.manager.locks.is_empty());
    }
}
