//! Outbox relay tests against the in-memory store.

use std::time::Duration;

use common::UserId;
use domain::{
    Actor, CatalogService, CreateOrder, CreateOrderOutcome, NewCustomer, NewProduct,
    NotificationSettings, Order, OrderLine, OrderService, OrderStatus, OutboxRepository,
    Recipient, Role, SettingsRepository, UnitOfMeasure,
};
use notifications::{InMemoryMailer, NotificationDispatcher, OutboxRelay, RelayConfig};
use store::InMemoryStore;

struct Fixture {
    store: InMemoryStore,
    mailer: InMemoryMailer,
    orders: OrderService<InMemoryStore, InMemoryStore>,
    admin: Actor,
}

impl Fixture {
    async fn new(settings: NotificationSettings) -> Self {
        let store = InMemoryStore::new();
        store.save_notification_settings(&settings).await.unwrap();

        Self {
            orders: OrderService::new(store.clone(), store.clone()),
            store,
            mailer: InMemoryMailer::new(),
            admin: Actor::new(UserId::new(), Role::Admin),
        }
    }

    fn relay(
        &self,
        config: RelayConfig,
    ) -> OutboxRelay<InMemoryStore, InMemoryStore, InMemoryMailer> {
        OutboxRelay::new(
            self.store.clone(),
            self.store.clone(),
            NotificationDispatcher::new(self.mailer.clone()),
            config,
        )
    }

    async fn place_order(&self) -> Order {
        let catalog = CatalogService::new(self.store.clone());
        let customer = catalog
            .create_customer(
                &self.admin,
                NewCustomer {
                    name: "Acme".to_string(),
                    tax_id: None,
                    email: None,
                    phone: None,
                    address: Default::default(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        let product = catalog
            .create_product(
                &self.admin,
                NewProduct {
                    sku: "GUA-01".to_string(),
                    name: "Guante nitrilo".to_string(),
                    brand: None,
                    format: None,
                    price_cents: 1500,
                    cost_cents: 900,
                    stock: 10,
                    min_stock: 1,
                    category: None,
                    unit_of_measure: UnitOfMeasure::Pair,
                },
            )
            .await
            .unwrap();

        match self
            .orders
            .create_order(
                &self.admin,
                CreateOrder::new(customer.id, vec![OrderLine::new(product.id, 3)]),
            )
            .await
            .unwrap()
        {
            CreateOrderOutcome::Created(order) => order,
            CreateOrderOutcome::Merged(_) => panic!("expected a new order"),
        }
    }
}

fn settings(notify_on_status_change: bool) -> NotificationSettings {
    NotificationSettings {
        enabled: true,
        notify_on_status_change,
        recipients: vec![
            Recipient::new("ventas@example.cl", "Ventas"),
            Recipient::new("bodega@example.cl", "Bodega"),
        ],
    }
}

#[tokio::test]
async fn placed_order_notifies_every_recipient_once() {
    let fixture = Fixture::new(settings(false)).await;
    let relay = fixture.relay(RelayConfig::default());
    let order = fixture.place_order().await;

    assert_eq!(relay.run_once().await.unwrap(), 1);
    assert_eq!(fixture.mailer.sent_count(), 2);
    let subject = format!("Nueva orden {}", order.order_number().unwrap());
    assert!(fixture.mailer.sent().iter().all(|email| email.subject == subject));

    // Already published: nothing more to send.
    assert_eq!(relay.run_once().await.unwrap(), 0);
    assert_eq!(fixture.mailer.sent_count(), 2);
}

#[tokio::test]
async fn status_changes_notify_only_when_enabled() {
    let fixture = Fixture::new(settings(false)).await;
    let relay = fixture.relay(RelayConfig::default());
    let order = fixture.place_order().await;
    fixture
        .orders
        .change_status(&fixture.admin, order.id(), OrderStatus::Purchasing)
        .await
        .unwrap();

    assert_eq!(relay.run_once().await.unwrap(), 2);
    assert_eq!(fixture.mailer.sent_count(), 2);

    fixture
        .store
        .save_notification_settings(&settings(true))
        .await
        .unwrap();
    fixture
        .orders
        .change_status(&fixture.admin, order.id(), OrderStatus::Invoiced)
        .await
        .unwrap();

    assert_eq!(relay.run_once().await.unwrap(), 1);
    assert_eq!(fixture.mailer.sent_count(), 4);
    assert!(fixture.mailer.sent()[3].subject.ends_with("facturado"));
}

#[tokio::test]
async fn failed_recipient_does_not_block_publication() {
    let fixture = Fixture::new(settings(false)).await;
    fixture.mailer.fail_for("bodega@example.cl");
    let relay = fixture.relay(RelayConfig::default());
    fixture.place_order().await;

    assert_eq!(relay.run_once().await.unwrap(), 1);
    assert_eq!(fixture.mailer.sent_count(), 1);
    assert!(fixture.store.unpublished(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn disabled_notifications_still_drain_the_outbox() {
    let fixture = Fixture::new(NotificationSettings {
        enabled: false,
        ..settings(true)
    })
    .await;
    let relay = fixture.relay(RelayConfig::default());
    fixture.place_order().await;

    assert_eq!(relay.run_once().await.unwrap(), 1);
    assert_eq!(fixture.mailer.sent_count(), 0);
}

#[tokio::test]
async fn running_relay_wakes_on_demand_and_stops() {
    let fixture = Fixture::new(settings(false)).await;
    let relay = fixture.relay(RelayConfig {
        poll_interval: Duration::from_secs(3600),
        batch_size: 10,
    });
    let waker = relay.waker();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(relay.run(async move {
        let _ = stopped.await;
    }));

    fixture.place_order().await;
    waker.notify_one();

    tokio::time::timeout(Duration::from_secs(5), async {
        while fixture.mailer.sent_count() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay did not deliver in time");

    stop.send(()).unwrap();
    handle.await.unwrap();
}
