//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{CustomerId, OrderItemId, ProductId, UserId, Version};
use domain::order::OrderPlacedData;
use domain::{
    Address, Aggregate, CatalogRepository, Customer, CustomerQuery, Money, NotificationSettings,
    Order, OrderChange, OrderItem, OrderNumber, OrderQuery, OrderRepository, OrderStatus,
    OutboxRepository, Product, ProductQuery, Recipient, RepositoryError, SettingsRepository, Sku,
    TaxId, UnitOfMeasure,
};
use serial_test::serial;
use sqlx::PgPool;
use store::PostgresStore;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/001_initial_schema.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_events, orders, customers, products, settings")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn customer(name: &str, tax_id: Option<&str>) -> Customer {
    let now = Utc::now();
    Customer {
        id: CustomerId::new(),
        name: name.to_string(),
        tax_id: tax_id.map(|raw| TaxId::parse(raw).unwrap()),
        email: None,
        phone: None,
        address: Address::default(),
        notes: None,
        active: true,
        created_by: UserId::new(),
        created_at: now,
        updated_at: now,
    }
}

fn product(sku: &str, stock: u32, min_stock: u32) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(),
        sku: Sku::parse(sku).unwrap(),
        name: format!("Producto {sku}"),
        brand: Some("3M".to_string()),
        format: None,
        price: Money::from_cents(2500),
        cost: Money::from_cents(1200),
        stock,
        min_stock,
        category: Some("EPP".to_string()),
        unit_of_measure: UnitOfMeasure::Unit,
        active: true,
        created_by: UserId::new(),
        created_at: now,
        updated_at: now,
    }
}

async fn placed(
    store: &PostgresStore,
    customer_id: CustomerId,
    created_at: chrono::DateTime<Utc>,
) -> OrderChange {
    let order_number = store.next_order_number().await.unwrap();
    let order = Order::default();
    let events = order
        .place(OrderPlacedData {
            order_id: common::OrderId::new(),
            order_number,
            customer_id,
            items: vec![OrderItem {
                id: OrderItemId::new(),
                product_id: ProductId::new(),
                sku: Sku::parse("LEN-01").unwrap(),
                product_name: "Lentes".to_string(),
                quantity: 3,
                unit_price: Money::from_cents(990),
                unit_of_measure: UnitOfMeasure::Unit,
                brand: None,
                format: None,
                status: OrderStatus::Pending,
                notes: None,
            }],
            status: OrderStatus::Pending,
            delivery_due: None,
            notes: None,
            location: None,
            by: UserId::new(),
            at: created_at,
        })
        .unwrap();
    OrderChange::apply(order, events)
}

#[tokio::test]
#[serial]
async fn test_order_numbers_come_from_sequence() {
    let store = get_test_store().await;

    let first = store.next_order_number().await.unwrap();
    let second = store.next_order_number().await.unwrap();

    assert!(second > first);
    assert_eq!(second.value(), first.value() + 1);
}

#[tokio::test]
#[serial]
async fn test_save_and_load_order() {
    let store = get_test_store().await;
    let acme = customer("Acme", None);
    store.insert_customer(&acme).await.unwrap();

    let change = placed(&store, acme.id, Utc::now()).await;
    let id = change.order.id();
    store.save(change.clone()).await.unwrap();

    let loaded = store.get(id).await.unwrap().unwrap();
    assert_eq!(loaded.version(), Version::first());
    assert_eq!(loaded.items(), change.order.items());

    let history = store.history(id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event_type, "OrderPlaced");
}

#[tokio::test]
#[serial]
async fn test_stale_update_is_rejected() {
    let store = get_test_store().await;
    let acme = customer("Acme", None);
    store.insert_customer(&acme).await.unwrap();

    let change = placed(&store, acme.id, Utc::now()).await;
    let order = change.order.clone();
    store.save(change).await.unwrap();

    let events = order
        .change_status(OrderStatus::Purchasing, UserId::new(), Utc::now())
        .unwrap();
    store
        .save(OrderChange::apply(order.clone(), events))
        .await
        .unwrap();

    let events = order
        .change_status(OrderStatus::Invoiced, UserId::new(), Utc::now())
        .unwrap();
    let result = store.save(OrderChange::apply(order, events)).await;

    match result {
        Err(RepositoryError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, Version::new(1));
            assert_eq!(actual, Version::new(2));
        }
        other => panic!("expected concurrency conflict, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn test_failed_batch_rolls_back() {
    let store = get_test_store().await;
    let acme = customer("Acme", None);
    store.insert_customer(&acme).await.unwrap();

    let first = placed(&store, acme.id, Utc::now()).await;
    let second = placed(&store, acme.id, Utc::now()).await;
    store.save(first.clone()).await.unwrap();
    store.save(second.clone()).await.unwrap();

    let item = first.order.items()[0].id;
    let merge = first
        .order
        .merge_quantity(item, 2, UserId::new(), Utc::now())
        .unwrap();
    let good = OrderChange::apply(first.order.clone(), merge);

    // Re-applying the placement to the stored order is stale.
    let result = store.save_batch(vec![good, second]).await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConcurrencyConflict { .. })
    ));

    let reloaded = store.get(first.order.id()).await.unwrap().unwrap();
    assert_eq!(reloaded.items()[0].quantity, 3);
    assert_eq!(store.history(first.order.id()).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_find_recent_for_customer() {
    let store = get_test_store().await;
    let acme = customer("Acme", None);
    let other = customer("Otra", None);
    store.insert_customer(&acme).await.unwrap();
    store.insert_customer(&other).await.unwrap();

    let now = Utc::now();
    let stale = placed(&store, acme.id, now - Duration::hours(30)).await;
    let older = placed(&store, acme.id, now - Duration::hours(5)).await;
    let newer = placed(&store, acme.id, now - Duration::hours(2)).await;
    let foreign = placed(&store, other.id, now).await;
    let newer_id = newer.order.id();
    for change in [stale, older, newer, foreign] {
        store.save(change).await.unwrap();
    }

    let recent = store
        .find_recent_for_customer(acme.id, now - Duration::hours(24), &OrderStatus::OPEN)
        .await
        .unwrap();

    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id(), newer_id);
}

#[tokio::test]
#[serial]
async fn test_list_orders_with_filters() {
    let store = get_test_store().await;
    let acme = customer("Acme", None);
    store.insert_customer(&acme).await.unwrap();

    let pending = placed(&store, acme.id, Utc::now() - Duration::hours(1)).await;
    let invoiced = placed(&store, acme.id, Utc::now()).await;
    store.save(pending).await.unwrap();
    let order = invoiced.order.clone();
    store.save(invoiced).await.unwrap();

    let events = order
        .change_status(OrderStatus::Invoiced, UserId::new(), Utc::now())
        .unwrap();
    store.save(OrderChange::apply(order, events)).await.unwrap();

    let all = store.list(&OrderQuery::new()).await.unwrap();
    assert_eq!(all.len(), 2);

    let only_invoiced = store
        .list(&OrderQuery::new().status(OrderStatus::Invoiced))
        .await
        .unwrap();
    assert_eq!(only_invoiced.len(), 1);
    assert_eq!(only_invoiced[0].status(), OrderStatus::Invoiced);

    let page = store
        .list(&OrderQuery::for_customer(acme.id).limit(1).offset(1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].status(), OrderStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_outbox_publishing() {
    let store = get_test_store().await;
    let acme = customer("Acme", None);
    store.insert_customer(&acme).await.unwrap();
    store
        .save(placed(&store, acme.id, Utc::now()).await)
        .await
        .unwrap();

    let pending = store.unpublished(10).await.unwrap();
    assert_eq!(pending.len(), 1);

    let ids: Vec<_> = pending.iter().map(|event| event.event_id).collect();
    store.mark_published(&ids, Utc::now()).await.unwrap();

    assert!(store.unpublished(10).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_product_sku_is_unique() {
    let store = get_test_store().await;
    store.insert_product(&product("GUA-1", 5, 1)).await.unwrap();

    let result = store.insert_product(&product("gua-1", 1, 1)).await;
    assert!(matches!(
        result,
        Err(RepositoryError::Duplicate { field: "sku", .. })
    ));
}

#[tokio::test]
#[serial]
async fn test_adjust_stock() {
    let store = get_test_store().await;
    let guante = product("GUA-1", 5, 2);
    store.insert_product(&guante).await.unwrap();

    let updated = store.adjust_stock(guante.id, -3, Utc::now()).await.unwrap();
    assert_eq!(updated.stock, 2);
    assert!(updated.is_low_stock());

    let result = store.adjust_stock(guante.id, -5, Utc::now()).await;
    assert!(matches!(
        result,
        Err(RepositoryError::InsufficientStock { stock: 2, .. })
    ));

    let low = store
        .list_products(&ProductQuery {
            low_stock_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(low.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_customer_tax_id_is_unique() {
    let store = get_test_store().await;
    store
        .insert_customer(&customer("Acme", Some("76.086.428-5")))
        .await
        .unwrap();

    let result = store
        .insert_customer(&customer("Copia", Some("76086428-5")))
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::Duplicate { field: "tax_id", .. })
    ));

    let found = store
        .find_customer_by_tax_id(&TaxId::parse("76086428-5").unwrap())
        .await
        .unwrap();
    assert_eq!(found.unwrap().name, "Acme");
}

#[tokio::test]
#[serial]
async fn test_customers_listed_by_name() {
    let store = get_test_store().await;
    let mut inactive = customer("Zeta", None);
    inactive.active = false;
    store.insert_customer(&inactive).await.unwrap();
    store.insert_customer(&customer("Beta", None)).await.unwrap();
    store.insert_customer(&customer("Alfa", None)).await.unwrap();

    let names: Vec<String> = store
        .list_customers(&CustomerQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Alfa", "Beta", "Zeta"]);

    let active = store
        .list_customers(&CustomerQuery {
            active_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
}

#[tokio::test]
#[serial]
async fn test_notification_settings_roundtrip() {
    let store = get_test_store().await;
    assert_eq!(
        store.notification_settings().await.unwrap(),
        NotificationSettings::default()
    );

    let settings = NotificationSettings {
        enabled: true,
        notify_on_status_change: true,
        recipients: vec![Recipient::new("compras@acme.cl", "Compras")],
    };
    store.save_notification_settings(&settings).await.unwrap();

    assert_eq!(store.notification_settings().await.unwrap(), settings);
}

#[tokio::test]
#[serial]
async fn test_order_number_display() {
    let store = get_test_store().await;
    let number: OrderNumber = store.next_order_number().await.unwrap();
    assert!(number.to_string().starts_with("OC-"));
}
