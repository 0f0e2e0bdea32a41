//! Catalog and notification settings tests against the in-memory store.

use common::UserId;
use domain::{
    Actor, CatalogService, CustomerQuery, CustomerUpdate, DomainError, NewCustomer, NewProduct,
    NotificationSettings, NotificationSettingsService, ProductQuery, ProductUpdate, Recipient,
    Role, UnitOfMeasure,
};
use store::InMemoryStore;

fn admin() -> Actor {
    Actor::new(UserId::new(), Role::Admin)
}

fn new_product(sku: &str) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: "Zapato de seguridad".to_string(),
        brand: Some("Workman".to_string()),
        format: None,
        price_cents: 35_990,
        cost_cents: 21_000,
        stock: 4,
        min_stock: 2,
        category: Some("Calzado".to_string()),
        unit_of_measure: UnitOfMeasure::Pair,
    }
}

fn new_customer(name: &str, tax_id: Option<&str>) -> NewCustomer {
    NewCustomer {
        name: name.to_string(),
        tax_id: tax_id.map(str::to_string),
        email: Some("compras@example.cl".to_string()),
        phone: None,
        address: Default::default(),
        notes: None,
    }
}

#[tokio::test]
async fn product_sku_must_be_unique() {
    let catalog = CatalogService::new(InMemoryStore::new());
    let actor = admin();

    let product = catalog.create_product(&actor, new_product("zap-40")).await.unwrap();
    assert_eq!(product.sku.as_str(), "ZAP-40");

    let err = catalog
        .create_product(&actor, new_product(" ZAP-40 "))
        .await
        .unwrap_err();
    assert_eq!(err.details(), ["sku: already in use"]);
}

#[tokio::test]
async fn stock_adjustments_are_bounded() {
    let catalog = CatalogService::new(InMemoryStore::new());
    let actor = admin();
    let product = catalog.create_product(&actor, new_product("ZAP-41")).await.unwrap();

    let product = catalog.adjust_stock(&actor, product.id, -2).await.unwrap();
    assert_eq!(product.stock, 2);
    assert!(product.is_low_stock());

    let err = catalog.adjust_stock(&actor, product.id, -3).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    let err = catalog
        .adjust_stock(&actor, product.id, i64::MAX)
        .await
        .unwrap_err();
    assert_eq!(
        err.details(),
        [format!(
            "delta: adjustment {} would exceed the stock limit (current 2)",
            i64::MAX
        )]
    );

    let low = catalog
        .list_products(
            &actor,
            &ProductQuery {
                low_stock_only: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(low.len(), 1);
}

#[tokio::test]
async fn sales_cannot_edit_catalog() {
    let catalog = CatalogService::new(InMemoryStore::new());
    let sales = Actor::new(UserId::new(), Role::Vendedor);

    let product = catalog.create_product(&sales, new_product("ZAP-42")).await.unwrap();

    let err = catalog
        .update_product(
            &sales,
            product.id,
            ProductUpdate {
                name: Some("Otro".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));

    let err = catalog
        .deactivate_product(&sales, product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));
}

#[tokio::test]
async fn customer_tax_id_is_normalized_and_unique() {
    let catalog = CatalogService::new(InMemoryStore::new());
    let actor = admin();

    let acme = catalog
        .create_customer(&actor, new_customer("Acme", Some("76.086.428-5")))
        .await
        .unwrap();
    assert_eq!(acme.tax_id.as_ref().unwrap().as_str(), "76086428-5");

    let err = catalog
        .create_customer(&actor, new_customer("Copia", Some("76086428-5")))
        .await
        .unwrap_err();
    assert_eq!(err.details(), ["tax_id: already in use"]);

    let err = catalog
        .create_customer(&actor, new_customer("Mala", Some("76086428-4")))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn customer_update_and_soft_delete() {
    let catalog = CatalogService::new(InMemoryStore::new());
    let actor = admin();
    let acme = catalog
        .create_customer(&actor, new_customer("Acme", None))
        .await
        .unwrap();

    let renamed = catalog
        .update_customer(
            &actor,
            acme.id,
            CustomerUpdate {
                name: Some("Acme SpA".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Acme SpA");

    let retired = catalog.deactivate_customer(&actor, acme.id).await.unwrap();
    assert!(!retired.active);

    let active = catalog
        .list_customers(
            &actor,
            &CustomerQuery {
                active_only: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(active.is_empty());

    // Soft-deleted customers stay readable.
    assert!(catalog.get_customer(&actor, acme.id).await.is_ok());
}

#[tokio::test]
async fn notification_settings_are_admin_only() {
    let service = NotificationSettingsService::new(InMemoryStore::new());
    let billing = Actor::new(UserId::new(), Role::Facturador);

    assert!(matches!(
        service.get(&billing).await.unwrap_err(),
        DomainError::Forbidden
    ));

    let settings = NotificationSettings {
        enabled: true,
        notify_on_status_change: true,
        recipients: vec![Recipient::new("ventas@example.cl", "Ventas")],
    };
    service.replace(&admin(), settings.clone()).await.unwrap();
    assert_eq!(service.get(&admin()).await.unwrap(), settings);

    let invalid = NotificationSettings {
        recipients: vec![Recipient::new("no-es-correo", "X")],
        ..Default::default()
    };
    assert!(matches!(
        service.replace(&admin(), invalid).await.unwrap_err(),
        DomainError::Validation { .. }
    ));
}

#[tokio::test]
async fn import_keeps_good_rows_and_reports_bad_ones() {
    let catalog = CatalogService::new(InMemoryStore::new());
    let seller = Actor::new(UserId::new(), Role::Vendedor);

    let report = catalog
        .import_products(
            &seller,
            vec![new_product("IMP-1"), new_product("imp-1"), new_product("IMP-2")],
        )
        .await
        .unwrap();

    assert_eq!(report.created.len(), 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].row, 1);
    assert_eq!(report.rejected[0].details, ["sku: already in use"]);
}

#[tokio::test]
async fn import_rejects_empty_batches_and_billing_role() {
    let catalog = CatalogService::new(InMemoryStore::new());

    let err = catalog.import_customers(&admin(), Vec::new()).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    let billing = Actor::new(UserId::new(), Role::Facturador);
    let err = catalog
        .import_customers(&billing, vec![new_customer("Acme", None)])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden));
}
