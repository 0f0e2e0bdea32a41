use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, EventId, OrderId, ProductId, Version};
use domain::{
    Aggregate, CatalogRepository, Customer, CustomerQuery, NotificationSettings, Order,
    OrderChange, OrderNumber, OrderQuery, OrderRepository, OrderStatus, OutboxRepository, Product,
    ProductQuery, RecordedEvent, RepositoryError, SettingsRepository, Sku, TaxId,
};
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{Result, StoreError};

const NOTIFICATION_SETTINGS_KEY: &str = "notifications";

/// PostgreSQL-backed implementation of every repository trait.
///
/// Aggregates live in a `document` JSONB column. Filtered and constrained
/// fields are duplicated into plain columns.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn document<T: DeserializeOwned>(row: &PgRow) -> Result<T> {
        let value: serde_json::Value = row.try_get("document")?;
        Ok(serde_json::from_value(value)?)
    }

    fn row_to_event(row: PgRow) -> Result<RecordedEvent> {
        let payload: serde_json::Value = row.try_get("payload")?;

        Ok(RecordedEvent {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            sequence: Version::new(row.try_get("sequence")?),
            event_type: row.try_get("event_type")?,
            payload: serde_json::from_value(payload)?,
            recorded_at: row.try_get("recorded_at")?,
            published_at: row.try_get("published_at")?,
        })
    }

    fn conflict(change: &OrderChange, actual: Version) -> StoreError {
        tracing::warn!(
            order_id = %change.order.id(),
            expected = %change.expected_version,
            %actual,
            "stale order version"
        );
        RepositoryError::ConcurrencyConflict {
            aggregate: "order",
            id: change.order.id().to_string(),
            expected: change.expected_version,
            actual,
        }
        .into()
    }

    /// Locks the affected rows and compares every stored version before
    /// anything is written.
    async fn check_versions(
        tx: &mut Transaction<'_, Postgres>,
        changes: &[OrderChange],
    ) -> Result<()> {
        let ids: Vec<Uuid> = changes.iter().map(|c| c.order.id().as_uuid()).collect();
        let rows = sqlx::query("SELECT id, version FROM orders WHERE id = ANY($1) FOR UPDATE")
            .bind(&ids)
            .fetch_all(&mut **tx)
            .await?;

        let mut stored = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.try_get("id")?;
            let version: i64 = row.try_get("version")?;
            stored.insert(id, Version::new(version));
        }

        for change in changes {
            let actual = stored
                .get(&change.order.id().as_uuid())
                .copied()
                .unwrap_or_else(Version::initial);
            if actual != change.expected_version {
                return Err(Self::conflict(change, actual));
            }
        }
        Ok(())
    }

    async fn write_change(tx: &mut Transaction<'_, Postgres>, change: &OrderChange) -> Result<()> {
        let order = &change.order;
        let order_number = order.order_number().ok_or_else(|| {
            RepositoryError::Backend(format!("order {} has no order number", order.id()))
        })?;
        let document = serde_json::to_value(order)?;

        if change.is_insert() {
            sqlx::query(
                r#"
                INSERT INTO orders (
                    id, order_number, customer_id, status, version, document,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(order_number.value() as i64)
            .bind(order.customer_id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.version().as_i64())
            .bind(&document)
            .bind(order.created_at())
            .bind(order.updated_at())
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.constraint() == Some("orders_pkey") {
                        return Self::conflict(change, Version::first());
                    }
                    if db_err.constraint() == Some("unique_order_number") {
                        return RepositoryError::Duplicate {
                            entity: "order",
                            field: "order_number",
                            value: order_number.to_string(),
                        }
                        .into();
                    }
                }
                StoreError::Database(e)
            })?;
        } else {
            let updated = sqlx::query(
                r#"
                UPDATE orders
                SET customer_id = $2, status = $3, version = $4, document = $5, updated_at = $6
                WHERE id = $1 AND version = $7
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(order.customer_id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.version().as_i64())
            .bind(&document)
            .bind(order.updated_at())
            .bind(change.expected_version.as_i64())
            .execute(&mut **tx)
            .await?;

            if updated.rows_affected() == 0 {
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                        .bind(order.id().as_uuid())
                        .fetch_optional(&mut **tx)
                        .await?;
                return Err(Self::conflict(
                    change,
                    actual.map(Version::new).unwrap_or_else(Version::initial),
                ));
            }
        }

        for event in change.recorded_events() {
            let payload = serde_json::to_value(&event.payload)?;

            sqlx::query(
                r#"
                INSERT INTO order_events (id, order_id, sequence, event_type, payload, recorded_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(event.order_id.as_uuid())
            .bind(event.sequence.as_i64())
            .bind(&event.event_type)
            .bind(payload)
            .bind(event.recorded_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_order_event_sequence")
                {
                    return Self::conflict(change, event.sequence);
                }
                StoreError::Database(e)
            })?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(orders = changes.len()))]
    async fn save_changes(&self, changes: &[OrderChange]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::check_versions(&mut tx, changes).await?;
        for change in changes {
            Self::write_change(&mut tx, change).await?;
        }

        tx.commit().await?;
        tracing::debug!(
            events = changes.iter().map(|change| change.events.len()).sum::<usize>(),
            "order changes committed"
        );
        Ok(())
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let mut sql = String::from("SELECT document FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }
        if query.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.created_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }
        if query.overdue_on.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND status = '{}' AND document->>'delivered_at' IS NULL \
                 AND (document->>'delivery_due')::date < ${param_count}",
                OrderStatus::Invoiced.as_str()
            ));
        }

        sql.push_str(" ORDER BY created_at DESC, order_number DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(customer_id) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer_id.as_uuid());
        }
        if let Some(statuses) = &query.statuses {
            let statuses: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();
            sqlx_query = sqlx_query.bind(statuses);
        }
        if let Some(from) = query.created_from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.created_to {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(today) = query.overdue_on {
            sqlx_query = sqlx_query.bind(today);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::document).collect()
    }

    async fn recent_orders(
        &self,
        customer_id: CustomerId,
        since: DateTime<Utc>,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>> {
        let statuses: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();
        let rows = sqlx::query(
            r#"
            SELECT document FROM orders
            WHERE customer_id = $1 AND created_at >= $2 AND status = ANY($3)
            ORDER BY created_at DESC, order_number DESC
            "#,
        )
        .bind(customer_id.as_uuid())
        .bind(since)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::document).collect()
    }

    async fn insert_product_row(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, active, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.sku.as_str())
        .bind(product.active)
        .bind(serde_json::to_value(product)?)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::sku_conflict(e, product))?;
        Ok(())
    }

    async fn update_product_row(&self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET sku = $2, active = $3, document = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.sku.as_str())
        .bind(product.active)
        .bind(serde_json::to_value(product)?)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::sku_conflict(e, product))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity: "product",
                id: product.id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn sku_conflict(e: sqlx::Error, product: &Product) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some("unique_product_sku")
        {
            return RepositoryError::Duplicate {
                entity: "product",
                field: "sku",
                value: product.sku.to_string(),
            }
            .into();
        }
        StoreError::Database(e)
    }

    async fn query_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut sql = String::from("SELECT document FROM products WHERE 1=1");
        let mut param_count = 0;

        if query.active_only {
            sql.push_str(" AND active");
        }
        if query.low_stock_only {
            sql.push_str(
                " AND (document->>'stock')::bigint <= (document->>'min_stock')::bigint",
            );
        }

        sql.push_str(" ORDER BY sku ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::document).collect()
    }

    async fn change_stock(&self, id: ProductId, delta: i64, at: DateTime<Utc>) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT document FROM products WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;
        let mut product: Product = Self::document(&row)?;

        let stock = i64::from(product.stock)
            .checked_add(delta)
            .and_then(|stock| u32::try_from(stock).ok())
            .ok_or(RepositoryError::InsufficientStock {
                product_id: id,
                stock: product.stock,
                delta,
            })?;
        product.stock = stock;
        product.updated_at = at;

        sqlx::query("UPDATE products SET document = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(serde_json::to_value(&product)?)
            .bind(at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(product)
    }

    async fn insert_customer_row(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, tax_id, active, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(customer.tax_id.as_ref().map(TaxId::as_str))
        .bind(customer.active)
        .bind(serde_json::to_value(customer)?)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::tax_id_conflict(e, customer))?;
        Ok(())
    }

    async fn update_customer_row(&self, customer: &Customer) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET name = $2, tax_id = $3, active = $4, document = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(customer.tax_id.as_ref().map(TaxId::as_str))
        .bind(customer.active)
        .bind(serde_json::to_value(customer)?)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::tax_id_conflict(e, customer))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity: "customer",
                id: customer.id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn tax_id_conflict(e: sqlx::Error, customer: &Customer) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some("unique_customer_tax_id")
        {
            return RepositoryError::Duplicate {
                entity: "customer",
                field: "tax_id",
                value: customer
                    .tax_id
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            }
            .into();
        }
        StoreError::Database(e)
    }

    async fn query_customers(&self, query: &CustomerQuery) -> Result<Vec<Customer>> {
        let mut sql = String::from("SELECT document FROM customers WHERE 1=1");
        let mut param_count = 0;

        if query.active_only {
            sql.push_str(" AND active");
        }

        sql.push_str(" ORDER BY name ASC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::document).collect()
    }

    async fn fetch_document<T: DeserializeOwned>(&self, sql: &str, key: Uuid) -> Result<Option<T>> {
        let row = sqlx::query(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::document).transpose()
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn next_order_number(&self) -> std::result::Result<OrderNumber, RepositoryError> {
        let value: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(OrderNumber::new(value as u64))
    }

    async fn save(&self, change: OrderChange) -> std::result::Result<(), RepositoryError> {
        Ok(self.save_changes(std::slice::from_ref(&change)).await?)
    }

    async fn save_batch(
        &self,
        changes: Vec<OrderChange>,
    ) -> std::result::Result<(), RepositoryError> {
        Ok(self.save_changes(&changes).await?)
    }

    async fn get(&self, id: OrderId) -> std::result::Result<Option<Order>, RepositoryError> {
        Ok(self
            .fetch_document("SELECT document FROM orders WHERE id = $1", id.as_uuid())
            .await?)
    }

    async fn find_recent_for_customer(
        &self,
        customer_id: CustomerId,
        since: DateTime<Utc>,
        statuses: &[OrderStatus],
    ) -> std::result::Result<Vec<Order>, RepositoryError> {
        Ok(self.recent_orders(customer_id, since, statuses).await?)
    }

    async fn list(&self, query: &OrderQuery) -> std::result::Result<Vec<Order>, RepositoryError> {
        Ok(self.query_orders(query).await?)
    }

    async fn history(
        &self,
        id: OrderId,
    ) -> std::result::Result<Vec<RecordedEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, sequence, event_type, payload, recorded_at, published_at
            FROM order_events
            WHERE order_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?)
    }
}

#[async_trait]
impl OutboxRepository for PostgresStore {
    async fn unpublished(
        &self,
        limit: usize,
    ) -> std::result::Result<Vec<RecordedEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, sequence, event_type, payload, recorded_at, published_at
            FROM order_events
            WHERE published_at IS NULL
            ORDER BY recorded_at ASC, sequence ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?)
    }

    async fn mark_published(
        &self,
        event_ids: &[EventId],
        at: DateTime<Utc>,
    ) -> std::result::Result<(), RepositoryError> {
        let ids: Vec<Uuid> = event_ids.iter().map(EventId::as_uuid).collect();
        sqlx::query(
            "UPDATE order_events SET published_at = $2 WHERE id = ANY($1) AND published_at IS NULL",
        )
        .bind(ids)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn insert_product(&self, product: &Product) -> std::result::Result<(), RepositoryError> {
        Ok(self.insert_product_row(product).await?)
    }

    async fn update_product(&self, product: &Product) -> std::result::Result<(), RepositoryError> {
        Ok(self.update_product_row(product).await?)
    }

    async fn get_product(
        &self,
        id: ProductId,
    ) -> std::result::Result<Option<Product>, RepositoryError> {
        Ok(self
            .fetch_document("SELECT document FROM products WHERE id = $1", id.as_uuid())
            .await?)
    }

    async fn get_products(
        &self,
        ids: &[ProductId],
    ) -> std::result::Result<Vec<Product>, RepositoryError> {
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query("SELECT document FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(rows
            .iter()
            .map(Self::document)
            .collect::<Result<Vec<_>>>()?)
    }

    async fn find_product_by_sku(
        &self,
        sku: &Sku,
    ) -> std::result::Result<Option<Product>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM products WHERE sku = $1")
            .bind(sku.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(row.as_ref().map(Self::document).transpose()?)
    }

    async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> std::result::Result<Vec<Product>, RepositoryError> {
        Ok(self.query_products(query).await?)
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> std::result::Result<Product, RepositoryError> {
        Ok(self.change_stock(id, delta, at).await?)
    }

    async fn insert_customer(
        &self,
        customer: &Customer,
    ) -> std::result::Result<(), RepositoryError> {
        Ok(self.insert_customer_row(customer).await?)
    }

    async fn update_customer(
        &self,
        customer: &Customer,
    ) -> std::result::Result<(), RepositoryError> {
        Ok(self.update_customer_row(customer).await?)
    }

    async fn get_customer(
        &self,
        id: CustomerId,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        Ok(self
            .fetch_document("SELECT document FROM customers WHERE id = $1", id.as_uuid())
            .await?)
    }

    async fn find_customer_by_tax_id(
        &self,
        tax_id: &TaxId,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM customers WHERE tax_id = $1")
            .bind(tax_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(row.as_ref().map(Self::document).transpose()?)
    }

    async fn list_customers(
        &self,
        query: &CustomerQuery,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.query_customers(query).await?)
    }
}

#[async_trait]
impl SettingsRepository for PostgresStore {
    async fn notification_settings(
        &self,
    ) -> std::result::Result<NotificationSettings, RepositoryError> {
        let row = sqlx::query("SELECT document FROM settings WHERE key = $1")
            .bind(NOTIFICATION_SETTINGS_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let settings: Option<NotificationSettings> = row.as_ref().map(Self::document).transpose()?;
        Ok(settings.unwrap_or_default())
    }

    async fn save_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> std::result::Result<(), RepositoryError> {
        let document = serde_json::to_value(settings)?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, document, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(NOTIFICATION_SETTINGS_KEY)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }
}
