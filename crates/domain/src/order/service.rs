//! Order lifecycle service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{OrderId, ProductId};

use crate::aggregate::Aggregate;
use crate::catalog::Product;
use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;
use crate::policy::{Actor, Operation};
use crate::repository::{
    CatalogRepository, OrderChange, OrderQuery, OrderRepository, RecordedEvent,
};

use super::consolidation::{ConsolidationPlan, MergeSummary, MergedLine, UnmergedLine};
use super::{
    CreateOrder, LOOKBACK_HOURS, Order, OrderEvent, OrderItem, OrderLine, OrderPlacedData,
    OrderStatus, OrderUpdate, OrderView, find_duplicates,
};

/// Result of a create request. Both variants are successes.
#[derive(Debug, Clone)]
pub enum CreateOrderOutcome {
    /// A new order was placed.
    Created(Order),
    /// The lines were folded into recent open orders; no order was placed.
    Merged(MergeSummary),
}

/// Service for the order lifecycle.
///
/// Every operation authorizes the actor first and runs all guard checks
/// before writing. Notifications are not sent from here: the events
/// written with each order feed the outbox relay.
pub struct OrderService<R: OrderRepository, C: CatalogRepository> {
    orders: R,
    catalog: C,
    clock: Arc<dyn Clock>,
}

impl<R: OrderRepository, C: CatalogRepository> OrderService<R, C> {
    /// Creates an order service reading the system time.
    pub fn new(orders: R, catalog: C) -> Self {
        Self {
            orders,
            catalog,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns a reference to the order repository.
    pub fn repository(&self) -> &R {
        &self.orders
    }

    /// Creates an order, or merges its lines into the customer's recent
    /// open orders when any line duplicates an open line there.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(
        &self,
        actor: &Actor,
        request: CreateOrder,
    ) -> Result<CreateOrderOutcome, DomainError> {
        actor.authorize(Operation::CreateOrder)?;
        request.check()?;

        let customer = self
            .catalog
            .get_customer(request.customer_id)
            .await?
            .ok_or_else(|| DomainError::not_found("customer", request.customer_id))?;
        if !customer.active {
            return Err(DomainError::InvalidReference {
                message: "Order references an inactive customer".to_string(),
                references: vec![format!("customer_id: {} is inactive", customer.id)],
            });
        }
        let products = self.resolve_products(&request.items).await?;

        let now = self.clock.now();
        let window_start = now - Duration::hours(LOOKBACK_HOURS);
        let candidates = self
            .orders
            .find_recent_for_customer(request.customer_id, window_start, &OrderStatus::OPEN)
            .await?;

        let plan = find_duplicates(request.customer_id, &candidates, &request.items, window_start);
        if plan.is_merge() {
            let summary = self
                .merge(actor, candidates, plan, &request.items, now)
                .await?;
            return Ok(CreateOrderOutcome::Merged(summary));
        }

        let items = request
            .items
            .iter()
            .filter_map(|line| {
                products
                    .get(&line.product_id)
                    .map(|product| OrderItem::from_line(line, product))
            })
            .collect();
        let order_number = self.orders.next_order_number().await?;

        let order = Order::default();
        let events = order.place(OrderPlacedData {
            order_id: OrderId::new(),
            order_number,
            customer_id: request.customer_id,
            items,
            status: request.initial_status(),
            delivery_due: request.delivery_due,
            notes: request.notes,
            location: request.location,
            by: actor.user_id,
            at: now,
        })?;
        let order = self.commit(OrderChange::apply(order, events)).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            %order_number,
            items = order.item_count(),
            total = %order.total(),
            "order created"
        );
        Ok(CreateOrderOutcome::Created(order))
    }

    /// Sets the status of an order and of all its items.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        actor.authorize(Operation::ChangeOrderStatus)?;

        let order = self.load(id).await?;
        let from = order.status();
        let events = order.change_status(status, actor.user_id, self.clock.now())?;
        if events.is_empty() {
            return Ok(order);
        }
        let order = self.commit(OrderChange::apply(order, events)).await?;

        metrics::counter!("order_status_changes_total", "status" => status.as_str()).increment(1);
        tracing::info!(order_id = %id, %from, to = %status, "order status changed");
        Ok(order)
    }

    /// Records delivery of an invoiced order.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, actor: &Actor, id: OrderId) -> Result<Order, DomainError> {
        actor.authorize(Operation::MarkDelivered)?;

        let order = self.load(id).await?;
        let events = order.mark_delivered(actor.user_id, self.clock.now())?;
        let order = self.commit(OrderChange::apply(order, events)).await?;

        metrics::counter!("orders_delivered_total").increment(1);
        tracing::info!(order_id = %id, delivered_at = ?order.delivered_at(), "order delivered");
        Ok(order)
    }

    /// Nullifies an open order at least seven days old.
    #[tracing::instrument(skip(self))]
    pub async fn nullify(&self, actor: &Actor, id: OrderId) -> Result<Order, DomainError> {
        actor.authorize(Operation::NullifyOrder)?;

        let order = self.load(id).await?;
        let events = order.nullify(actor.user_id, self.clock.now())?;
        let order = self.commit(OrderChange::apply(order, events)).await?;

        metrics::counter!("orders_nullified_total").increment(1);
        tracing::info!(order_id = %id, "order nullified");
        Ok(order)
    }

    /// Updates any subset of status, location, notes, delivery due date,
    /// customer and items. Setting `delivered_at` directly needs admin.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_order(
        &self,
        actor: &Actor,
        id: OrderId,
        update: OrderUpdate,
    ) -> Result<Order, DomainError> {
        actor.authorize(Operation::UpdateOrder)?;
        if update.delivered_at.is_some() {
            actor.authorize(Operation::OverrideDelivery)?;
        }
        update.check()?;

        if let Some(customer_id) = update.customer_id {
            if self.catalog.get_customer(customer_id).await?.is_none() {
                return Err(DomainError::not_found("customer", customer_id));
            }
        }

        let order = self.load(id).await?;
        let events = order.update(&update, actor.user_id, self.clock.now())?;
        if events.is_empty() {
            return Ok(order);
        }
        let status_changed = events
            .iter()
            .any(|event| matches!(event, OrderEvent::StatusChanged(_)));
        let order = self.commit(OrderChange::apply(order, events)).await?;

        if status_changed {
            metrics::counter!("order_status_changes_total", "status" => order.status().as_str())
                .increment(1);
        }
        tracing::info!(order_id = %id, status = %order.status(), "order updated");
        Ok(order)
    }

    /// Loads one order with its derived properties.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, actor: &Actor, id: OrderId) -> Result<OrderView, DomainError> {
        actor.authorize(Operation::ReadRecords)?;
        let order = self.load(id).await?;
        Ok(self.view(order))
    }

    /// Lists orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        actor: &Actor,
        query: &OrderQuery,
    ) -> Result<Vec<OrderView>, DomainError> {
        actor.authorize(Operation::ReadRecords)?;
        let orders = self.orders.list(query).await?;
        Ok(orders.into_iter().map(|order| self.view(order)).collect())
    }

    /// Returns the recorded events of an order.
    #[tracing::instrument(skip(self))]
    pub async fn history(
        &self,
        actor: &Actor,
        id: OrderId,
    ) -> Result<Vec<RecordedEvent>, DomainError> {
        actor.authorize(Operation::ReadRecords)?;
        self.load(id).await?;
        Ok(self.orders.history(id).await?)
    }

    /// Attaches derived properties as of today.
    pub fn view(&self, order: Order) -> OrderView {
        OrderView::new(order, self.clock.today())
    }

    async fn load(&self, id: OrderId) -> Result<Order, DomainError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", id))
    }

    async fn commit(&self, change: OrderChange) -> Result<Order, DomainError> {
        let order = change.order.clone();
        self.orders.save(change).await?;
        Ok(order)
    }

    /// Looks up every referenced product; any missing or inactive one
    /// fails the whole request.
    async fn resolve_products(
        &self,
        lines: &[OrderLine],
    ) -> Result<HashMap<ProductId, Product>, DomainError> {
        let mut ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        ids.sort();
        ids.dedup();

        let products: HashMap<ProductId, Product> = self
            .catalog
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let references: Vec<String> = lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| match products.get(&line.product_id) {
                None => Some(format!(
                    "items[{index}].product_id: {} does not exist",
                    line.product_id
                )),
                Some(product) if !product.active => Some(format!(
                    "items[{index}].product_id: {} is inactive",
                    line.product_id
                )),
                Some(_) => None,
            })
            .collect();

        if references.is_empty() {
            Ok(products)
        } else {
            Err(DomainError::InvalidReference {
                message: "Order references missing or inactive products".to_string(),
                references,
            })
        }
    }

    /// Applies every planned merge and writes all touched orders in one batch.
    async fn merge(
        &self,
        actor: &Actor,
        candidates: Vec<Order>,
        plan: ConsolidationPlan,
        lines: &[OrderLine],
        now: DateTime<Utc>,
    ) -> Result<MergeSummary, DomainError> {
        let mut touched: Vec<OrderChange> = Vec::new();
        let mut summary = MergeSummary::default();
        let mut orders: HashMap<OrderId, Order> = candidates
            .into_iter()
            .map(|order| (order.id(), order))
            .collect();

        for duplicate in &plan.duplicates {
            let position = match touched
                .iter()
                .position(|change| change.order.id() == duplicate.order_id)
            {
                Some(position) => position,
                None => {
                    let order = orders
                        .remove(&duplicate.order_id)
                        .ok_or_else(|| DomainError::not_found("order", duplicate.order_id))?;
                    touched.push(OrderChange {
                        expected_version: order.version(),
                        order,
                        events: Vec::new(),
                    });
                    summary.order_numbers.push(duplicate.order_number);
                    touched.len() - 1
                }
            };

            let change = &mut touched[position];
            let events = change.order.merge_quantity(
                duplicate.item_id,
                duplicate.incoming_quantity,
                actor.user_id,
                now,
            )?;
            for event in &events {
                if let OrderEvent::LineQuantityMerged(data) = event {
                    summary.merged_lines.push(MergedLine {
                        order_id: duplicate.order_id,
                        order_number: duplicate.order_number,
                        item_id: data.item_id,
                        product_id: data.product_id,
                        previous_quantity: data.previous_quantity,
                        added_quantity: data.added_quantity,
                        new_quantity: data.new_quantity,
                        unit_of_measure: duplicate.unit_of_measure,
                    });
                }
            }
            change.order.apply_events(events.clone());
            change.events.extend(events);
        }

        summary.unmerged = plan
            .unmatched
            .iter()
            .filter_map(|&line_index| {
                lines.get(line_index).map(|line| UnmergedLine {
                    line_index,
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
            })
            .collect();

        self.orders.save_batch(touched).await?;

        metrics::counter!("order_lines_merged_total").increment(summary.merged_count() as u64);
        if !summary.unmerged.is_empty() {
            tracing::warn!(
                unmerged = summary.unmerged.len(),
                "lines without a duplicate were not recorded because the request merged"
            );
        }
        tracing::info!(
            merged_lines = summary.merged_count(),
            orders = ?summary.order_numbers,
            "order lines merged into recent orders"
        );
        Ok(summary)
    }
}
