//! Duplicate detection for incoming orders.
//!
//! A new order for a customer is checked against that customer's orders
//! from the last 24 hours that are still pending or purchasing. Incoming
//! lines whose product already sits on an open line of such an order are
//! folded into that line instead of producing a new order.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, OrderItemId, ProductId};
use serde::Serialize;

use crate::catalog::UnitOfMeasure;

use super::{Order, OrderLine, OrderNumber};

/// Width of the lookback window, in hours.
pub const LOOKBACK_HOURS: i64 = 24;

/// An incoming line that matches an existing open line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCandidate {
    /// Position of the incoming line in the request.
    pub line_index: usize,
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub item_id: OrderItemId,
    pub product_id: ProductId,
    pub existing_quantity: u32,
    pub incoming_quantity: u32,
    pub unit_of_measure: UnitOfMeasure,
}

/// Result of scanning the recent orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationPlan {
    pub duplicates: Vec<DuplicateCandidate>,
    /// Indexes of incoming lines with no match.
    pub unmatched: Vec<usize>,
}

impl ConsolidationPlan {
    /// True when at least one line merges, which turns the whole request
    /// into a merge.
    pub fn is_merge(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Matches incoming lines against recent open orders.
///
/// Orders outside the window, of another customer or no longer open are
/// ignored even if the caller passed them. Each incoming line merges into
/// at most one existing line: the first open line for the same product on
/// the most recently created candidate.
pub fn find_duplicates(
    customer_id: CustomerId,
    candidates: &[Order],
    lines: &[OrderLine],
    window_start: DateTime<Utc>,
) -> ConsolidationPlan {
    let mut eligible: Vec<(&Order, OrderNumber)> = candidates
        .iter()
        .filter(|order| {
            order.customer_id() == customer_id
                && order.status().is_open()
                && order.created_at() >= window_start
        })
        .filter_map(|order| order.order_number().map(|number| (order, number)))
        .collect();
    eligible.sort_by(|(a, a_number), (b, b_number)| {
        b.created_at()
            .cmp(&a.created_at())
            .then(b_number.cmp(a_number))
    });

    let mut plan = ConsolidationPlan::default();
    for (line_index, line) in lines.iter().enumerate() {
        let matched = eligible.iter().find_map(|(order, number)| {
            order
                .items()
                .iter()
                .find(|item| item.product_id == line.product_id && item.status.is_open())
                .map(|item| DuplicateCandidate {
                    line_index,
                    order_id: order.id(),
                    order_number: *number,
                    item_id: item.id,
                    product_id: item.product_id,
                    existing_quantity: item.quantity,
                    incoming_quantity: line.quantity,
                    unit_of_measure: item.unit_of_measure,
                })
        });

        match matched {
            Some(candidate) => plan.duplicates.push(candidate),
            None => plan.unmatched.push(line_index),
        }
    }
    plan
}

/// One line folded into an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedLine {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub item_id: OrderItemId,
    pub product_id: ProductId,
    pub previous_quantity: u32,
    pub added_quantity: u32,
    pub new_quantity: u32,
    pub unit_of_measure: UnitOfMeasure,
}

/// An incoming line that had no match while others did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmergedLine {
    pub line_index: usize,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Outcome of a create request that turned into a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub merged_lines: Vec<MergedLine>,
    /// Affected orders, without repeats, in the order they were touched.
    pub order_numbers: Vec<OrderNumber>,
    /// Lines with no duplicate; they were not recorded anywhere.
    pub unmerged: Vec<UnmergedLine>,
}

impl MergeSummary {
    /// Number of merged lines.
    pub fn merged_count(&self) -> usize {
        self.merged_lines.len()
    }
}
