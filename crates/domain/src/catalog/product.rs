//! Product records.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::money::{MAX_PRICE_CENTS, Money};

/// Stock keeping unit, trimmed and upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    /// Normalizes a raw SKU. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Returns the SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sku {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sku::parse(&value).ok_or("sku must not be blank")
    }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self {
        sku.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit in which a product is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    #[default]
    Unit,
    Pair,
    Meter,
    Box,
    Kg,
    Liter,
    Pack,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Unit => "unit",
            UnitOfMeasure::Pair => "pair",
            UnitOfMeasure::Meter => "meter",
            UnitOfMeasure::Box => "box",
            UnitOfMeasure::Kg => "kg",
            UnitOfMeasure::Liter => "liter",
            UnitOfMeasure::Pack => "pack",
        }
    }
}

impl std::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product.
///
/// Products are never deleted; clearing `active` retires them from new
/// orders while existing orders keep their denormalized copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub brand: Option<String>,
    pub format: Option<String>,
    pub price: Money,
    pub cost: Money,
    pub stock: u32,
    pub min_stock: u32,
    pub category: Option<String>,
    pub unit_of_measure: UnitOfMeasure,
    pub active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// True when the current stock is at or below the minimum threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Input for registering a product.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub format: Option<String>,
    #[validate(range(min = 0, max = MAX_PRICE_CENTS))]
    pub price_cents: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub min_stock: u32,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default)]
    pub unit_of_measure: UnitOfMeasure,
}

/// Catalog edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub format: Option<String>,
    #[validate(range(min = 0, max = MAX_PRICE_CENTS))]
    pub price_cents: Option<i64>,
    #[validate(range(min = 0))]
    pub cost_cents: Option<i64>,
    pub min_stock: Option<u32>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub unit_of_measure: Option<UnitOfMeasure>,
}

impl ProductUpdate {
    /// Applies the present fields to a product.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(brand) = self.brand {
            product.brand = Some(brand);
        }
        if let Some(format) = self.format {
            product.format = Some(format);
        }
        if let Some(price) = self.price_cents {
            product.price = Money::from_cents(price);
        }
        if let Some(cost) = self.cost_cents {
            product.cost = Money::from_cents(cost);
        }
        if let Some(min_stock) = self.min_stock {
            product.min_stock = min_stock;
        }
        if let Some(category) = self.category {
            product.category = Some(category);
        }
        if let Some(unit) = self.unit_of_measure {
            product.unit_of_measure = unit;
        }
    }
}

/// Filter for product listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Only active products.
    #[serde(default)]
    pub active_only: bool,
    /// Only products at or below their minimum stock.
    #[serde(default)]
    pub low_stock_only: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ProductQuery {
    /// Returns true if the product passes the filters (paging excluded).
    pub fn matches(&self, product: &Product) -> bool {
        (!self.active_only || product.active) && (!self.low_stock_only || product.is_low_stock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: u32, min_stock: u32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            sku: Sku::parse("abc-1").unwrap(),
            name: "Guante nitrilo".to_string(),
            brand: None,
            format: None,
            price: Money::from_cents(1000),
            cost: Money::from_cents(600),
            stock,
            min_stock,
            category: None,
            unit_of_measure: UnitOfMeasure::Box,
            active: true,
            created_by: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sku_is_normalized() {
        assert_eq!(Sku::parse("  ab-12x ").unwrap().as_str(), "AB-12X");
        assert!(Sku::parse("   ").is_none());
    }

    #[test]
    fn low_stock_includes_threshold() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(4, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn update_touches_only_present_fields() {
        let mut p = product(10, 2);
        ProductUpdate {
            price_cents: Some(1500),
            brand: Some("3M".to_string()),
            ..Default::default()
        }
        .apply_to(&mut p);

        assert_eq!(p.price, Money::from_cents(1500));
        assert_eq!(p.brand.as_deref(), Some("3M"));
        assert_eq!(p.cost, Money::from_cents(600));
        assert_eq!(p.name, "Guante nitrilo");
    }

    #[test]
    fn price_outside_range_is_rejected() {
        let input = NewProduct {
            sku: "X1".to_string(),
            name: "Cinta".to_string(),
            brand: None,
            format: None,
            price_cents: -1,
            cost_cents: 0,
            stock: 0,
            min_stock: 0,
            category: None,
            unit_of_measure: UnitOfMeasure::Meter,
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price_cents"));

        let input = NewProduct {
            price_cents: MAX_PRICE_CENTS + 1,
            ..input
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price_cents"));
    }

    #[test]
    fn unit_of_measure_wire_names() {
        assert_eq!(
            serde_json::to_string(&UnitOfMeasure::Liter).unwrap(),
            "\"liter\""
        );
        let unit: UnitOfMeasure = serde_json::from_str("\"pair\"").unwrap();
        assert_eq!(unit, UnitOfMeasure::Pair);
    }

    #[test]
    fn query_filters() {
        let mut p = product(1, 3);
        let q = ProductQuery {
            active_only: true,
            low_stock_only: true,
            ..Default::default()
        };
        assert!(q.matches(&p));
        p.active = false;
        assert!(!q.matches(&p));
    }
}
