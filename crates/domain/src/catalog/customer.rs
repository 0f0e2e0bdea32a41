//! Customer records.

use chrono::{DateTime, Utc};
use common::{CustomerId, UserId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::tax_id::{TaxId, validate_tax_id};

/// Postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(max = 200))]
    pub street: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
}

/// A customer that orders are placed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub tax_id: Option<TaxId>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
    pub notes: Option<String>,
    pub active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a customer.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "validate_tax_id"))]
    pub tax_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub address: Address,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl NewCustomer {
    /// Returns the normalized tax id, if one was given.
    ///
    /// Call after `validate()`; an invalid value yields `None`.
    pub fn normalized_tax_id(&self) -> Option<TaxId> {
        self.tax_id.as_deref().and_then(|raw| TaxId::parse(raw).ok())
    }
}

/// Customer edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_tax_id"))]
    pub tax_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(nested)]
    pub address: Option<Address>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl CustomerUpdate {
    /// Returns the normalized tax id, if one was given.
    pub fn normalized_tax_id(&self) -> Option<TaxId> {
        self.tax_id.as_deref().and_then(|raw| TaxId::parse(raw).ok())
    }

    /// Applies the present fields to a customer.
    pub fn apply_to(self, customer: &mut Customer) {
        if let Some(tax_id) = self.normalized_tax_id() {
            customer.tax_id = Some(tax_id);
        }
        if let Some(name) = self.name {
            customer.name = name;
        }
        if let Some(email) = self.email {
            customer.email = Some(email);
        }
        if let Some(phone) = self.phone {
            customer.phone = Some(phone);
        }
        if let Some(address) = self.address {
            customer.address = address;
        }
        if let Some(notes) = self.notes {
            customer.notes = Some(notes);
        }
    }
}
