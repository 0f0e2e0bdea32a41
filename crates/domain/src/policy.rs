//! Role-based access policy.
//!
//! Roles form a closed set and map to operations through a static table.
//! Every mutating service method calls [`Actor::authorize`] before doing
//! anything else.

use std::str::FromStr;

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Role of a system user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including catalog edits and notification settings.
    Admin,
    /// Sales: registers customers, products and orders.
    Vendedor,
    /// Billing: moves orders through their lifecycle.
    Facturador,
}

impl Role {
    /// Returns the role name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Vendedor => "vendedor",
            Role::Facturador => "facturador",
        }
    }

    /// Returns true if this role may invoke the operation.
    pub fn allows(self, operation: Operation) -> bool {
        use Operation::*;

        match self {
            Role::Admin => true,
            Role::Vendedor => matches!(
                operation,
                CreateCustomer | CreateProduct | CreateOrder | ReadRecords
            ),
            Role::Facturador => matches!(
                operation,
                ChangeOrderStatus | MarkDelivered | NullifyOrder | UpdateOrder | ReadRecords
            ),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "vendedor" => Ok(Role::Vendedor),
            "facturador" => Ok(Role::Facturador),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Operations guarded by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateCustomer,
    EditCustomer,
    DeactivateCustomer,
    CreateProduct,
    EditProduct,
    DeactivateProduct,
    AdjustStock,
    CreateOrder,
    ChangeOrderStatus,
    MarkDelivered,
    NullifyOrder,
    /// Partial update over the restricted order field set.
    UpdateOrder,
    /// Setting or clearing `delivered_at` directly through an update.
    OverrideDelivery,
    ManageNotifications,
    ReadRecords,
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates an actor context.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Fails with [`DomainError::Forbidden`] if the role does not allow the operation.
    pub fn authorize(&self, operation: Operation) -> Result<(), DomainError> {
        if self.role.allows(operation) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                role = %self.role,
                ?operation,
                "operation denied"
            );
            Err(DomainError::Forbidden)
        }
    }
}
