//! Domain layer for the order desk.
//!
//! This crate provides:
//! - the Order aggregate, whose state changes only through events
//! - duplicate consolidation of new orders into recent open orders
//! - `OrderService` (lifecycle) and `CatalogService` (products, customers)
//! - the role-based access policy
//! - repository traits implemented by the `store` crate

pub mod aggregate;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod money;
pub mod notification;
pub mod order;
pub mod policy;
pub mod repository;

pub use aggregate::{Aggregate, DomainEvent};
pub use catalog::{
    Address, CatalogService, Customer, CustomerUpdate, ImportReport, NewCustomer, NewProduct,
    Product, ProductQuery, ProductUpdate, RejectedRow, Sku, TaxId, UnitOfMeasure,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::DomainError;
pub use money::{MAX_PRICE_CENTS, Money};
pub use notification::{
    NotificationSettings, NotificationSettingsService, Recipient, RecipientSource,
};
pub use order::{
    CreateOrder, CreateOrderOutcome, MergeSummary, Order, OrderError, OrderEvent, OrderItem,
    OrderLine, OrderNumber, OrderService, OrderStatus, OrderUpdate, OrderView,
};
pub use policy::{Actor, Operation, Role};
pub use repository::{
    CatalogRepository, CustomerQuery, OrderChange, OrderQuery, OrderRepository,
    OutboxRepository, RecordedEvent, RepositoryError, SettingsRepository,
};
