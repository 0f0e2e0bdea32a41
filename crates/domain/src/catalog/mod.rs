//! Products and customers.

mod customer;
mod import;
mod product;
mod service;
mod tax_id;

pub use customer::{Address, Customer, CustomerUpdate, NewCustomer};
pub use import::{ImportReport, MAX_IMPORT_ROWS, RejectedRow};
pub use product::{NewProduct, Product, ProductQuery, ProductUpdate, Sku, UnitOfMeasure};
pub use service::CatalogService;
pub use tax_id::{TaxId, TaxIdError, validate_tax_id};
