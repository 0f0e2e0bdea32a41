//! Catalog service: products and customers.

use std::sync::Arc;

use common::{CustomerId, ProductId};
use validator::Validate;

use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;
use crate::money::Money;
use crate::policy::{Actor, Operation};
use crate::repository::{CatalogRepository, CustomerQuery, RepositoryError};

use super::{
    Customer, CustomerUpdate, ImportReport, MAX_IMPORT_ROWS, NewCustomer, NewProduct, Product,
    ProductQuery, ProductUpdate, RejectedRow, Sku,
};

/// Service for managing products and customers.
///
/// Products and customers are soft-deleted by clearing their `active`
/// flag. SKUs and tax ids are unique.
pub struct CatalogService<C: CatalogRepository> {
    catalog: C,
    clock: Arc<dyn Clock>,
}

impl<C: CatalogRepository> CatalogService<C> {
    /// Creates a catalog service reading the system time.
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &C {
        &self.catalog
    }

    /// Registers a product.
    #[tracing::instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: NewProduct,
    ) -> Result<Product, DomainError> {
        actor.authorize(Operation::CreateProduct)?;
        input.validate()?;

        let sku = Sku::parse(&input.sku).ok_or_else(|| {
            DomainError::validation("Invalid product", vec!["sku: must not be blank".to_string()])
        })?;
        if self.catalog.find_product_by_sku(&sku).await?.is_some() {
            return Err(already_in_use("Invalid product", "sku"));
        }

        let now = self.clock.now();
        let product = Product {
            id: ProductId::new(),
            sku,
            name: input.name,
            brand: input.brand,
            format: input.format,
            price: Money::from_cents(input.price_cents),
            cost: Money::from_cents(input.cost_cents),
            stock: input.stock,
            min_stock: input.min_stock,
            category: input.category,
            unit_of_measure: input.unit_of_measure,
            active: true,
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
        };
        self.catalog
            .insert_product(&product)
            .await
            .map_err(|e| duplicate_as_validation("Invalid product", e))?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Edits catalog fields of a product.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, DomainError> {
        actor.authorize(Operation::EditProduct)?;
        update.validate()?;

        let mut product = self.load_product(id).await?;
        update.apply_to(&mut product);
        product.updated_at = self.clock.now();
        self.catalog.update_product(&product).await?;

        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Retires a product from new orders.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_product(
        &self,
        actor: &Actor,
        id: ProductId,
    ) -> Result<Product, DomainError> {
        actor.authorize(Operation::DeactivateProduct)?;

        let mut product = self.load_product(id).await?;
        if product.active {
            product.active = false;
            product.updated_at = self.clock.now();
            self.catalog.update_product(&product).await?;
            tracing::info!(product_id = %id, "product deactivated");
        }
        Ok(product)
    }

    /// Adds `delta` (possibly negative) to a product's stock.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        id: ProductId,
        delta: i64,
    ) -> Result<Product, DomainError> {
        actor.authorize(Operation::AdjustStock)?;

        let product = match self.catalog.adjust_stock(id, delta, self.clock.now()).await {
            Ok(product) => product,
            Err(RepositoryError::NotFound { .. }) => {
                return Err(DomainError::not_found("product", id));
            }
            Err(RepositoryError::InsufficientStock { stock, delta, .. }) => {
                let problem = if delta < 0 {
                    "leave stock below zero"
                } else {
                    "exceed the stock limit"
                };
                let detail = format!("delta: adjustment {delta} would {problem} (current {stock})");
                return Err(DomainError::validation("Invalid stock adjustment", vec![detail]));
            }
            Err(e) => return Err(e.into()),
        };

        if product.is_low_stock() {
            tracing::warn!(
                product_id = %id,
                stock = product.stock,
                min_stock = product.min_stock,
                "product at or below minimum stock"
            );
        }
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, actor: &Actor, id: ProductId) -> Result<Product, DomainError> {
        actor.authorize(Operation::ReadRecords)?;
        self.load_product(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(
        &self,
        actor: &Actor,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, DomainError> {
        actor.authorize(Operation::ReadRecords)?;
        Ok(self.catalog.list_products(query).await?)
    }

    /// Registers a customer.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_customer(
        &self,
        actor: &Actor,
        input: NewCustomer,
    ) -> Result<Customer, DomainError> {
        actor.authorize(Operation::CreateCustomer)?;
        input.validate()?;

        let tax_id = input.normalized_tax_id();
        if let Some(tax_id) = &tax_id {
            if self.catalog.find_customer_by_tax_id(tax_id).await?.is_some() {
                return Err(already_in_use("Invalid customer", "tax_id"));
            }
        }

        let now = self.clock.now();
        let customer = Customer {
            id: CustomerId::new(),
            name: input.name,
            tax_id,
            email: input.email,
            phone: input.phone,
            address: input.address,
            notes: input.notes,
            active: true,
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
        };
        self.catalog
            .insert_customer(&customer)
            .await
            .map_err(|e| duplicate_as_validation("Invalid customer", e))?;

        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    /// Edits a customer.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_customer(
        &self,
        actor: &Actor,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> Result<Customer, DomainError> {
        actor.authorize(Operation::EditCustomer)?;
        update.validate()?;

        let mut customer = self.load_customer(id).await?;
        if let Some(tax_id) = update.normalized_tax_id() {
            let holder = self.catalog.find_customer_by_tax_id(&tax_id).await?;
            if holder.is_some_and(|other| other.id != id) {
                return Err(already_in_use("Invalid customer", "tax_id"));
            }
        }

        update.apply_to(&mut customer);
        customer.updated_at = self.clock.now();
        self.catalog
            .update_customer(&customer)
            .await
            .map_err(|e| duplicate_as_validation("Invalid customer", e))?;

        tracing::info!(customer_id = %id, "customer updated");
        Ok(customer)
    }

    /// Soft-deletes a customer.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_customer(
        &self,
        actor: &Actor,
        id: CustomerId,
    ) -> Result<Customer, DomainError> {
        actor.authorize(Operation::DeactivateCustomer)?;

        let mut customer = self.load_customer(id).await?;
        if customer.active {
            customer.active = false;
            customer.updated_at = self.clock.now();
            self.catalog.update_customer(&customer).await?;
            tracing::info!(customer_id = %id, "customer deactivated");
        }
        Ok(customer)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_customer(
        &self,
        actor: &Actor,
        id: CustomerId,
    ) -> Result<Customer, DomainError> {
        actor.authorize(Operation::ReadRecords)?;
        self.load_customer(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_customers(
        &self,
        actor: &Actor,
        query: &CustomerQuery,
    ) -> Result<Vec<Customer>, DomainError> {
        actor.authorize(Operation::ReadRecords)?;
        Ok(self.catalog.list_customers(query).await?)
    }

    /// Creates products one row at a time, collecting per-row failures.
    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_products(
        &self,
        actor: &Actor,
        rows: Vec<NewProduct>,
    ) -> Result<ImportReport<Product>, DomainError> {
        actor.authorize(Operation::CreateProduct)?;
        check_batch_size(rows.len())?;

        let mut report = ImportReport::default();
        for (row, input) in rows.into_iter().enumerate() {
            match self.create_product(actor, input).await {
                Ok(product) => report.created.push(product),
                Err(DomainError::Repository(error)) => return Err(error.into()),
                Err(error) => report.rejected.push(RejectedRow::new(row, &error)),
            }
        }

        tracing::info!(
            created = report.created.len(),
            rejected = report.rejected.len(),
            "products imported"
        );
        Ok(report)
    }

    /// Creates customers one row at a time, collecting per-row failures.
    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_customers(
        &self,
        actor: &Actor,
        rows: Vec<NewCustomer>,
    ) -> Result<ImportReport<Customer>, DomainError> {
        actor.authorize(Operation::CreateCustomer)?;
        check_batch_size(rows.len())?;

        let mut report = ImportReport::default();
        for (row, input) in rows.into_iter().enumerate() {
            match self.create_customer(actor, input).await {
                Ok(customer) => report.created.push(customer),
                Err(DomainError::Repository(error)) => return Err(error.into()),
                Err(error) => report.rejected.push(RejectedRow::new(row, &error)),
            }
        }

        tracing::info!(
            created = report.created.len(),
            rejected = report.rejected.len(),
            "customers imported"
        );
        Ok(report)
    }

    async fn load_product(&self, id: ProductId) -> Result<Product, DomainError> {
        self.catalog
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))
    }

    async fn load_customer(&self, id: CustomerId) -> Result<Customer, DomainError> {
        self.catalog
            .get_customer(id)
            .await?
            .ok_or_else(|| DomainError::not_found("customer", id))
    }
}

fn check_batch_size(rows: usize) -> Result<(), DomainError> {
    if rows == 0 || rows > MAX_IMPORT_ROWS {
        return Err(DomainError::validation(
            "Invalid import",
            vec![format!("rows: must contain between 1 and {MAX_IMPORT_ROWS} rows, got {rows}")],
        ));
    }
    Ok(())
}

fn already_in_use(message: &str, field: &str) -> DomainError {
    DomainError::validation(message, vec![format!("{field}: already in use")])
}

fn duplicate_as_validation(message: &str, error: RepositoryError) -> DomainError {
    match error {
        RepositoryError::Duplicate { field, .. } => already_in_use(message, field),
        other => other.into(),
    }
}
