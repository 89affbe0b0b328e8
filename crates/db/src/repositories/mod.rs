use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use orderly_core::domain::customer::{Customer, CustomerId};
use orderly_core::domain::item::Item;
use orderly_core::domain::order::{
    Order, OrderEvent, OrderId, OrderLine, OrderLineId, OrderStatus,
};
use orderly_core::domain::proposal::{Proposal, ProposalLine};

pub mod catalog;
pub mod memory;
pub mod order;
pub mod proposal;

pub use catalog::SqlCatalogRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryOrderRepository, InMemoryProposalRepository};
pub use order::SqlOrderRepository;
pub use proposal::SqlProposalRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only access to the customer and item reference lists. Loaded fresh
/// once per run; there is no cross-run catalog caching.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Active customers, name order, with item notes folded in.
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError>;

    /// Active items, name order, variants included.
    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn find_line(&self, id: &OrderLineId) -> Result<Option<OrderLine>, RepositoryError>;

    /// Non-cancelled orders for a customer with `delivery_date >= from`,
    /// optionally pinned to one date, ascending by delivery date, capped at
    /// `limit`. Lines are included.
    async fn open_orders_for_customer(
        &self,
        customer_id: &CustomerId,
        from: NaiveDate,
        delivery_date: Option<NaiveDate>,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Distinct customers holding a live (non-cancelled) order for the date.
    async fn customers_with_live_orders(
        &self,
        delivery_date: NaiveDate,
    ) -> Result<Vec<CustomerId>, RepositoryError>;

    /// Insert the order header only; lines go through `insert_line`.
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn insert_line(&self, line: &OrderLine) -> Result<(), RepositoryError>;

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError>;

    async fn append_event(&self, event: &OrderEvent) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProposalRepository: Send + Sync {
    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), RepositoryError>;

    async fn insert_line(&self, line: &ProposalLine) -> Result<(), RepositoryError>;
}
