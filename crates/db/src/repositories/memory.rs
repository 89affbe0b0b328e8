use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use orderly_core::domain::customer::{Customer, CustomerId};
use orderly_core::domain::item::Item;
use orderly_core::domain::order::{
    Order, OrderEvent, OrderId, OrderLine, OrderLineId, OrderStatus,
};
use orderly_core::domain::proposal::{Proposal, ProposalLine};

use super::{CatalogRepository, OrderRepository, ProposalRepository, RepositoryError};

/// Catalog backed by fixed lists, for tests and offline runs.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    customers: Vec<Customer>,
    items: Vec<Item>,
}

impl InMemoryCatalogRepository {
    pub fn new(customers: Vec<Customer>, items: Vec<Item>) -> Self {
        Self { customers, items }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        Ok(self.customers.clone())
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        Ok(self.items.clone())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
    events: RwLock<Vec<OrderEvent>>,
}

impl InMemoryOrderRepository {
    /// Seed an order with its lines already attached.
    pub async fn insert_full(&self, order: Order) {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0, order);
    }

    pub async fn events(&self) -> Vec<OrderEvent> {
        self.events.read().await.clone()
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders.read().await.get(&id.0).cloned()
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id.0).cloned())
    }

    async fn find_line(&self, id: &OrderLineId) -> Result<Option<OrderLine>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .flat_map(|order| order.lines.iter())
            .find(|line| line.id == *id)
            .cloned())
    }

    async fn open_orders_for_customer(
        &self,
        customer_id: &CustomerId,
        from: NaiveDate,
        delivery_date: Option<NaiveDate>,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matched: Vec<Order> = orders
            .values()
            .filter(|order| order.customer_id == *customer_id)
            .filter(|order| order.is_live())
            .filter(|order| order.delivery_date >= from)
            .filter(|order| delivery_date.map_or(true, |date| order.delivery_date == date))
            .cloned()
            .collect();

        matched.sort_by_key(|order| order.delivery_date);
        matched.truncate(limit as usize);
        Ok(matched)
    }

    async fn customers_with_live_orders(
        &self,
        delivery_date: NaiveDate,
    ) -> Result<Vec<CustomerId>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut customer_ids: Vec<CustomerId> = Vec::new();
        for order in orders.values() {
            if order.delivery_date == delivery_date
                && order.is_live()
                && !customer_ids.contains(&order.customer_id)
            {
                customer_ids.push(order.customer_id.clone());
            }
        }
        Ok(customer_ids)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0, order.clone());
        Ok(())
    }

    async fn insert_line(&self, line: &OrderLine) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&line.order_id.0).ok_or_else(|| {
            RepositoryError::Decode(format!("order {} not found", line.order_id.0))
        })?;
        order.lines.push(line.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id.0)
            .ok_or_else(|| RepositoryError::Decode(format!("order {} not found", id.0)))?;
        order.status = status;
        Ok(())
    }

    async fn append_event(&self, event: &OrderEvent) -> Result<(), RepositoryError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProposalRepository {
    proposals: RwLock<Vec<Proposal>>,
    lines: RwLock<Vec<ProposalLine>>,
}

impl InMemoryProposalRepository {
    pub async fn proposals(&self) -> Vec<Proposal> {
        self.proposals.read().await.clone()
    }

    pub async fn lines(&self) -> Vec<ProposalLine> {
        self.lines.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), RepositoryError> {
        self.proposals.write().await.push(proposal.clone());
        Ok(())
    }

    async fn insert_line(&self, line: &ProposalLine) -> Result<(), RepositoryError> {
        self.lines.write().await.push(line.clone());
        Ok(())
    }
}
