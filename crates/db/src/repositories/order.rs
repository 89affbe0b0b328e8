use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};

use orderly_core::domain::customer::CustomerId;
use orderly_core::domain::item::{ItemId, VariantId};
use orderly_core::domain::order::{
    LineStatus, Order, OrderEvent, OrderId, OrderLine, OrderLineId, OrderStatus,
};

use super::catalog::parse_uuid;
use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn lines_for_order(&self, order_id: &OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, order_id, line_number, item_id, item_variant_id, product_name, quantity, status
             FROM order_lines
             WHERE order_id = ?
             ORDER BY line_number",
        )
        .bind(order_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(line_from_row).collect()
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_id, customer_name, delivery_date, status, source_channel
             FROM orders
             WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let mut order = order_from_row(row)?;
        order.lines = self.lines_for_order(&order.id).await?;
        Ok(Some(order))
    }

    async fn find_line(&self, id: &OrderLineId) -> Result<Option<OrderLine>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, order_id, line_number, item_id, item_variant_id, product_name, quantity, status
             FROM order_lines
             WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(line_from_row).transpose()
    }

    async fn open_orders_for_customer(
        &self,
        customer_id: &CustomerId,
        from: NaiveDate,
        delivery_date: Option<NaiveDate>,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = if let Some(delivery_date) = delivery_date {
            sqlx::query(
                "SELECT id, customer_id, customer_name, delivery_date, status, source_channel
                 FROM orders
                 WHERE customer_id = ?
                   AND status != 'cancelled'
                   AND delivery_date >= ?
                   AND delivery_date = ?
                 ORDER BY delivery_date ASC
                 LIMIT ?",
            )
            .bind(customer_id.0.to_string())
            .bind(from.to_string())
            .bind(delivery_date.to_string())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, customer_id, customer_name, delivery_date, status, source_channel
                 FROM orders
                 WHERE customer_id = ?
                   AND status != 'cancelled'
                   AND delivery_date >= ?
                 ORDER BY delivery_date ASC
                 LIMIT ?",
            )
            .bind(customer_id.0.to_string())
            .bind(from.to_string())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
        };

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let mut order = order_from_row(row)?;
            order.lines = self.lines_for_order(&order.id).await?;
            orders.push(order);
        }

        Ok(orders)
    }

    async fn customers_with_live_orders(
        &self,
        delivery_date: NaiveDate,
    ) -> Result<Vec<CustomerId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT customer_id
             FROM orders
             WHERE delivery_date = ?
               AND status != 'cancelled'",
        )
        .bind(delivery_date.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok(CustomerId(parse_uuid(&row.get::<String, _>("customer_id"))?)))
            .collect()
    }

    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, customer_name, delivery_date, status, source_channel)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.0.to_string())
        .bind(order.customer_id.0.to_string())
        .bind(&order.customer_name)
        .bind(order.delivery_date.to_string())
        .bind(order.status.as_str())
        .bind(&order.source_channel)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_line(&self, line: &OrderLine) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO order_lines (id, order_id, line_number, item_id, item_variant_id, product_name, quantity, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(line.id.0.to_string())
        .bind(line.order_id.0.to_string())
        .bind(i64::from(line.line_number))
        .bind(line.item_id.0.to_string())
        .bind(line.variant_id.0.to_string())
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_event(&self, event: &OrderEvent) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_string(&event.metadata)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query("INSERT INTO order_events (order_id, type, metadata) VALUES (?, ?, ?)")
            .bind(event.order_id.0.to_string())
            .bind(&event.event_type)
            .bind(metadata)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn order_from_row(row: SqliteRow) -> Result<Order, RepositoryError> {
    Ok(Order {
        id: OrderId(parse_uuid(&row.get::<String, _>("id"))?),
        customer_id: CustomerId(parse_uuid(&row.get::<String, _>("customer_id"))?),
        customer_name: row.get("customer_name"),
        delivery_date: parse_date(&row.get::<String, _>("delivery_date"))?,
        status: OrderStatus::parse(&row.get::<String, _>("status"))
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        source_channel: row.get("source_channel"),
        lines: Vec::new(),
    })
}

fn line_from_row(row: SqliteRow) -> Result<OrderLine, RepositoryError> {
    Ok(OrderLine {
        id: OrderLineId(parse_uuid(&row.get::<String, _>("id"))?),
        order_id: OrderId(parse_uuid(&row.get::<String, _>("order_id"))?),
        line_number: row.get::<i64, _>("line_number") as u32,
        item_id: ItemId(parse_uuid(&row.get::<String, _>("item_id"))?),
        variant_id: VariantId(parse_uuid(&row.get::<String, _>("item_variant_id"))?),
        product_name: row.get("product_name"),
        quantity: row.get("quantity"),
        status: LineStatus::parse(&row.get::<String, _>("status"))
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    value
        .parse::<NaiveDate>()
        .map_err(|error| RepositoryError::Decode(format!("invalid date `{value}`: {error}")))
}
