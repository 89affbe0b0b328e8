use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;
use crate::domain::item::{ItemId, VariantId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLineId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Ready,
    PendingReview,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::PendingReview => "pending_review",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "draft" => Ok(Self::Draft),
            "ready" => Ok(Self::Ready),
            "pending_review" => Ok(Self::PendingReview),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown order status `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Active,
    Removed,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Removed => "removed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "active" => Ok(Self::Active),
            "removed" => Ok(Self::Removed),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown line status `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub line_number: u32,
    pub item_id: ItemId,
    pub variant_id: VariantId,
    pub product_name: String,
    pub quantity: f64,
    pub status: LineStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
    pub source_channel: String,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Live orders are the ones the idempotency prefilter counts against.
    pub fn is_live(&self) -> bool {
        self.status != OrderStatus::Cancelled
    }
}

pub const EVENT_CREATED: &str = "created";
pub const EVENT_CHANGE_PROPOSED: &str = "change_proposed";

/// Append-only audit record of order lifecycle activity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub event_type: String,
    pub metadata: serde_json::Value,
}

/// Delivery dates are only acceptable at or after the day the intent is
/// resolved. Mapping relative phrases ("Friday") forward is the decision
/// engine's job; this is the deterministic backstop.
pub fn validate_delivery_date(date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    if date < today {
        return Err(DomainError::PastDeliveryDate { date, today });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{validate_delivery_date, OrderStatus};

    #[test]
    fn order_status_round_trips_through_str() {
        for status in [
            OrderStatus::Draft,
            OrderStatus::Ready,
            OrderStatus::PendingReview,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).expect("parse"), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(OrderStatus::parse("shipped").is_err());
    }

    #[test]
    fn past_delivery_date_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 3).expect("date");
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");

        assert!(validate_delivery_date(today, today).is_ok());
        assert!(validate_delivery_date(yesterday, today).is_err());
    }
}
