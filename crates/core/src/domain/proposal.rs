use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;
use crate::domain::item::{ItemId, VariantId};
use crate::domain::order::{OrderId, OrderLineId};
use crate::errors::DomainError;

pub const PROPOSAL_SOURCE_AGENT: &str = "agent";
pub const AGENT_VERSION: &str = "0.1";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalLineId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    NewOrder,
    ChangeOrder,
    CancelOrder,
}

impl ProposalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewOrder => "new_order",
            Self::ChangeOrder => "change_order",
            Self::CancelOrder => "cancel_order",
        }
    }
}

/// Proposals are written once with status `pending`; a separate review step
/// applies or rejects them later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Add,
    Modify,
    Remove,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Modify => "modify",
            Self::Remove => "remove",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderFrequency {
    #[default]
    OneTime,
    Recurring,
}

impl OrderFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "one-time",
            Self::Recurring => "recurring",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "one-time" => Ok(Self::OneTime),
            "recurring" => Ok(Self::Recurring),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown order frequency `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTags {
    pub source: String,
    pub agent_version: String,
    pub order_frequency: OrderFrequency,
}

impl ProposalTags {
    pub fn agent(order_frequency: OrderFrequency) -> Self {
        Self {
            source: PROPOSAL_SOURCE_AGENT.to_string(),
            agent_version: AGENT_VERSION.to_string(),
            order_frequency,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposal_type: ProposalType,
    /// Absent for `new_order`; required for change/cancel.
    pub order_id: Option<OrderId>,
    pub status: ProposalStatus,
    pub tags: ProposalTags,
}

/// Snapshot of the proposed values captured at proposal time. Authoritative
/// even if the catalog changes before review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposedValues {
    pub quantity: f64,
    pub variant_code: String,
    pub delivery_date: NaiveDate,
    pub customer_id: CustomerId,
    pub customer_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalLine {
    pub id: ProposalLineId,
    pub proposal_id: ProposalId,
    pub line_number: u32,
    pub item_id: ItemId,
    pub item_name: String,
    pub variant_id: VariantId,
    pub change_type: ChangeType,
    /// Targeted order line; required for modify/remove, absent for add.
    pub order_line_id: Option<OrderLineId>,
    pub proposed: ProposedValues,
}

#[cfg(test)]
mod tests {
    use super::{OrderFrequency, ProposalTags, ProposalType, PROPOSAL_SOURCE_AGENT};

    #[test]
    fn proposal_type_str_values_match_store_vocabulary() {
        assert_eq!(ProposalType::NewOrder.as_str(), "new_order");
        assert_eq!(ProposalType::ChangeOrder.as_str(), "change_order");
        assert_eq!(ProposalType::CancelOrder.as_str(), "cancel_order");
    }

    #[test]
    fn agent_tags_carry_source_and_frequency() {
        let tags = ProposalTags::agent(OrderFrequency::Recurring);
        assert_eq!(tags.source, PROPOSAL_SOURCE_AGENT);
        assert_eq!(tags.order_frequency, OrderFrequency::Recurring);
    }

    #[test]
    fn order_frequency_round_trips_through_str() {
        for frequency in [OrderFrequency::OneTime, OrderFrequency::Recurring] {
            assert_eq!(
                OrderFrequency::parse(frequency.as_str()).expect("parse"),
                frequency
            );
        }
    }
}
