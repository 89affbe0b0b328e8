use chrono::NaiveDate;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("delivery date {date} is before today ({today})")]
    PastDeliveryDate { date: NaiveDate, today: NaiveDate },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
