pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;

pub use catalog::{CatalogIndex, ResolvedLine, VariantRef};
pub use domain::customer::{Customer, CustomerId, CustomerItemNote};
pub use domain::item::{Item, ItemId, ItemVariant, VariantId};
pub use domain::order::{
    LineStatus, Order, OrderEvent, OrderId, OrderLine, OrderLineId, OrderStatus,
};
pub use domain::proposal::{
    ChangeType, OrderFrequency, Proposal, ProposalId, ProposalLine, ProposalLineId,
    ProposalStatus, ProposalTags, ProposalType, ProposedValues,
};
pub use domain::section::{OrderRow, SheetSection};
pub use errors::DomainError;
