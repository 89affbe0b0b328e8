use orderly_core::domain::proposal::{Proposal, ProposalLine};

use super::{ProposalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProposalRepository {
    pool: DbPool,
}

impl SqlProposalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProposalRepository for SqlProposalRepository {
    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), RepositoryError> {
        let tags = serde_json::to_string(&proposal.tags)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO order_change_proposals (id, order_id, status, type, tags)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(proposal.id.0.to_string())
        .bind(proposal.order_id.as_ref().map(|order_id| order_id.0.to_string()))
        .bind(proposal.status.as_str())
        .bind(proposal.proposal_type.as_str())
        .bind(tags)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_line(&self, line: &ProposalLine) -> Result<(), RepositoryError> {
        let proposed_values = serde_json::to_string(&line.proposed)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO order_change_proposal_lines (
                id,
                proposal_id,
                line_number,
                item_id,
                item_name,
                item_variant_id,
                change_type,
                order_line_id,
                proposed_values
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(line.id.0.to_string())
        .bind(line.proposal_id.0.to_string())
        .bind(i64::from(line.line_number))
        .bind(line.item_id.0.to_string())
        .bind(&line.item_name)
        .bind(line.variant_id.0.to_string())
        .bind(line.change_type.as_str())
        .bind(line.order_line_id.as_ref().map(|line_id| line_id.0.to_string()))
        .bind(proposed_values)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
