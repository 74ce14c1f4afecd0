use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Estimate, FringeConstant, Template};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Persistence boundary for estimates, fringe profiles and proposal templates.
///
/// Saving an estimate stores it as sent; totals are recomputed by the caller
/// before it gets here.
#[async_trait]
pub trait EstimateRepository: Send + Sync {
    // Fringe constants
    async fn list_fringe_constants(&self) -> Result<Vec<FringeConstant>, RepositoryError>;
    async fn get_fringe_constant_by_name(
        &self,
        name: &str,
    ) -> Result<FringeConstant, RepositoryError>;
    async fn upsert_fringe_constant(
        &self,
        constant: &FringeConstant,
    ) -> Result<(), RepositoryError>;
    async fn delete_fringe_constant(
        &self,
        name: &str,
    ) -> Result<(), RepositoryError>;

    // Estimates

    /// Inserts a new estimate, assigning its id, slug, item ids and timestamps.
    async fn create_estimate(
        &self,
        estimate: Estimate,
    ) -> Result<Estimate, RepositoryError>;

    async fn get_estimate(
        &self,
        id: i64,
    ) -> Result<Estimate, RepositoryError>;

    async fn get_estimate_by_slug(
        &self,
        slug: &str,
    ) -> Result<Estimate, RepositoryError>;

    /// Replaces the stored estimate and returns it with any new item ids.
    async fn update_estimate(
        &self,
        estimate: &Estimate,
    ) -> Result<Estimate, RepositoryError>;

    async fn delete_estimate(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;

    /// Latest version of every estimate number, newest number first.
    async fn list_estimates(&self) -> Result<Vec<Estimate>, RepositoryError>;

    /// Every version of one estimate number, oldest first.
    async fn list_versions(
        &self,
        estimate_number: i64,
    ) -> Result<Vec<Estimate>, RepositoryError>;

    async fn next_estimate_number(&self) -> Result<i64, RepositoryError>;

    // Proposal templates
    async fn list_templates(&self) -> Result<Vec<Template>, RepositoryError>;
    async fn get_template(
        &self,
        id: &str,
    ) -> Result<Template, RepositoryError>;
    async fn upsert_template(
        &self,
        template: &Template,
    ) -> Result<(), RepositoryError>;
}
