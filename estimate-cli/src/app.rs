//! Command handlers shared by the `estimator` binary and its tests.
//!
//! Each handler takes the repository as a trait object so it works with any
//! registered backend.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use estimate_core::calculations::LaborCalculator;
use estimate_core::db::{DbConfig, RepositoryRegistry};
use estimate_core::proposal::{RegenerateOutcome, mark_custom, regenerate};
use estimate_core::session::{EditSession, FlushOutcome};
use estimate_core::{Estimate, EstimateRepository, EstimateStatus, LineItem, MarkupPct};
use estimate_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info, warn};

use crate::report;

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub async fn open_repository(config: &DbConfig) -> Result<Box<dyn EstimateRepository>> {
    debug!(backend = %config.backend, "opening repository");
    build_registry()
        .create(config)
        .await
        .with_context(|| format!("cannot open {} database '{}'", config.backend, config.connection_string))
}

/// Resolves an estimate by numeric id, falling back to its slug.
pub async fn find_estimate(
    repo: &dyn EstimateRepository,
    reference: &str,
) -> Result<Estimate> {
    let reference = reference.trim();
    let found = match reference.parse::<i64>() {
        Ok(id) => repo.get_estimate(id).await,
        Err(_) => repo.get_estimate_by_slug(reference).await,
    };
    found.with_context(|| format!("estimate '{reference}' not found"))
}

/// Imports an estimate document, recomputes every total and stores it.
///
/// Identity fields in the document are ignored; the estimate gets a fresh
/// id and slug. A missing or zero estimate number takes the next free one.
pub async fn import_estimate(
    repo: &dyn EstimateRepository,
    json: &str,
) -> Result<Estimate> {
    let mut doc: serde_json::Value = serde_json::from_str(json).context("estimate is not valid JSON")?;
    let Some(fields) = doc.as_object_mut() else {
        bail!("estimate JSON must be an object");
    };
    for identity in ["_id", "slug", "createdAt", "updatedAt"] {
        fields.remove(identity);
    }
    let mut estimate: Estimate = serde_json::from_value(doc).context("estimate JSON has an unexpected shape")?;

    if estimate.estimate_number <= 0 {
        estimate.estimate_number = repo.next_estimate_number().await?;
        debug!(number = estimate.estimate_number, "assigned estimate number");
    }
    let fringes = repo.list_fringe_constants().await?;
    estimate.recompute_totals(&fringes);

    let created = repo
        .create_estimate(estimate)
        .await
        .context("cannot store imported estimate")?;
    info!(id = ?created.id, number = created.estimate_number, items = created.item_count(), "estimate imported");
    Ok(created)
}

pub async fn summary(
    repo: &dyn EstimateRepository,
    reference: &str,
) -> Result<String> {
    let estimate = find_estimate(repo, reference).await?;
    let fringes = repo.list_fringe_constants().await?;
    Ok(report::estimate_summary(&estimate, &fringes))
}

/// Explains how one line item's total was reached.
pub async fn breakdown(
    repo: &dyn EstimateRepository,
    reference: &str,
    item_key: &str,
) -> Result<String> {
    let estimate = find_estimate(repo, reference).await?;
    let item = estimate
        .find_item(item_key)
        .ok_or_else(|| anyhow!("estimate '{reference}' has no item '{item_key}'"))?;

    match &item {
        LineItem::Labor(labor) => {
            let fringes = repo.list_fringe_constants().await?;
            let breakdown = LaborCalculator::new(&fringes).calculate(labor);
            Ok(report::labor_breakdown(&item, labor.fringe.as_deref(), &breakdown))
        }
        _ => Ok(report::item_total(&item)),
    }
}

/// Renders `template_id` against the estimate and saves the result.
///
/// Returns the outcome and the stored proposal HTML.
pub async fn proposal(
    repo: &dyn EstimateRepository,
    reference: &str,
    template_id: &str,
    force: bool,
) -> Result<(RegenerateOutcome, String)> {
    let mut estimate = find_estimate(repo, reference).await?;
    let template = repo
        .get_template(template_id)
        .await
        .with_context(|| format!("template '{template_id}' not found"))?;
    let fringes = repo.list_fringe_constants().await?;

    let outcome = regenerate(&mut estimate, &template, &fringes, force);
    if outcome == RegenerateOutcome::Generated {
        estimate = repo.update_estimate(&estimate).await.context("cannot save proposal")?;
        info!(template = %template.id, "proposal generated");
    }

    let html = estimate
        .proposals
        .get(&template.id)
        .map(|p| p.html.clone())
        .unwrap_or_default();
    Ok((outcome, html))
}

/// Stores hand-edited proposal HTML so later runs keep it until forced.
pub async fn save_edited_proposal(
    repo: &dyn EstimateRepository,
    reference: &str,
    template_id: &str,
    html: String,
) -> Result<Estimate> {
    let mut estimate = find_estimate(repo, reference).await?;
    repo.get_template(template_id)
        .await
        .with_context(|| format!("template '{template_id}' not found"))?;

    mark_custom(&mut estimate, template_id, html);
    let saved = repo
        .update_estimate(&estimate)
        .await
        .context("cannot save edited proposal")?;
    info!(template = template_id, "edited proposal saved");
    Ok(saved)
}

/// Saves the next version of an estimate's chain.
pub async fn new_version(
    repo: &dyn EstimateRepository,
    reference: &str,
) -> Result<Estimate> {
    let current = find_estimate(repo, reference).await?;
    let latest = repo
        .list_versions(current.estimate_number)
        .await?
        .into_iter()
        .max_by_key(|e| e.version_number)
        .unwrap_or(current);

    let created = repo
        .create_estimate(latest.next_version())
        .await
        .context("cannot create new version")?;
    info!(number = created.estimate_number, version = created.version_number, "version created");
    Ok(created)
}

/// Copies an estimate into version 1 of a new estimate number.
pub async fn copy_estimate(
    repo: &dyn EstimateRepository,
    reference: &str,
) -> Result<Estimate> {
    let source = find_estimate(repo, reference).await?;
    let number = repo.next_estimate_number().await?;

    let created = repo
        .create_estimate(source.copy_as(number))
        .await
        .context("cannot create copy")?;
    info!(from = source.estimate_number, to = created.estimate_number, "estimate copied");
    Ok(created)
}

pub async fn fringes(repo: &dyn EstimateRepository) -> Result<String> {
    Ok(report::fringe_table(&repo.list_fringe_constants().await?))
}

pub async fn list(repo: &dyn EstimateRepository) -> Result<String> {
    Ok(report::estimate_list(&repo.list_estimates().await?))
}

/// Header fields changed by the `edit` command. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct HeaderEdit {
    pub customer: Option<String>,
    pub contact: Option<String>,
    pub job_address: Option<String>,
    pub project_name: Option<String>,
    pub markup: Option<String>,
    pub status: Option<String>,
}

impl HeaderEdit {
    fn is_empty(&self) -> bool {
        self.customer.is_none()
            && self.contact.is_none()
            && self.job_address.is_none()
            && self.project_name.is_none()
            && self.markup.is_none()
            && self.status.is_none()
    }

    fn apply(
        self,
        estimate: &mut Estimate,
    ) {
        let set = |field: &mut Option<String>, value: Option<String>| {
            if let Some(value) = value {
                *field = Some(value).filter(|v| !v.trim().is_empty());
            }
        };
        set(&mut estimate.customer, self.customer);
        set(&mut estimate.contact, self.contact);
        set(&mut estimate.job_address, self.job_address);
        set(&mut estimate.project_name, self.project_name);
        if let Some(markup) = self.markup {
            estimate.markup = MarkupPct::parse(&markup);
        }
        if let Some(status) = self.status {
            estimate.status = EstimateStatus::parse(&status);
        }
    }
}

/// Applies header edits through an autosave session and flushes them.
pub async fn edit_estimate(
    repo: &dyn EstimateRepository,
    reference: &str,
    edit: HeaderEdit,
    debounce: Duration,
) -> Result<FlushOutcome> {
    let estimate = find_estimate(repo, reference).await?;
    if edit.is_empty() {
        return Ok(FlushOutcome::Clean);
    }
    let fringes = repo.list_fringe_constants().await?;

    let mut session = EditSession::new(estimate, fringes).with_debounce(debounce);
    session.edit(Instant::now(), |e| edit.apply(e));
    let outcome = session.flush(repo).await?;

    if let FlushOutcome::Reconciled { error, diff } = &outcome {
        warn!(%error, fields = ?diff.header, "edit was not saved; estimate reloaded from storage");
    }
    Ok(outcome)
}
