//! Debounced autosave for an estimate being edited.
//!
//! An [`EditSession`] owns the local copy of one estimate and a single
//! deadline. Every edit is applied locally right away and pushes the deadline
//! out; the caller drives time by passing `now` and flushes when due.
//!
//! ```text
//!   Idle ──edit──▶ Dirty ──flush──▶ Saving ──ok──▶ Idle
//!                    ▲                  │
//!                    └──────edit─────── Error ◀──failed (reloaded)
//! ```
//!
//! A failed write never leaves stale local state behind: the session
//! re-fetches the stored estimate, reports what differed, and adopts it.
//! Saves are not sequenced against each other; the last write wins.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::repository::{EstimateRepository, RepositoryError};
use crate::models::{Estimate, FringeConstant, LineItem, LineItemCategory};

/// Quiet period before pending edits are written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Dirty,
    Saving,
    /// The last write failed; local state was replaced by the stored copy.
    Error(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("estimate has not been created yet")]
    Unsaved,

    #[error("save failed ({save}) and the stored estimate could not be reloaded: {reload}")]
    Reload {
        save: RepositoryError,
        reload: RepositoryError,
    },
}

/// Item keys that differ between two copies of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl CategoryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// What reconciling replaced: `added` items exist only in the stored copy,
/// `removed` items existed only locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EstimateDiff {
    pub header: Vec<&'static str>,
    pub items: BTreeMap<LineItemCategory, CategoryDiff>,
}

impl EstimateDiff {
    pub fn between(
        local: &Estimate,
        stored: &Estimate,
    ) -> Self {
        let header_fields: [(&'static str, bool); 8] = [
            ("customer", local.customer != stored.customer),
            ("contact", local.contact != stored.contact),
            ("jobAddress", local.job_address != stored.job_address),
            ("projectName", local.project_name != stored.project_name),
            ("markup", local.markup != stored.markup),
            ("status", local.status != stored.status),
            ("services", local.services != stored.services),
            ("proposalWriter", local.proposal_writer != stored.proposal_writer),
        ];
        let header = header_fields
            .into_iter()
            .filter_map(|(name, differs)| differs.then_some(name))
            .collect();

        let items = LineItemCategory::ALL
            .into_iter()
            .map(|category| {
                (
                    category,
                    diff_items(&local.category_items(category), &stored.category_items(category)),
                )
            })
            .filter(|(_, diff)| !diff.is_empty())
            .collect();

        Self { header, items }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.items.is_empty()
    }
}

fn keyed(items: &[LineItem]) -> BTreeMap<String, &LineItem> {
    items
        .iter()
        .filter_map(|item| item.key().map(|k| (k.to_string(), item)))
        .collect()
}

fn diff_items(
    local: &[LineItem],
    stored: &[LineItem],
) -> CategoryDiff {
    let local = keyed(local);
    let stored = keyed(stored);
    let keys: BTreeSet<&String> = local.keys().chain(stored.keys()).collect();

    let mut diff = CategoryDiff::default();
    for key in keys {
        match (local.get(key), stored.get(key)) {
            (None, Some(_)) => diff.added.push(key.clone()),
            (Some(_), None) => diff.removed.push(key.clone()),
            (Some(a), Some(b)) if a != b => diff.changed.push(key.clone()),
            _ => {}
        }
    }
    diff
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to write.
    Clean,
    /// Edits are pending but the deadline has not passed.
    Pending,
    Saved,
    /// The write failed and local state now mirrors the stored estimate.
    Reconciled {
        error: RepositoryError,
        diff: EstimateDiff,
    },
}

pub struct EditSession {
    estimate: Estimate,
    fringes: Vec<FringeConstant>,
    state: SaveState,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl EditSession {
    /// Starts a session on a stored estimate. Totals are recomputed on entry.
    pub fn new(
        mut estimate: Estimate,
        fringes: Vec<FringeConstant>,
    ) -> Self {
        estimate.recompute_totals(&fringes);
        Self {
            estimate,
            fringes,
            state: SaveState::Idle,
            debounce: DEFAULT_DEBOUNCE,
            deadline: None,
        }
    }

    pub fn with_debounce(
        mut self,
        debounce: Duration,
    ) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn estimate(&self) -> &Estimate {
        &self.estimate
    }

    pub fn fringes(&self) -> &[FringeConstant] {
        &self.fringes
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn into_estimate(self) -> Estimate {
        self.estimate
    }

    /// Applies a local edit, recomputes totals and restarts the debounce timer.
    pub fn edit<F, R>(
        &mut self,
        now: Instant,
        f: F,
    ) -> R
    where
        F: FnOnce(&mut Estimate) -> R,
    {
        let result = f(&mut self.estimate);
        self.estimate.recompute_totals(&self.fringes);
        self.state = SaveState::Dirty;
        self.deadline = Some(now + self.debounce);
        result
    }

    /// Swaps the fringe profiles in effect; labor totals change immediately.
    pub fn set_fringes(
        &mut self,
        now: Instant,
        fringes: Vec<FringeConstant>,
    ) {
        self.fringes = fringes;
        self.edit(now, |_| ());
    }

    pub fn is_due(
        &self,
        now: Instant,
    ) -> bool {
        self.state == SaveState::Dirty && self.deadline.is_some_and(|d| now >= d)
    }

    /// Writes pending edits if the debounce deadline has passed.
    pub async fn flush_if_due(
        &mut self,
        now: Instant,
        repo: &dyn EstimateRepository,
    ) -> Result<FlushOutcome, SessionError> {
        match self.state {
            SaveState::Dirty if self.is_due(now) => self.flush(repo).await,
            SaveState::Dirty => Ok(FlushOutcome::Pending),
            _ => Ok(FlushOutcome::Clean),
        }
    }

    /// Writes pending edits now, ignoring the deadline.
    pub async fn flush(
        &mut self,
        repo: &dyn EstimateRepository,
    ) -> Result<FlushOutcome, SessionError> {
        if self.state != SaveState::Dirty {
            return Ok(FlushOutcome::Clean);
        }
        let id = self.estimate.id.ok_or(SessionError::Unsaved)?;

        self.state = SaveState::Saving;
        self.deadline = None;

        match repo.update_estimate(&self.estimate).await {
            Ok(saved) => {
                info!(estimate_id = id, items = saved.item_count(), "estimate saved");
                self.estimate = saved;
                self.state = SaveState::Idle;
                Ok(FlushOutcome::Saved)
            }
            Err(save) => {
                warn!(estimate_id = id, error = %save, "save failed, reloading stored estimate");
                self.reconcile(id, save, repo).await
            }
        }
    }

    async fn reconcile(
        &mut self,
        id: i64,
        save: RepositoryError,
        repo: &dyn EstimateRepository,
    ) -> Result<FlushOutcome, SessionError> {
        match repo.get_estimate(id).await {
            Ok(mut stored) => {
                stored.recompute_totals(&self.fringes);
                let diff = EstimateDiff::between(&self.estimate, &stored);
                debug!(estimate_id = id, ?diff, "replacing local estimate with stored copy");
                self.estimate = stored;
                self.state = SaveState::Error(save.to_string());
                Ok(FlushOutcome::Reconciled { error: save, diff })
            }
            Err(reload) => {
                self.state = SaveState::Error(format!("{save}; reload failed: {reload}"));
                Err(SessionError::Reload { save, reload })
            }
        }
    }
}
