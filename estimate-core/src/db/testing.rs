//! In-memory repository shared by unit tests in this crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use super::repository::{EstimateRepository, RepositoryError};
use crate::models::{Estimate, FringeConstant, Template};

#[derive(Default)]
struct Store {
    fringes: Vec<FringeConstant>,
    estimates: Vec<Estimate>,
    templates: Vec<Template>,
    next_id: i64,
    next_item: u64,
}

#[derive(Default)]
pub(crate) struct MemoryRepository {
    store: Mutex<Store>,
    pub fail_updates: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryRepository {
    pub fn with_fringes(fringes: Vec<FringeConstant>) -> Self {
        let repo = Self::default();
        repo.lock().fringes = fringes;
        repo
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    /// Overwrites a stored estimate directly, as another writer would.
    pub fn replace(
        &self,
        estimate: Estimate,
    ) {
        let mut store = self.lock();
        if let Some(slot) = store.estimates.iter_mut().find(|e| e.id == estimate.id) {
            *slot = estimate;
        }
    }

    fn stamp_items(
        store: &mut Store,
        estimate: &mut Estimate,
    ) {
        estimate.promote_temp_ids(|| {
            store.next_item += 1;
            format!("item-{}", store.next_item)
        });
    }
}

#[async_trait]
impl EstimateRepository for MemoryRepository {
    async fn list_fringe_constants(&self) -> Result<Vec<FringeConstant>, RepositoryError> {
        Ok(self.lock().fringes.clone())
    }

    async fn get_fringe_constant_by_name(
        &self,
        name: &str,
    ) -> Result<FringeConstant, RepositoryError> {
        self.lock()
            .fringes
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn upsert_fringe_constant(
        &self,
        constant: &FringeConstant,
    ) -> Result<(), RepositoryError> {
        let mut store = self.lock();
        store.fringes.retain(|f| f.name != constant.name);
        store.fringes.push(constant.clone());
        Ok(())
    }

    async fn delete_fringe_constant(
        &self,
        name: &str,
    ) -> Result<(), RepositoryError> {
        self.lock().fringes.retain(|f| f.name != name);
        Ok(())
    }

    async fn create_estimate(
        &self,
        mut estimate: Estimate,
    ) -> Result<Estimate, RepositoryError> {
        let mut store = self.lock();
        store.next_id += 1;
        estimate.id = Some(store.next_id);
        if estimate.slug.is_none() {
            estimate.slug = Some(estimate.default_slug());
        }
        estimate.created_at = Some(Utc::now());
        estimate.updated_at = estimate.created_at;
        Self::stamp_items(&mut store, &mut estimate);
        store.estimates.push(estimate.clone());
        Ok(estimate)
    }

    async fn get_estimate(
        &self,
        id: i64,
    ) -> Result<Estimate, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection("offline".to_string()));
        }
        self.lock()
            .estimates
            .iter()
            .find(|e| e.id == Some(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_estimate_by_slug(
        &self,
        slug: &str,
    ) -> Result<Estimate, RepositoryError> {
        self.lock()
            .estimates
            .iter()
            .find(|e| e.slug.as_deref() == Some(slug))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_estimate(
        &self,
        estimate: &Estimate,
    ) -> Result<Estimate, RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database("write rejected".to_string()));
        }
        let mut store = self.lock();
        let mut saved = estimate.clone();
        saved.updated_at = Some(Utc::now());
        Self::stamp_items(&mut store, &mut saved);
        let slot = store
            .estimates
            .iter_mut()
            .find(|e| e.id == estimate.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = saved.clone();
        Ok(saved)
    }

    async fn delete_estimate(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        self.lock().estimates.retain(|e| e.id != Some(id));
        Ok(())
    }

    async fn list_estimates(&self) -> Result<Vec<Estimate>, RepositoryError> {
        Ok(self.lock().estimates.clone())
    }

    async fn list_versions(
        &self,
        estimate_number: i64,
    ) -> Result<Vec<Estimate>, RepositoryError> {
        let mut versions: Vec<_> = self
            .lock()
            .estimates
            .iter()
            .filter(|e| e.estimate_number == estimate_number)
            .cloned()
            .collect();
        versions.sort_by_key(|e| e.version_number);
        Ok(versions)
    }

    async fn next_estimate_number(&self) -> Result<i64, RepositoryError> {
        let store = self.lock();
        Ok(store.estimates.iter().map(|e| e.estimate_number).max().unwrap_or(1000) + 1)
    }

    async fn list_templates(&self) -> Result<Vec<Template>, RepositoryError> {
        Ok(self.lock().templates.clone())
    }

    async fn get_template(
        &self,
        id: &str,
    ) -> Result<Template, RepositoryError> {
        self.lock()
            .templates
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn upsert_template(
        &self,
        template: &Template,
    ) -> Result<(), RepositoryError> {
        let mut store = self.lock();
        store.templates.retain(|t| t.id != template.id);
        store.templates.push(template.clone());
        Ok(())
    }
}
