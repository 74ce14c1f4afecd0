use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estimate_core::{
    EquipmentItem, Estimate, EstimateRepository, EstimateStatus, FringeConstant, LaborItem,
    MarkupPct, MaterialItem, OverheadItem, RepositoryError, SimpleItem, Template,
};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::decimal::{decimal_to_text, get_decimal};

const ESTIMATE_COLUMNS: &str = "id, slug, estimate_number, version_number, customer, contact,
    job_address, project_name, markup_pct, status, services, proposal_writer,
    line_items, proposals, created_at, updated_at";

/// First number handed out when no estimates exist yet.
const FIRST_ESTIMATE_NUMBER: i64 = 1001;

pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Maps a configured connection string to a sqlx URL.
///
/// `:memory:` and bare file paths are accepted alongside full `sqlite:` URLs.
pub fn connection_url(connection_string: &str) -> String {
    let s = connection_string.trim();
    if s == ":memory:" || s.is_empty() {
        "sqlite::memory:".to_string()
    } else if s.starts_with("sqlite:") {
        s.to_string()
    } else {
        format!("sqlite://{s}")
    }
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let url = connection_url(database_url);
        let options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("Invalid database URL: {}", url))?
            .create_if_missing(true);

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// The JSON document stored in `estimates.line_items`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LineItems {
    #[serde(default)]
    labor: Vec<LaborItem>,
    #[serde(default)]
    equipment: Vec<EquipmentItem>,
    #[serde(default)]
    material: Vec<MaterialItem>,
    #[serde(default)]
    tools: Vec<SimpleItem>,
    #[serde(default)]
    overhead: Vec<OverheadItem>,
    #[serde(default)]
    subcontractor: Vec<SimpleItem>,
    #[serde(default)]
    disposal: Vec<SimpleItem>,
    #[serde(default)]
    miscellaneous: Vec<SimpleItem>,
}

impl LineItems {
    fn from_estimate(e: &Estimate) -> Self {
        Self {
            labor: e.labor.clone(),
            equipment: e.equipment.clone(),
            material: e.material.clone(),
            tools: e.tools.clone(),
            overhead: e.overhead.clone(),
            subcontractor: e.subcontractor.clone(),
            disposal: e.disposal.clone(),
            miscellaneous: e.miscellaneous.clone(),
        }
    }

    fn apply_to(
        self,
        e: &mut Estimate,
    ) {
        e.labor = self.labor;
        e.equipment = self.equipment;
        e.material = self.material;
        e.tools = self.tools;
        e.overhead = self.overhead;
        e.subcontractor = self.subcontractor;
        e.disposal = self.disposal;
        e.miscellaneous = self.miscellaneous;
    }
}

/// Gives every unsaved line item a permanent id.
fn assign_item_ids(estimate: &mut Estimate) {
    estimate.promote_temp_ids(|| Uuid::new_v4().to_string());
}

fn row_to_estimate(row: &SqliteRow) -> Result<Estimate, RepositoryError> {
    let line_items: String = row.try_get("line_items").map_err(db_err)?;
    let proposals: String = row.try_get("proposals").map_err(db_err)?;
    let services: String = row.try_get("services").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;

    let mut estimate = Estimate {
        id: Some(row.try_get("id").map_err(db_err)?),
        slug: row.try_get("slug").map_err(db_err)?,
        estimate_number: row.try_get("estimate_number").map_err(db_err)?,
        version_number: row.try_get("version_number").map_err(db_err)?,
        customer: row.try_get("customer").map_err(db_err)?,
        contact: row.try_get("contact").map_err(db_err)?,
        job_address: row.try_get("job_address").map_err(db_err)?,
        project_name: row.try_get("project_name").map_err(db_err)?,
        markup: MarkupPct::from(get_decimal(row, "markup_pct")?),
        status: EstimateStatus::parse(&status),
        services: serde_json::from_str(&services)
            .map_err(|e| RepositoryError::Database(format!("Invalid services JSON: {}", e)))?,
        proposal_writer: row.try_get("proposal_writer").map_err(db_err)?,
        proposals: serde_json::from_str(&proposals)
            .map_err(|e| RepositoryError::Database(format!("Invalid proposals JSON: {}", e)))?,
        created_at: Some(
            row.try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
        ),
        updated_at: Some(
            row.try_get::<DateTime<Utc>, _>("updated_at")
                .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
        ),
        ..Default::default()
    };

    let items: LineItems = serde_json::from_str(&line_items)
        .map_err(|e| RepositoryError::Database(format!("Invalid line_items JSON: {}", e)))?;
    items.apply_to(&mut estimate);
    Ok(estimate)
}

fn row_to_fringe_constant(row: &SqliteRow) -> Result<FringeConstant, RepositoryError> {
    Ok(FringeConstant {
        name: row.try_get("name").map_err(db_err)?,
        w_comp_percent: get_decimal(row, "w_comp_percent")?,
        payroll_tax_percent: get_decimal(row, "payroll_tax_percent")?,
        fringe_amount: get_decimal(row, "fringe_amount")?,
    })
}

fn row_to_template(row: &SqliteRow) -> Result<Template, RepositoryError> {
    Ok(Template {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        body: row.try_get("body").map_err(db_err)?,
    })
}

/// Serialized column values shared by insert and update.
struct EstimateColumns {
    services: String,
    line_items: String,
    proposals: String,
}

impl EstimateColumns {
    fn from_estimate(estimate: &Estimate) -> Result<Self, RepositoryError> {
        Ok(Self {
            services: serde_json::to_string(&estimate.services).map_err(db_err)?,
            line_items: serde_json::to_string(&LineItems::from_estimate(estimate))
                .map_err(db_err)?,
            proposals: serde_json::to_string(&estimate.proposals).map_err(db_err)?,
        })
    }
}

#[async_trait]
impl EstimateRepository for SqliteRepository {
    async fn list_fringe_constants(&self) -> Result<Vec<FringeConstant>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, w_comp_percent, payroll_tax_percent, fringe_amount
             FROM fringe_constants ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_fringe_constant).collect()
    }

    async fn get_fringe_constant_by_name(
        &self,
        name: &str,
    ) -> Result<FringeConstant, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, w_comp_percent, payroll_tax_percent, fringe_amount
             FROM fringe_constants WHERE name = ?",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_fringe_constant(&row)
    }

    async fn upsert_fringe_constant(
        &self,
        constant: &FringeConstant,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO fringe_constants (name, w_comp_percent, payroll_tax_percent, fringe_amount)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                w_comp_percent = excluded.w_comp_percent,
                payroll_tax_percent = excluded.payroll_tax_percent,
                fringe_amount = excluded.fringe_amount",
        )
        .bind(constant.name.trim())
        .bind(decimal_to_text(constant.w_comp_percent))
        .bind(decimal_to_text(constant.payroll_tax_percent))
        .bind(decimal_to_text(constant.fringe_amount))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_fringe_constant(
        &self,
        name: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM fringe_constants WHERE name = ?")
            .bind(name.trim())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn create_estimate(
        &self,
        mut estimate: Estimate,
    ) -> Result<Estimate, RepositoryError> {
        let now = Utc::now();
        assign_item_ids(&mut estimate);
        let slug = estimate
            .slug
            .clone()
            .unwrap_or_else(|| estimate.default_slug());
        let columns = EstimateColumns::from_estimate(&estimate)?;

        let result = sqlx::query(
            "INSERT INTO estimates (
                slug, estimate_number, version_number, customer, contact,
                job_address, project_name, markup_pct, status, services,
                proposal_writer, line_items, proposals, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&slug)
        .bind(estimate.estimate_number)
        .bind(estimate.version_number)
        .bind(&estimate.customer)
        .bind(&estimate.contact)
        .bind(&estimate.job_address)
        .bind(&estimate.project_name)
        .bind(decimal_to_text(estimate.markup.value()))
        .bind(estimate.status.as_str())
        .bind(&columns.services)
        .bind(&estimate.proposal_writer)
        .bind(&columns.line_items)
        .bind(&columns.proposals)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        info!(estimate_id = id, slug = %slug, "estimate created");
        self.get_estimate(id).await
    }

    async fn get_estimate(
        &self,
        id: i64,
    ) -> Result<Estimate, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ESTIMATE_COLUMNS} FROM estimates WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_estimate(&row)
    }

    async fn get_estimate_by_slug(
        &self,
        slug: &str,
    ) -> Result<Estimate, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ESTIMATE_COLUMNS} FROM estimates WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_estimate(&row)
    }

    async fn update_estimate(
        &self,
        estimate: &Estimate,
    ) -> Result<Estimate, RepositoryError> {
        let id = estimate.id.ok_or(RepositoryError::NotFound)?;
        let mut estimate = estimate.clone();
        assign_item_ids(&mut estimate);
        let columns = EstimateColumns::from_estimate(&estimate)?;

        let result = sqlx::query(
            "UPDATE estimates SET
                customer = ?, contact = ?, job_address = ?, project_name = ?,
                markup_pct = ?, status = ?, services = ?, proposal_writer = ?,
                line_items = ?, proposals = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&estimate.customer)
        .bind(&estimate.contact)
        .bind(&estimate.job_address)
        .bind(&estimate.project_name)
        .bind(decimal_to_text(estimate.markup.value()))
        .bind(estimate.status.as_str())
        .bind(&columns.services)
        .bind(&estimate.proposal_writer)
        .bind(&columns.line_items)
        .bind(&columns.proposals)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        debug!(estimate_id = id, items = estimate.item_count(), "estimate updated");
        self.get_estimate(id).await
    }

    async fn delete_estimate(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM estimates WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_estimates(&self) -> Result<Vec<Estimate>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ESTIMATE_COLUMNS} FROM estimates e
             WHERE version_number = (
                SELECT MAX(version_number) FROM estimates
                WHERE estimate_number = e.estimate_number
             )
             ORDER BY estimate_number DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_estimate).collect()
    }

    async fn list_versions(
        &self,
        estimate_number: i64,
    ) -> Result<Vec<Estimate>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ESTIMATE_COLUMNS} FROM estimates
             WHERE estimate_number = ? ORDER BY version_number"
        ))
        .bind(estimate_number)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_estimate).collect()
    }

    async fn next_estimate_number(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT MAX(estimate_number) AS last FROM estimates")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let last: Option<i64> = row.try_get("last").map_err(db_err)?;

        Ok(last.map_or(FIRST_ESTIMATE_NUMBER, |n| n + 1))
    }

    async fn list_templates(&self) -> Result<Vec<Template>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, body FROM templates ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(row_to_template).collect()
    }

    async fn get_template(
        &self,
        id: &str,
    ) -> Result<Template, RepositoryError> {
        let row = sqlx::query("SELECT id, name, body FROM templates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_template(&row)
    }

    async fn upsert_template(
        &self,
        template: &Template,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO templates (id, name, body) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, body = excluded.body",
        )
        .bind(&template.id)
        .bind(&template.name)
        .bind(&template.body)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use estimate_core::{ItemMeta, LineItem, LineItemCategory};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let repo = SqliteRepository::new(":memory:")
            .await
            .expect("Failed to create in-memory database");
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn create_test_estimate() -> Estimate {
        let mut e = Estimate::new(2001);
        e.customer = Some("Harbor Marine".to_string());
        e.project_name = Some("Pier 4 Decking".to_string());
        e.markup = MarkupPct::parse("12.5%");
        e.services = vec!["Carpentry".to_string()];
        e.add_item(
            LineItem::Material(MaterialItem {
                meta: ItemMeta::named("Decking boards"),
                quantity: Some(dec!(120)),
                cost: Some(dec!(14.35)),
                taxes: Some(dec!(141.71)),
                ..Default::default()
            }),
            &[],
        );
        e.add_item(
            LineItem::Labor(LaborItem {
                meta: ItemMeta::named("Carpenter"),
                fringe: Some("Union".to_string()),
                base_pay: Some(dec!(42.50)),
                quantity: Some(dec!(3)),
                days: Some(dec!(4)),
                ..Default::default()
            }),
            &[],
        );
        e
    }

    // =========================================================================
    // connection strings
    // =========================================================================

    #[test]
    fn test_connection_url_forms() {
        assert_eq!(connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(connection_url("estimates.db"), "sqlite://estimates.db");
        assert_eq!(connection_url("sqlite:data.db?mode=rwc"), "sqlite:data.db?mode=rwc");
    }

    // =========================================================================
    // fringe constants
    // =========================================================================

    #[tokio::test]
    async fn test_upsert_and_get_fringe_constant() {
        let repo = setup_test_db().await;
        let union = FringeConstant {
            name: "Union".to_string(),
            w_comp_percent: dec!(12),
            payroll_tax_percent: dec!(9.65),
            fringe_amount: dec!(18.4),
        };

        repo.upsert_fringe_constant(&union).await.unwrap();

        assert_eq!(repo.get_fringe_constant_by_name("Union").await.unwrap(), union);
    }

    #[tokio::test]
    async fn test_fringe_lookup_is_case_insensitive() {
        let repo = setup_test_db().await;
        repo.upsert_fringe_constant(&FringeConstant {
            name: "Non-Union".to_string(),
            w_comp_percent: dec!(12),
            payroll_tax_percent: dec!(9.65),
            fringe_amount: dec!(0),
        })
        .await
        .unwrap();

        let found = repo.get_fringe_constant_by_name(" non-union ").await.unwrap();

        assert_eq!(found.name, "Non-Union");
    }

    #[tokio::test]
    async fn test_upsert_fringe_constant_replaces_rates() {
        let repo = setup_test_db().await;
        let mut union = FringeConstant {
            name: "Union".to_string(),
            w_comp_percent: dec!(12),
            payroll_tax_percent: dec!(9.65),
            fringe_amount: dec!(18.4),
        };
        repo.upsert_fringe_constant(&union).await.unwrap();

        union.fringe_amount = dec!(19.1);
        repo.upsert_fringe_constant(&union).await.unwrap();

        let all = repo.list_fringe_constants().await.unwrap();
        assert_eq!(all, vec![union]);
    }

    #[tokio::test]
    async fn test_delete_missing_fringe_constant_is_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(
            repo.delete_fringe_constant("Nope").await,
            Err(RepositoryError::NotFound)
        );
    }

    // =========================================================================
    // estimates
    // =========================================================================

    #[tokio::test]
    async fn test_create_estimate_assigns_identity() {
        let repo = setup_test_db().await;

        let created = repo.create_estimate(create_test_estimate()).await.unwrap();

        assert!(created.id.is_some());
        assert_eq!(created.slug.as_deref(), Some("est-2001-v1"));
        assert!(created.created_at.is_some());
        assert!(created.all_items().iter().all(|i| i.meta().id.is_some()));
    }

    #[tokio::test]
    async fn test_estimate_round_trips_fields_and_items() {
        let repo = setup_test_db().await;
        let original = create_test_estimate();

        let created = repo.create_estimate(original.clone()).await.unwrap();
        let fetched = repo.get_estimate(created.id.unwrap()).await.unwrap();

        assert_eq!(fetched.customer, original.customer);
        assert_eq!(fetched.markup, MarkupPct::from(dec!(12.5)));
        assert_eq!(fetched.services, original.services);
        assert_eq!(fetched.material[0].cost, Some(dec!(14.35)));
        assert_eq!(fetched.material[0].total, original.material[0].total);
        assert_eq!(fetched.labor[0].fringe.as_deref(), Some("Union"));
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_estimate_by_slug() {
        let repo = setup_test_db().await;
        let created = repo.create_estimate(create_test_estimate()).await.unwrap();

        let fetched = repo.get_estimate_by_slug("est-2001-v1").await.unwrap();

        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn test_get_estimate_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_estimate(999).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_update_estimate_promotes_new_items() {
        let repo = setup_test_db().await;
        let mut estimate = repo.create_estimate(create_test_estimate()).await.unwrap();

        let key = estimate.add_item(LineItem::blank(LineItemCategory::Disposal), &[]);
        estimate.customer = Some("Harbor Marine LLC".to_string());
        let saved = repo.update_estimate(&estimate).await.unwrap();

        assert!(key.starts_with("temp-"));
        assert_eq!(saved.disposal.len(), 1);
        assert!(saved.disposal[0].meta.id.is_some());
        assert_eq!(saved.customer.as_deref(), Some("Harbor Marine LLC"));
        assert_eq!(saved.material[0].meta.id, estimate.material[0].meta.id);
    }

    #[tokio::test]
    async fn test_update_missing_estimate_is_not_found() {
        let repo = setup_test_db().await;
        let mut estimate = create_test_estimate();
        estimate.id = Some(404);

        assert_eq!(
            repo.update_estimate(&estimate).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_delete_estimate() {
        let repo = setup_test_db().await;
        let created = repo.create_estimate(create_test_estimate()).await.unwrap();
        let id = created.id.unwrap();

        repo.delete_estimate(id).await.unwrap();

        assert_eq!(repo.get_estimate(id).await, Err(RepositoryError::NotFound));
        assert_eq!(repo.delete_estimate(id).await, Err(RepositoryError::NotFound));
    }

    // =========================================================================
    // versions and numbering
    // =========================================================================

    #[tokio::test]
    async fn test_versions_share_number() {
        let repo = setup_test_db().await;
        let v1 = repo.create_estimate(create_test_estimate()).await.unwrap();
        let v2 = repo.create_estimate(v1.next_version()).await.unwrap();

        let versions = repo.list_versions(2001).await.unwrap();

        assert_eq!(
            versions.iter().map(|e| e.version_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(v2.slug.as_deref(), Some("est-2001-v2"));
        assert_ne!(v2.material[0].meta.id, v1.material[0].meta.id);
    }

    #[tokio::test]
    async fn test_duplicate_version_is_rejected() {
        let repo = setup_test_db().await;
        repo.create_estimate(create_test_estimate()).await.unwrap();

        let mut duplicate = create_test_estimate();
        duplicate.slug = Some("another-slug".to_string());

        assert!(matches!(
            repo.create_estimate(duplicate).await,
            Err(RepositoryError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_list_estimates_returns_latest_versions() {
        let repo = setup_test_db().await;
        let v1 = repo.create_estimate(create_test_estimate()).await.unwrap();
        repo.create_estimate(v1.next_version()).await.unwrap();
        repo.create_estimate(v1.copy_as(2002)).await.unwrap();

        let listed = repo.list_estimates().await.unwrap();

        let keys: Vec<_> = listed
            .iter()
            .map(|e| (e.estimate_number, e.version_number))
            .collect();
        assert_eq!(keys, vec![(2002, 1), (2001, 2)]);
    }

    #[tokio::test]
    async fn test_next_estimate_number() {
        let repo = setup_test_db().await;
        assert_eq!(repo.next_estimate_number().await.unwrap(), FIRST_ESTIMATE_NUMBER);

        repo.create_estimate(create_test_estimate()).await.unwrap();

        assert_eq!(repo.next_estimate_number().await.unwrap(), 2002);
    }

    // =========================================================================
    // templates
    // =========================================================================

    #[tokio::test]
    async fn test_upsert_and_list_templates() {
        let repo = setup_test_db().await;
        let mut template = Template {
            id: "short".to_string(),
            name: "Short form".to_string(),
            body: "<p>{{grandTotal}}</p>".to_string(),
        };
        repo.upsert_template(&template).await.unwrap();
        template.body = "<p>{{ customer }}: {{grandTotal}}</p>".to_string();
        repo.upsert_template(&template).await.unwrap();

        assert_eq!(repo.get_template("short").await.unwrap(), template);
        assert_eq!(repo.list_templates().await.unwrap(), vec![template]);
    }

    #[tokio::test]
    async fn test_get_template_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_template("missing").await, Err(RepositoryError::NotFound));
    }
}
