use std::io::Read;

use estimate_core::calculations::common::parse_optional_num;
use estimate_core::{EstimateRepository, FringeConstant, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when loading fringe profile data.
#[derive(Debug, Error)]
pub enum FringeLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for FringeLoaderError {
    fn from(err: csv::Error) -> Self {
        FringeLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the fringe profile CSV file.
///
/// - `name`: profile name referenced by labor items (e.g. `Union`)
/// - `w_comp_percent`: workers-compensation percentage, whole percent
/// - `payroll_tax_percent`: payroll-tax percentage, whole percent
/// - `fringe_amount`: fringe dollars per hour
///
/// Numbers may carry `%`, `$` or thousands separators; empty cells are zero.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FringeConstantRecord {
    pub name: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub w_comp_percent: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub payroll_tax_percent: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub fringe_amount: Decimal,
}

impl From<&FringeConstantRecord> for FringeConstant {
    fn from(record: &FringeConstantRecord) -> Self {
        FringeConstant {
            name: record.name.trim().to_string(),
            w_comp_percent: record.w_comp_percent,
            payroll_tax_percent: record.payroll_tax_percent,
            fringe_amount: record.fringe_amount,
        }
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Some(s) => parse_optional_num(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid number '{}'", s.trim()))),
        None => Ok(Decimal::ZERO),
    }
}

/// Loader for fringe profiles from CSV files.
///
/// Records go through the `EstimateRepository` trait, so any backend works.
pub struct FringeConstantLoader;

impl FringeConstantLoader {
    /// Parse and validate fringe records from a CSV reader.
    ///
    /// Rejects blank names and negative amounts, reporting the CSV line.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<FringeConstantRecord>, FringeLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut records = Vec::new();

        for result in csv_reader.records() {
            let raw = result?;
            let line = raw.position().map_or(0, |p| p.line());
            let record: FringeConstantRecord = raw.deserialize(Some(&headers))?;
            validate(&record).map_err(|reason| FringeLoaderError::InvalidRecord { line, reason })?;
            records.push(record);
        }

        Ok(records)
    }

    /// Upsert fringe records into the repository.
    ///
    /// Profiles are keyed by name, so loading the same file twice leaves the
    /// database unchanged. When a name repeats within one file the last row
    /// wins. Returns the number of distinct profiles written.
    pub async fn load<R: EstimateRepository + ?Sized>(
        repo: &R,
        records: &[FringeConstantRecord],
    ) -> Result<usize, FringeLoaderError> {
        let mut constants: Vec<FringeConstant> = Vec::new();
        for record in records {
            let constant = FringeConstant::from(record);
            match constants
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&constant.name))
            {
                Some(existing) => {
                    warn!(name = %constant.name, "fringe profile listed more than once, keeping last row");
                    *existing = constant;
                }
                None => constants.push(constant),
            }
        }

        for constant in &constants {
            repo.upsert_fringe_constant(constant).await?;
            debug!(name = %constant.name, "fringe profile loaded");
        }

        Ok(constants.len())
    }
}

fn validate(record: &FringeConstantRecord) -> Result<(), String> {
    if record.name.trim().is_empty() {
        return Err("name is empty".to_string());
    }
    let amounts = [
        ("w_comp_percent", record.w_comp_percent),
        ("payroll_tax_percent", record.payroll_tax_percent),
        ("fringe_amount", record.fringe_amount),
    ];
    if let Some((column, value)) = amounts.iter().find(|(_, v)| v.is_sign_negative() && !v.is_zero()) {
        return Err(format!("{} is negative ({})", column, value));
    }
    Ok(())
}
