//! Fringe benefit profile lookup.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::FringeConstant;

/// Rates resolved from a fringe profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FringeRates {
    /// Workers-compensation percentage (whole percent).
    pub wcomp_pct: Decimal,
    /// Payroll-tax percentage (whole percent).
    pub payroll_pct: Decimal,
    /// Fringe dollars per hour.
    pub fringe_amount: Decimal,
}

impl From<&FringeConstant> for FringeRates {
    fn from(c: &FringeConstant) -> Self {
        Self {
            wcomp_pct: c.w_comp_percent,
            payroll_pct: c.payroll_tax_percent,
            fringe_amount: c.fringe_amount,
        }
    }
}

/// Resolves a fringe profile by name.
///
/// Names are compared trimmed and case-insensitively. An empty or unknown
/// name yields all-zero rates so an incomplete record still produces a total.
pub fn lookup_fringe(
    name: Option<&str>,
    constants: &[FringeConstant],
) -> FringeRates {
    let wanted = name.map(str::trim).unwrap_or_default();
    if wanted.is_empty() {
        return FringeRates::default();
    }

    match constants
        .iter()
        .find(|c| c.name.trim().eq_ignore_ascii_case(wanted))
    {
        Some(constant) => FringeRates::from(constant),
        None => {
            debug!(fringe = wanted, "no fringe profile with this name, using zero rates");
            FringeRates::default()
        }
    }
}
