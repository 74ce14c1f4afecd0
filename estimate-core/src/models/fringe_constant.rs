use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lenient;

/// A named fringe benefit profile (e.g. "Union", "Non-Union").
///
/// Percentages are stored as whole percents (`10` means 10%); the fringe
/// amount is dollars per hour worked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FringeConstant {
    pub name: String,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub w_comp_percent: Decimal,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub payroll_tax_percent: Decimal,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub fringe_amount: Decimal,
}
