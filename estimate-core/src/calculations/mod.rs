//! Cost calculations for construction estimates.
//!
//! Everything here is a pure function of an item's raw fields and the fringe
//! profiles in effect; stored totals are outputs, never inputs.

pub mod chart;
pub mod common;
pub mod fringe;
pub mod labor;
pub mod sections;
pub mod totals;

pub use chart::{ChartSlice, ChartSummary, apply_markup, summarize, summarize_estimate};
pub use fringe::{FringeRates, lookup_fringe};
pub use labor::{LaborBreakdown, LaborCalculator, LaborTier, TierBreakdown};
pub use sections::{FringeGroup, Section, build_section, build_sections};
pub use totals::{line_item_total, recompute_item};
