//! Section view-models for an estimate.
//!
//! Sections are always rebuilt from raw item fields; stored totals are never
//! read.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{add, sum};
use crate::calculations::totals::recompute_item;
use crate::{Estimate, FringeConstant, LineItem, LineItemCategory};

/// Colors for labor sections and fringe groups.
pub const LABOR_PALETTE: [&str; 6] = [
    "#2563eb", "#7c3aed", "#0891b2", "#4f46e5", "#0d9488", "#9333ea",
];

/// Base display color for a category.
pub fn category_color(category: LineItemCategory) -> &'static str {
    match category {
        LineItemCategory::Labor => LABOR_PALETTE[0],
        LineItemCategory::Equipment => "#f59e0b",
        LineItemCategory::Material => "#10b981",
        LineItemCategory::Tools => "#ef4444",
        LineItemCategory::Overhead => "#6b7280",
        LineItemCategory::Subcontractor => "#ec4899",
        LineItemCategory::Disposal => "#84cc16",
        LineItemCategory::Miscellaneous => "#14b8a6",
    }
}

/// FNV-1a; stable across runs and platforms.
fn stable_hash(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn palette_color(key: &str) -> &'static str {
    LABOR_PALETTE[(stable_hash(key) % LABOR_PALETTE.len() as u64) as usize]
}

fn fringe_key(name: Option<&str>) -> String {
    name.map(|n| n.trim().to_ascii_lowercase()).unwrap_or_default()
}

/// Labor color for a set of fringe profile names; no names gives the base color.
pub fn labor_color<'a, I>(fringe_names: I) -> &'static str
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let names: BTreeSet<String> = fringe_names
        .into_iter()
        .map(fringe_key)
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return category_color(LineItemCategory::Labor);
    }
    palette_color(&names.into_iter().collect::<Vec<_>>().join("|"))
}

/// Labor items sharing a fringe profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FringeGroup {
    pub name: String,
    pub color: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: LineItemCategory,
    pub title: String,
    pub color: String,
    /// Items with freshly computed totals.
    pub items: Vec<LineItem>,
    /// Per-fringe subtotals; only populated for the labor section.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fringe_groups: Vec<FringeGroup>,
}

impl Section {
    pub fn total(&self) -> Decimal {
        sum(self.items.iter().map(LineItem::total))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn fringe_groups(items: &[LineItem]) -> Vec<FringeGroup> {
    let mut groups: Vec<FringeGroup> = Vec::new();
    for item in items {
        let LineItem::Labor(labor) = item else {
            continue;
        };
        let name = labor
            .fringe
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Unassigned")
            .to_string();
        match groups.iter_mut().find(|g| g.name.eq_ignore_ascii_case(&name)) {
            Some(group) => group.total = add(group.total, labor.total),
            None => groups.push(FringeGroup {
                color: palette_color(&name.to_ascii_lowercase()).to_string(),
                name,
                total: labor.total,
            }),
        }
    }
    groups
}

/// Builds one section for `category` with every item's total recomputed.
pub fn build_section(
    estimate: &Estimate,
    category: LineItemCategory,
    fringes: &[FringeConstant],
) -> Section {
    let items: Vec<LineItem> = estimate
        .category_items(category)
        .into_iter()
        .map(|mut item| {
            recompute_item(&mut item, fringes);
            item
        })
        .collect();

    let (color, groups) = match category {
        LineItemCategory::Labor => (
            labor_color(estimate.labor.iter().map(|l| l.fringe.as_deref())),
            fringe_groups(&items),
        ),
        other => (category_color(other), Vec::new()),
    };

    Section {
        id: category,
        title: category.title().to_string(),
        color: color.to_string(),
        items,
        fringe_groups: groups,
    }
}

/// Builds all eight sections in fixed category order.
pub fn build_sections(
    estimate: &Estimate,
    fringes: &[FringeConstant],
) -> Vec<Section> {
    LineItemCategory::ALL
        .into_iter()
        .map(|category| build_section(estimate, category, fringes))
        .collect()
}
