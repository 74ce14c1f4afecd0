use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::lenient;
use super::line_item::{
    EquipmentItem, ItemMeta, LaborItem, LineItem, LineItemCategory, MaterialItem, OverheadItem,
    SimpleItem,
};
use super::template::StoredProposal;
use crate::calculations::common::parse_percent;
use crate::calculations::recompute_item;
use crate::models::FringeConstant;

/// Markup percentage applied on top of the section subtotal.
///
/// Deserializes from numbers or from strings such as `"15%"`; anything
/// unparseable becomes zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MarkupPct(pub Decimal);

impl MarkupPct {
    pub fn parse(s: &str) -> Self {
        Self(parse_percent(s))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for MarkupPct {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for MarkupPct {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl Serialize for MarkupPct {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for MarkupPct {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(lenient::decimal_or_zero(deserializer)?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStatus {
    #[default]
    Draft,
    Sent,
    Approved,
    Rejected,
    Archived,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }

    /// Unknown statuses read as [`EstimateStatus::Draft`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "sent" => Self::Sent,
            "approved" | "accepted" | "won" => Self::Approved,
            "rejected" | "declined" | "lost" => Self::Rejected,
            "archived" => Self::Archived,
            _ => Self::Draft,
        }
    }
}

impl<'de> Deserialize<'de> for EstimateStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient::string(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

fn first_version() -> i32 {
    1
}

/// An estimate and all of its line items.
///
/// Estimates sharing an `estimate_number` form a version chain ordered by
/// `version_number`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub slug: Option<String>,

    #[serde(rename = "estimate", default)]
    pub estimate_number: i64,

    #[serde(default = "first_version")]
    pub version_number: i32,

    #[serde(default, deserialize_with = "lenient::string")]
    pub customer: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub contact: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub job_address: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub project_name: Option<String>,

    #[serde(default)]
    pub markup: MarkupPct,

    #[serde(default)]
    pub status: EstimateStatus,

    #[serde(default)]
    pub services: Vec<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub proposal_writer: Option<String>,

    #[serde(default)]
    pub labor: Vec<LaborItem>,
    #[serde(default)]
    pub equipment: Vec<EquipmentItem>,
    #[serde(default)]
    pub material: Vec<MaterialItem>,
    #[serde(default)]
    pub tools: Vec<SimpleItem>,
    #[serde(default)]
    pub overhead: Vec<OverheadItem>,
    #[serde(default)]
    pub subcontractor: Vec<SimpleItem>,
    #[serde(default)]
    pub disposal: Vec<SimpleItem>,
    #[serde(default)]
    pub miscellaneous: Vec<SimpleItem>,

    /// Generated proposals keyed by template id.
    #[serde(default)]
    pub proposals: BTreeMap<String, StoredProposal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Estimate {
    pub fn new(estimate_number: i64) -> Self {
        Self {
            estimate_number,
            version_number: 1,
            ..Default::default()
        }
    }

    /// Items of one category, wrapped in the [`LineItem`] union.
    pub fn category_items(
        &self,
        category: LineItemCategory,
    ) -> Vec<LineItem> {
        match category {
            LineItemCategory::Labor => self.labor.iter().cloned().map(LineItem::Labor).collect(),
            LineItemCategory::Equipment => {
                self.equipment.iter().cloned().map(LineItem::Equipment).collect()
            }
            LineItemCategory::Material => {
                self.material.iter().cloned().map(LineItem::Material).collect()
            }
            LineItemCategory::Tools => self.tools.iter().cloned().map(LineItem::Tools).collect(),
            LineItemCategory::Overhead => {
                self.overhead.iter().cloned().map(LineItem::Overhead).collect()
            }
            LineItemCategory::Subcontractor => self
                .subcontractor
                .iter()
                .cloned()
                .map(LineItem::Subcontractor)
                .collect(),
            LineItemCategory::Disposal => {
                self.disposal.iter().cloned().map(LineItem::Disposal).collect()
            }
            LineItemCategory::Miscellaneous => self
                .miscellaneous
                .iter()
                .cloned()
                .map(LineItem::Miscellaneous)
                .collect(),
        }
    }

    /// Every item of every category, in section order.
    pub fn all_items(&self) -> Vec<LineItem> {
        LineItemCategory::ALL
            .into_iter()
            .flat_map(|c| self.category_items(c))
            .collect()
    }

    pub fn item_count(&self) -> usize {
        LineItemCategory::ALL
            .into_iter()
            .map(|c| self.category_len(c))
            .sum()
    }

    fn category_len(
        &self,
        category: LineItemCategory,
    ) -> usize {
        match category {
            LineItemCategory::Labor => self.labor.len(),
            LineItemCategory::Equipment => self.equipment.len(),
            LineItemCategory::Material => self.material.len(),
            LineItemCategory::Tools => self.tools.len(),
            LineItemCategory::Overhead => self.overhead.len(),
            LineItemCategory::Subcontractor => self.subcontractor.len(),
            LineItemCategory::Disposal => self.disposal.len(),
            LineItemCategory::Miscellaneous => self.miscellaneous.len(),
        }
    }

    pub fn find_item(
        &self,
        key: &str,
    ) -> Option<LineItem> {
        self.all_items().into_iter().find(|i| i.key() == Some(key))
    }

    fn position(
        &self,
        category: LineItemCategory,
        key: &str,
    ) -> Option<usize> {
        self.category_items(category)
            .iter()
            .position(|i| i.key() == Some(key))
    }

    fn take_at(
        &mut self,
        category: LineItemCategory,
        index: usize,
    ) -> LineItem {
        match category {
            LineItemCategory::Labor => LineItem::Labor(self.labor.remove(index)),
            LineItemCategory::Equipment => LineItem::Equipment(self.equipment.remove(index)),
            LineItemCategory::Material => LineItem::Material(self.material.remove(index)),
            LineItemCategory::Tools => LineItem::Tools(self.tools.remove(index)),
            LineItemCategory::Overhead => LineItem::Overhead(self.overhead.remove(index)),
            LineItemCategory::Subcontractor => {
                LineItem::Subcontractor(self.subcontractor.remove(index))
            }
            LineItemCategory::Disposal => LineItem::Disposal(self.disposal.remove(index)),
            LineItemCategory::Miscellaneous => {
                LineItem::Miscellaneous(self.miscellaneous.remove(index))
            }
        }
    }

    fn put_at(
        &mut self,
        index: Option<usize>,
        item: LineItem,
    ) {
        fn place<T>(
            items: &mut Vec<T>,
            index: Option<usize>,
            item: T,
        ) {
            match index {
                Some(i) if i <= items.len() => items.insert(i, item),
                _ => items.push(item),
            }
        }

        match item {
            LineItem::Labor(i) => place(&mut self.labor, index, i),
            LineItem::Equipment(i) => place(&mut self.equipment, index, i),
            LineItem::Material(i) => place(&mut self.material, index, i),
            LineItem::Tools(i) => place(&mut self.tools, index, i),
            LineItem::Overhead(i) => place(&mut self.overhead, index, i),
            LineItem::Subcontractor(i) => place(&mut self.subcontractor, index, i),
            LineItem::Disposal(i) => place(&mut self.disposal, index, i),
            LineItem::Miscellaneous(i) => place(&mut self.miscellaneous, index, i),
        }
    }

    /// Appends an item to its category, assigning a temporary id when it has
    /// none and computing its total. Returns the item's key.
    pub fn add_item(
        &mut self,
        mut item: LineItem,
        fringes: &[FringeConstant],
    ) -> String {
        item.meta_mut().ensure_key();
        recompute_item(&mut item, fringes);
        let key = item.key().unwrap_or_default().to_string();
        self.put_at(None, item);
        key
    }

    pub fn remove_item(
        &mut self,
        category: LineItemCategory,
        key: &str,
    ) -> Option<LineItem> {
        let index = self.position(category, key)?;
        Some(self.take_at(category, index))
    }

    /// Applies a field edit to one item and recomputes its total.
    ///
    /// Returns `false` when no item with `key` exists in `category`.
    pub fn update_item<F>(
        &mut self,
        category: LineItemCategory,
        key: &str,
        fringes: &[FringeConstant],
        edit: F,
    ) -> bool
    where
        F: FnOnce(&mut LineItem),
    {
        let Some(index) = self.position(category, key) else {
            return false;
        };
        let mut item = self.take_at(category, index);
        edit(&mut item);
        recompute_item(&mut item, fringes);
        let slot = (item.category() == category).then_some(index);
        self.put_at(slot, item);
        true
    }

    /// Refreshes every stored total (and derived overhead hours) from raw fields.
    pub fn recompute_totals(
        &mut self,
        fringes: &[FringeConstant],
    ) {
        for category in LineItemCategory::ALL {
            for index in 0..self.category_len(category) {
                let mut item = self.take_at(category, index);
                recompute_item(&mut item, fringes);
                self.put_at(Some(index), item);
            }
        }
    }

    fn metas_mut(&mut self) -> impl Iterator<Item = &mut ItemMeta> {
        self.labor
            .iter_mut()
            .map(|i| &mut i.meta)
            .chain(self.equipment.iter_mut().map(|i| &mut i.meta))
            .chain(self.material.iter_mut().map(|i| &mut i.meta))
            .chain(self.tools.iter_mut().map(|i| &mut i.meta))
            .chain(self.overhead.iter_mut().map(|i| &mut i.meta))
            .chain(self.subcontractor.iter_mut().map(|i| &mut i.meta))
            .chain(self.disposal.iter_mut().map(|i| &mut i.meta))
            .chain(self.miscellaneous.iter_mut().map(|i| &mut i.meta))
    }

    /// Gives every unsaved item a temporary id. Returns how many were assigned.
    pub fn assign_temp_ids(&mut self) -> usize {
        self.metas_mut().map(|m| m.ensure_key()).filter(|assigned| *assigned).count()
    }

    /// Replaces temporary ids with permanent ones produced by `next_id`.
    pub fn promote_temp_ids<F>(
        &mut self,
        mut next_id: F,
    ) where
        F: FnMut() -> String,
    {
        for meta in self.metas_mut() {
            if meta.id.is_none() {
                meta.id = Some(next_id());
                meta.temp_id = None;
            }
        }
    }

    /// Slug used when the estimate has none: `est-<number>-v<version>`.
    pub fn default_slug(&self) -> String {
        format!("est-{}-v{}", self.estimate_number, self.version_number)
    }

    fn clear_identity(&mut self) {
        self.id = None;
        self.slug = None;
        self.created_at = None;
        self.updated_at = None;
        for meta in self.metas_mut() {
            meta.id = None;
            meta.temp_id = None;
        }
    }

    /// The next version in this estimate's chain: same number, version + 1,
    /// unsaved, proposals carried over.
    pub fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.clear_identity();
        next.version_number = self.version_number + 1;
        next.status = EstimateStatus::Draft;
        next
    }

    /// A copy started as version 1 of a new estimate number.
    pub fn copy_as(
        &self,
        estimate_number: i64,
    ) -> Self {
        let mut copy = self.clone();
        copy.clear_identity();
        copy.estimate_number = estimate_number;
        copy.version_number = 1;
        copy.status = EstimateStatus::Draft;
        copy.proposals.clear();
        copy
    }
}
