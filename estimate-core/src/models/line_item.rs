use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::lenient;

/// The eight fixed line-item categories of an estimate, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemCategory {
    Labor,
    Equipment,
    Material,
    Tools,
    Overhead,
    Subcontractor,
    Disposal,
    Miscellaneous,
}

impl LineItemCategory {
    pub const ALL: [LineItemCategory; 8] = [
        Self::Labor,
        Self::Equipment,
        Self::Material,
        Self::Tools,
        Self::Overhead,
        Self::Subcontractor,
        Self::Disposal,
        Self::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Labor => "labor",
            Self::Equipment => "equipment",
            Self::Material => "material",
            Self::Tools => "tools",
            Self::Overhead => "overhead",
            Self::Subcontractor => "subcontractor",
            Self::Disposal => "disposal",
            Self::Miscellaneous => "miscellaneous",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Labor => "Labor",
            Self::Equipment => "Equipment",
            Self::Material => "Material",
            Self::Tools => "Tools",
            Self::Overhead => "Overhead",
            Self::Subcontractor => "Subcontractor",
            Self::Disposal => "Disposal",
            Self::Miscellaneous => "Miscellaneous",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for LineItemCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Fields shared by every line item regardless of category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Backend-assigned identifier; absent until the item is first saved.
    #[serde(rename = "_id", default, deserialize_with = "lenient::string")]
    pub id: Option<String>,

    /// Client-side identifier for items that have not been saved yet.
    #[serde(skip)]
    pub temp_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub description: Option<String>,
}

impl ItemMeta {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Identifier used to address the item: the saved id, else the temporary one.
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().or(self.temp_id.as_deref())
    }

    /// Gives unsaved items a temporary id. Returns `true` if one was assigned.
    pub fn ensure_key(&mut self) -> bool {
        if self.id.is_some() || self.temp_id.is_some() {
            return false;
        }
        self.temp_id = Some(format!("temp-{}", Uuid::new_v4()));
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborItem {
    #[serde(flatten)]
    pub meta: ItemMeta,

    /// Name of the fringe benefit profile applied to this crew.
    #[serde(default, deserialize_with = "lenient::string")]
    pub fringe: Option<String>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub base_pay: Option<Decimal>,

    /// Number of workers.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub days: Option<Decimal>,

    /// Overtime hours per worker per day. Absent means the default of 2;
    /// present but blank or non-numeric means 0.
    #[serde(
        default,
        deserialize_with = "lenient::decimal_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ot_pd: Option<Decimal>,

    /// Double-time hours per worker per day. Absent means none.
    #[serde(
        default,
        deserialize_with = "lenient::decimal_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub dt_pd: Option<Decimal>,

    /// Overrides the fringe profile's workers-comp percentage.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub w_comp_percent: Option<Decimal>,

    /// Overrides the fringe profile's payroll-tax percentage.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub payroll_taxes_percent: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub total: Decimal,
}

/// Rental period an equipment rate is quoted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Uom {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Uom {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }

    /// Unknown or blank units fall back to [`Uom::Daily`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" | "wk" => Self::Weekly,
            "monthly" | "month" | "mo" => Self::Monthly,
            _ => Self::Daily,
        }
    }
}

impl<'de> Deserialize<'de> for Uom {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::string(deserializer)?;
        Ok(raw.as_deref().map(Uom::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    #[serde(flatten)]
    pub meta: ItemMeta,

    #[serde(default)]
    pub uom: Uom,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub daily_cost: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub weekly_cost: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub monthly_cost: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: Option<Decimal>,

    /// Number of rental periods. Absent means one.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub times: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub fuel_additive_cost: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub delivery_pickup: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialItem {
    #[serde(flatten)]
    pub meta: ItemMeta,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub cost: Option<Decimal>,

    /// Flat tax amount, not a percentage.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub taxes: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub delivery_pickup: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverheadItem {
    #[serde(flatten)]
    pub meta: ItemMeta,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub days: Option<Decimal>,

    /// Derived from `days` whenever `days` is set.
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub hours: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub hourly_rate: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub daily_rate: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub total: Decimal,
}

/// Quantity-times-cost item used by Tools, Subcontractor, Disposal and Miscellaneous.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleItem {
    #[serde(flatten)]
    pub meta: ItemMeta,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal")]
    pub cost: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub total: Decimal,
}

/// A line item of any category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum LineItem {
    Labor(LaborItem),
    Equipment(EquipmentItem),
    Material(MaterialItem),
    Tools(SimpleItem),
    Overhead(OverheadItem),
    Subcontractor(SimpleItem),
    Disposal(SimpleItem),
    Miscellaneous(SimpleItem),
}

impl LineItem {
    /// An empty item of the given category, as the "add item" form starts out.
    pub fn blank(category: LineItemCategory) -> Self {
        match category {
            LineItemCategory::Labor => Self::Labor(LaborItem::default()),
            LineItemCategory::Equipment => Self::Equipment(EquipmentItem::default()),
            LineItemCategory::Material => Self::Material(MaterialItem::default()),
            LineItemCategory::Tools => Self::Tools(SimpleItem::default()),
            LineItemCategory::Overhead => Self::Overhead(OverheadItem::default()),
            LineItemCategory::Subcontractor => Self::Subcontractor(SimpleItem::default()),
            LineItemCategory::Disposal => Self::Disposal(SimpleItem::default()),
            LineItemCategory::Miscellaneous => Self::Miscellaneous(SimpleItem::default()),
        }
    }

    pub fn category(&self) -> LineItemCategory {
        match self {
            Self::Labor(_) => LineItemCategory::Labor,
            Self::Equipment(_) => LineItemCategory::Equipment,
            Self::Material(_) => LineItemCategory::Material,
            Self::Tools(_) => LineItemCategory::Tools,
            Self::Overhead(_) => LineItemCategory::Overhead,
            Self::Subcontractor(_) => LineItemCategory::Subcontractor,
            Self::Disposal(_) => LineItemCategory::Disposal,
            Self::Miscellaneous(_) => LineItemCategory::Miscellaneous,
        }
    }

    pub fn meta(&self) -> &ItemMeta {
        match self {
            Self::Labor(i) => &i.meta,
            Self::Equipment(i) => &i.meta,
            Self::Material(i) => &i.meta,
            Self::Overhead(i) => &i.meta,
            Self::Tools(i) | Self::Subcontractor(i) | Self::Disposal(i) | Self::Miscellaneous(i) => {
                &i.meta
            }
        }
    }

    pub fn meta_mut(&mut self) -> &mut ItemMeta {
        match self {
            Self::Labor(i) => &mut i.meta,
            Self::Equipment(i) => &mut i.meta,
            Self::Material(i) => &mut i.meta,
            Self::Overhead(i) => &mut i.meta,
            Self::Tools(i) | Self::Subcontractor(i) | Self::Disposal(i) | Self::Miscellaneous(i) => {
                &mut i.meta
            }
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.meta().key()
    }

    /// The stored total. Use [`crate::calculations::line_item_total`] for a trusted value.
    pub fn total(&self) -> Decimal {
        match self {
            Self::Labor(i) => i.total,
            Self::Equipment(i) => i.total,
            Self::Material(i) => i.total,
            Self::Overhead(i) => i.total,
            Self::Tools(i) | Self::Subcontractor(i) | Self::Disposal(i) | Self::Miscellaneous(i) => {
                i.total
            }
        }
    }

    pub(crate) fn set_total(
        &mut self,
        total: Decimal,
    ) {
        match self {
            Self::Labor(i) => i.total = total,
            Self::Equipment(i) => i.total = total,
            Self::Material(i) => i.total = total,
            Self::Overhead(i) => i.total = total,
            Self::Tools(i) | Self::Subcontractor(i) | Self::Disposal(i) | Self::Miscellaneous(i) => {
                i.total = total
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(LineItemCategory::parse(" Labor "), Some(LineItemCategory::Labor));
        assert_eq!(LineItemCategory::parse("MISCELLANEOUS"), Some(LineItemCategory::Miscellaneous));
        assert_eq!(LineItemCategory::parse("crane"), None);
    }

    #[test]
    fn uom_falls_back_to_daily() {
        assert_eq!(Uom::parse("Weekly"), Uom::Weekly);
        assert_eq!(Uom::parse("monthly"), Uom::Monthly);
        assert_eq!(Uom::parse("hourly"), Uom::Daily);
        assert_eq!(Uom::parse(""), Uom::Daily);
    }

    #[test]
    fn labor_item_reads_loose_json() {
        let json = r#"{
            "_id": "abc123",
            "name": "Foreman",
            "fringe": "Union",
            "basePay": "42.50",
            "quantity": 2,
            "days": "",
            "otPd": 0,
            "total": "not a number",
            "legacyField": {"nested": true}
        }"#;

        let item: LaborItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.meta.id.as_deref(), Some("abc123"));
        assert_eq!(item.base_pay, Some(dec!(42.50)));
        assert_eq!(item.quantity, Some(dec!(2)));
        assert_eq!(item.days, None);
        assert_eq!(item.ot_pd, Some(dec!(0)));
        assert_eq!(item.dt_pd, None);
        assert_eq!(item.total, Decimal::ZERO);
    }

    #[test]
    fn absent_ot_is_not_written_back() {
        let item: LaborItem = serde_json::from_str(r#"{"basePay": 30, "otPd": ""}"#).unwrap();
        let untouched: LaborItem = serde_json::from_str(r#"{"basePay": 30}"#).unwrap();

        let json = serde_json::to_value(&item).unwrap();
        let untouched_json = serde_json::to_value(&untouched).unwrap();

        let reread: LaborItem = serde_json::from_value(json).unwrap();
        assert_eq!(reread.ot_pd, Some(dec!(0)));
        assert!(untouched_json.get("otPd").is_none());
        assert!(untouched_json.get("dtPd").is_none());
    }

    #[test]
    fn equipment_item_reads_missing_uom_as_daily() {
        let item: EquipmentItem = serde_json::from_str(r#"{"dailyCost": 100}"#).unwrap();

        assert_eq!(item.uom, Uom::Daily);
        assert_eq!(item.daily_cost, Some(dec!(100)));
    }

    #[test]
    fn tagged_line_item_round_trips_category() {
        let json = r#"{"category": "disposal", "quantity": 3, "cost": "12"}"#;

        let item: LineItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.category(), LineItemCategory::Disposal);
        let LineItem::Disposal(simple) = &item else {
            panic!("expected disposal item, got {item:?}");
        };
        assert_eq!(simple.cost, Some(dec!(12)));
    }

    #[test]
    fn ensure_key_assigns_temp_id_once() {
        let mut meta = ItemMeta::named("Dumpster");

        assert!(meta.ensure_key());
        let first = meta.key().map(str::to_string);
        assert!(!meta.ensure_key());

        assert!(first.as_deref().is_some_and(|k| k.starts_with("temp-")));
        assert_eq!(meta.key().map(str::to_string), first);
    }

    #[test]
    fn saved_id_wins_over_temp_id() {
        let meta = ItemMeta {
            id: Some("saved".to_string()),
            temp_id: Some("temp-1".to_string()),
            ..Default::default()
        };

        assert_eq!(meta.key(), Some("saved"));
    }
}
