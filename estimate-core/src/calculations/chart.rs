//! Subtotal, markup and grand total across sections.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{add, mul, round_half_up, sub, sum};
use crate::calculations::sections::{Section, build_sections};
use crate::{Estimate, FringeConstant, LineItemCategory, MarkupPct};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSlice {
    pub id: LineItemCategory,
    pub label: String,
    pub value: Decimal,
    pub color: String,
}

/// Chart data and the money figures derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSummary {
    /// One slice per section with a non-zero total.
    pub slices: Vec<ChartSlice>,
    pub sub_total: Decimal,
    pub markup_pct: Decimal,
    pub markup_amount: Decimal,
    /// `sub_total × (1 + markup_pct / 100)`, rounded to cents.
    pub grand_total: Decimal,
}

impl ChartSummary {
    pub fn section_total(
        &self,
        category: LineItemCategory,
    ) -> Decimal {
        self.slices
            .iter()
            .find(|s| s.id == category)
            .map(|s| s.value)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Applies a markup percentage to a subtotal.
pub fn apply_markup(
    sub_total: Decimal,
    markup: MarkupPct,
) -> Decimal {
    let factor = add(Decimal::ONE, markup.value() / Decimal::ONE_HUNDRED);
    round_half_up(mul(sub_total, factor))
}

/// Sums section totals into chart slices, subtotal and grand total.
pub fn summarize(
    sections: &[Section],
    markup: MarkupPct,
) -> ChartSummary {
    let slices: Vec<ChartSlice> = sections
        .iter()
        .map(|section| ChartSlice {
            id: section.id,
            label: section.title.clone(),
            value: section.total(),
            color: section.color.clone(),
        })
        .filter(|slice| !slice.value.is_zero())
        .collect();

    let sub_total = sum(sections.iter().map(Section::total));
    let grand_total = apply_markup(sub_total, markup);

    ChartSummary {
        slices,
        sub_total,
        markup_pct: markup.value(),
        markup_amount: sub(grand_total, sub_total),
        grand_total,
    }
}

/// Builds sections from the raw estimate and summarizes them with its markup.
pub fn summarize_estimate(
    estimate: &Estimate,
    fringes: &[FringeConstant],
) -> ChartSummary {
    summarize(&build_sections(estimate, fringes), estimate.markup)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::line_item_total;
    use crate::{EquipmentItem, LaborItem, MaterialItem, SimpleItem};

    fn sample_estimate() -> Estimate {
        let mut e = Estimate::new(1);
        e.markup = MarkupPct::parse("15%");
        e.labor.push(LaborItem {
            base_pay: Some(dec!(30)),
            quantity: Some(dec!(2)),
            days: Some(dec!(5)),
            w_comp_percent: Some(dec!(10)),
            payroll_taxes_percent: Some(dec!(8)),
            ..Default::default()
        });
        e.equipment.push(EquipmentItem {
            daily_cost: Some(dec!(100)),
            quantity: Some(dec!(1)),
            times: Some(dec!(3)),
            ..Default::default()
        });
        e.material.push(MaterialItem {
            quantity: Some(dec!(10)),
            cost: Some(dec!(4.99)),
            ..Default::default()
        });
        e.disposal.push(SimpleItem {
            quantity: Some(dec!(1)),
            cost: Some(dec!(450)),
            ..Default::default()
        });
        e
    }

    #[test]
    fn grand_total_applies_markup() {
        let summary = summarize_estimate(&sample_estimate(), &[]);

        // 3894.00 + 300.00 + 49.90 + 450.00
        assert_eq!(summary.sub_total, dec!(4693.90));
        assert_eq!(summary.markup_pct, dec!(15));
        assert_eq!(summary.grand_total, dec!(5397.99));
        assert_eq!(summary.markup_amount, dec!(704.09));
    }

    #[test]
    fn percent_string_and_number_markup_agree() {
        let sections = build_sections(&sample_estimate(), &[]);

        let from_string = summarize(&sections, MarkupPct::parse("15%"));
        let from_number = summarize(&sections, MarkupPct::from(dec!(15)));

        assert_eq!(from_string, from_number);
    }

    #[test]
    fn unparseable_markup_means_no_markup() {
        let sections = build_sections(&sample_estimate(), &[]);

        let summary = summarize(&sections, MarkupPct::parse("fifteen"));

        assert_eq!(summary.grand_total, summary.sub_total);
    }

    #[test]
    fn slices_skip_empty_sections() {
        let summary = summarize_estimate(&sample_estimate(), &[]);

        let ids: Vec<_> = summary.slices.iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                LineItemCategory::Labor,
                LineItemCategory::Equipment,
                LineItemCategory::Material,
                LineItemCategory::Disposal,
            ]
        );
        assert_eq!(summary.section_total(LineItemCategory::Equipment), dec!(300.00));
        assert_eq!(summary.section_total(LineItemCategory::Tools), dec!(0));
    }

    #[test]
    fn empty_estimate_totals_zero() {
        let summary = summarize_estimate(&Estimate::new(1), &[]);

        assert!(summary.slices.is_empty());
        assert_eq!(summary.sub_total, dec!(0));
        assert_eq!(summary.grand_total, dec!(0));
    }

    #[test]
    fn section_totals_reproduce_grand_total_from_raw_items() {
        let estimate = sample_estimate();
        let sections = build_sections(&estimate, &[]);

        let raw_sub_total: Decimal = estimate
            .all_items()
            .iter()
            .map(|item| line_item_total(item, &[]))
            .sum();
        let from_sections = summarize(&sections, estimate.markup);

        assert_eq!(from_sections.sub_total, raw_sub_total);
        assert_eq!(from_sections.grand_total, apply_markup(raw_sub_total, estimate.markup));
    }

    #[test]
    fn grand_total_law_holds_for_several_markups() {
        for pct in [dec!(0), dec!(7.5), dec!(10), dec!(33.333), dec!(100)] {
            let summary = summarize(&build_sections(&sample_estimate(), &[]), MarkupPct::from(pct));

            let expected = round_half_up(summary.sub_total * (dec!(1) + pct / dec!(100)));
            assert_eq!(summary.grand_total, expected, "markup {pct}");
        }
    }

    #[test]
    fn oversized_items_saturate_the_grand_total() {
        let mut estimate = sample_estimate();
        let huge = crate::calculations::common::parse_num("100000000000000000000");
        estimate.tools.push(SimpleItem {
            quantity: Some(huge),
            cost: Some(huge),
            ..Default::default()
        });
        estimate.recompute_totals(&[]);

        let summary = summarize_estimate(&estimate, &[]);

        assert_eq!(summary.sub_total, Decimal::MAX);
        assert_eq!(summary.grand_total, Decimal::MAX);
        assert_eq!(summary.markup_amount, dec!(0));
    }
}
