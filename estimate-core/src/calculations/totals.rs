//! Per-category line item totals.
//!
//! Every function here is total over its input: missing or non-numeric
//! fields read as zero and results are clamped at zero.

use rust_decimal::Decimal;

use crate::calculations::common::{add, money, mul, num, sum};
use crate::calculations::labor::{LaborCalculator, REGULAR_HOURS_PER_DAY};
use crate::{
    EquipmentItem, FringeConstant, LaborItem, LineItem, MaterialItem, OverheadItem, SimpleItem, Uom,
};

pub fn labor_total(
    item: &LaborItem,
    fringes: &[FringeConstant],
) -> Decimal {
    LaborCalculator::new(fringes).calculate(item).total
}

/// Rate for the item's rental period.
pub fn equipment_rate(item: &EquipmentItem) -> Decimal {
    match item.uom {
        Uom::Daily => num(item.daily_cost),
        Uom::Weekly => num(item.weekly_cost),
        Uom::Monthly => num(item.monthly_cost),
    }
}

/// `quantity × rate × times + fuel + delivery`; `times` absent means one period.
pub fn equipment_total(item: &EquipmentItem) -> Decimal {
    let periods = item.times.unwrap_or(Decimal::ONE);
    let rental = mul(mul(num(item.quantity), equipment_rate(item)), periods);
    money(sum([rental, num(item.fuel_additive_cost), num(item.delivery_pickup)]))
}

/// `quantity × cost + taxes + delivery`. Taxes are a flat amount.
pub fn material_total(item: &MaterialItem) -> Decimal {
    money(sum([
        mul(num(item.quantity), num(item.cost)),
        num(item.taxes),
        num(item.delivery_pickup),
    ]))
}

/// Hours implied by the item's days, if days are set.
pub fn overhead_hours(item: &OverheadItem) -> Option<Decimal> {
    item.days.map(|days| mul(days, REGULAR_HOURS_PER_DAY))
}

/// Sets `hours = days × 8` whenever days are set, overriding stored hours.
pub fn apply_overhead_hours(item: &mut OverheadItem) {
    if let Some(hours) = overhead_hours(item) {
        item.hours = Some(hours);
    }
}

/// `hours × hourlyRate + days × dailyRate`, with hours derived from days when present.
pub fn overhead_total(item: &OverheadItem) -> Decimal {
    let hours = overhead_hours(item).or(item.hours);
    money(add(
        mul(num(hours), num(item.hourly_rate)),
        mul(num(item.days), num(item.daily_rate)),
    ))
}

/// `quantity × cost` for Tools, Subcontractor, Disposal and Miscellaneous.
pub fn simple_total(item: &SimpleItem) -> Decimal {
    money(mul(num(item.quantity), num(item.cost)))
}

/// Computes an item's total from its raw fields, ignoring any stored total.
pub fn line_item_total(
    item: &LineItem,
    fringes: &[FringeConstant],
) -> Decimal {
    match item {
        LineItem::Labor(i) => labor_total(i, fringes),
        LineItem::Equipment(i) => equipment_total(i),
        LineItem::Material(i) => material_total(i),
        LineItem::Overhead(i) => overhead_total(i),
        LineItem::Tools(i)
        | LineItem::Subcontractor(i)
        | LineItem::Disposal(i)
        | LineItem::Miscellaneous(i) => simple_total(i),
    }
}

/// Refreshes an item's derived fields and stored total in place.
pub fn recompute_item(
    item: &mut LineItem,
    fringes: &[FringeConstant],
) {
    if let LineItem::Overhead(overhead) = item {
        apply_overhead_hours(overhead);
    }
    let total = line_item_total(item, fringes);
    item.set_total(total);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // equipment tests
    // =========================================================================

    #[test]
    fn equipment_daily_rate_scaled_by_times() {
        let item = EquipmentItem {
            daily_cost: Some(dec!(100)),
            uom: Uom::Daily,
            quantity: Some(dec!(1)),
            times: Some(dec!(3)),
            ..Default::default()
        };

        assert_eq!(equipment_total(&item), dec!(300.00));
    }

    #[test]
    fn equipment_rate_follows_uom() {
        let item = EquipmentItem {
            uom: Uom::Weekly,
            daily_cost: Some(dec!(100)),
            weekly_cost: Some(dec!(450)),
            monthly_cost: Some(dec!(1500)),
            quantity: Some(dec!(2)),
            ..Default::default()
        };

        assert_eq!(equipment_rate(&item), dec!(450));
        assert_eq!(equipment_total(&item), dec!(900.00));
    }

    #[test]
    fn equipment_additives_are_added_once() {
        let item = EquipmentItem {
            monthly_cost: Some(dec!(2000)),
            uom: Uom::Monthly,
            quantity: Some(dec!(1)),
            times: Some(dec!(2)),
            fuel_additive_cost: Some(dec!(125.50)),
            delivery_pickup: Some(dec!(300)),
            ..Default::default()
        };

        assert_eq!(equipment_total(&item), dec!(4425.50));
    }

    #[test]
    fn equipment_missing_times_is_one_period() {
        let item = EquipmentItem {
            daily_cost: Some(dec!(80)),
            quantity: Some(dec!(2)),
            ..Default::default()
        };

        assert_eq!(equipment_total(&item), dec!(160.00));
    }

    // =========================================================================
    // material tests
    // =========================================================================

    #[test]
    fn material_adds_flat_taxes_and_delivery() {
        let item = MaterialItem {
            quantity: Some(dec!(12)),
            cost: Some(dec!(8.75)),
            taxes: Some(dec!(9.19)),
            delivery_pickup: Some(dec!(50)),
            ..Default::default()
        };

        assert_eq!(material_total(&item), dec!(164.19));
    }

    #[test]
    fn material_zero_quantity_or_cost_is_zero() {
        let zero_qty = MaterialItem {
            quantity: Some(dec!(0)),
            cost: Some(dec!(8.75)),
            ..Default::default()
        };
        let zero_cost = MaterialItem {
            quantity: Some(dec!(5)),
            cost: Some(dec!(0)),
            ..Default::default()
        };

        assert_eq!(material_total(&zero_qty), dec!(0));
        assert_eq!(material_total(&zero_cost), dec!(0));
    }

    // =========================================================================
    // overhead tests
    // =========================================================================

    #[test]
    fn overhead_hours_derive_from_days() {
        let mut item = OverheadItem {
            days: Some(dec!(3)),
            hours: Some(dec!(7)),
            ..Default::default()
        };

        apply_overhead_hours(&mut item);

        assert_eq!(item.hours, Some(dec!(24)));
    }

    #[test]
    fn overhead_keeps_hours_when_days_unset() {
        let mut item = OverheadItem {
            hours: Some(dec!(7)),
            hourly_rate: Some(dec!(10)),
            ..Default::default()
        };

        apply_overhead_hours(&mut item);

        assert_eq!(item.hours, Some(dec!(7)));
        assert_eq!(overhead_total(&item), dec!(70.00));
    }

    #[test]
    fn overhead_total_ignores_stale_hours() {
        let item = OverheadItem {
            days: Some(dec!(2)),
            hours: Some(dec!(100)),
            hourly_rate: Some(dec!(25)),
            daily_rate: Some(dec!(60)),
            ..Default::default()
        };

        // 16 h × 25 + 2 d × 60
        assert_eq!(overhead_total(&item), dec!(520.00));
    }

    // =========================================================================
    // simple item tests
    // =========================================================================

    #[test]
    fn simple_total_is_quantity_times_cost() {
        let item = SimpleItem {
            quantity: Some(dec!(4)),
            cost: Some(dec!(12.125)),
            ..Default::default()
        };

        assert_eq!(simple_total(&item), dec!(48.50));
    }

    #[test]
    fn simple_total_treats_missing_fields_as_zero() {
        assert_eq!(simple_total(&SimpleItem::default()), dec!(0));
    }

    #[test]
    fn totals_never_negative() {
        let item = SimpleItem {
            quantity: Some(dec!(-4)),
            cost: Some(dec!(10)),
            ..Default::default()
        };

        assert_eq!(simple_total(&item), dec!(0));
    }

    // =========================================================================
    // dispatch tests
    // =========================================================================

    #[test]
    fn recompute_item_replaces_stored_total() {
        let mut item = LineItem::Disposal(SimpleItem {
            quantity: Some(dec!(2)),
            cost: Some(dec!(350)),
            total: dec!(1),
            ..Default::default()
        });

        recompute_item(&mut item, &[]);

        assert_eq!(item.total(), dec!(700.00));
    }

    #[test]
    fn recompute_item_derives_overhead_hours() {
        let mut item = LineItem::Overhead(OverheadItem {
            days: Some(dec!(1.5)),
            hourly_rate: Some(dec!(20)),
            ..Default::default()
        });

        recompute_item(&mut item, &[]);

        let LineItem::Overhead(overhead) = &item else {
            panic!("category changed");
        };
        assert_eq!(overhead.hours, Some(dec!(12)));
        assert_eq!(item.total(), dec!(240.00));
    }

    #[test]
    fn labor_total_matches_breakdown() {
        let item = LaborItem {
            base_pay: Some(dec!(30)),
            quantity: Some(dec!(2)),
            days: Some(dec!(5)),
            ot_pd: Some(dec!(2)),
            w_comp_percent: Some(dec!(10)),
            payroll_taxes_percent: Some(dec!(8)),
            fringe: Some("None".to_string()),
            ..Default::default()
        };

        assert_eq!(labor_total(&item, &[]), dec!(3894.00));
    }

    // =========================================================================
    // oversized input
    // =========================================================================

    fn huge() -> Option<Decimal> {
        Some(crate::calculations::common::parse_num("100000000000000000000"))
    }

    #[test]
    fn oversized_simple_item_saturates() {
        let item = LineItem::Tools(SimpleItem {
            quantity: huge(),
            cost: huge(),
            ..Default::default()
        });

        assert_eq!(line_item_total(&item, &[]), Decimal::MAX);
    }

    #[test]
    fn oversized_labor_item_saturates() {
        let item = LaborItem {
            base_pay: Some(dec!(10000000000000000)),
            quantity: Some(dec!(100000000000000)),
            days: Some(dec!(1000)),
            ..Default::default()
        };

        assert_eq!(labor_total(&item, &[]), Decimal::MAX);
    }

    #[test]
    fn oversized_equipment_and_material_do_not_overflow() {
        let equipment = EquipmentItem {
            daily_cost: huge(),
            quantity: huge(),
            fuel_additive_cost: huge(),
            ..Default::default()
        };
        let material = MaterialItem {
            quantity: huge(),
            cost: huge(),
            taxes: huge(),
            ..Default::default()
        };
        let overhead = OverheadItem {
            days: huge(),
            hourly_rate: huge(),
            daily_rate: huge(),
            ..Default::default()
        };

        assert_eq!(equipment_total(&equipment), Decimal::MAX);
        assert_eq!(material_total(&material), Decimal::MAX);
        assert_eq!(overhead_total(&overhead), Decimal::MAX);
    }
}
