//! Labor cost breakdown.
//!
//! A labor line item is expanded into three pay tiers. Each tier's blended
//! hourly rate is built from the tier's pay plus the burden on that pay:
//!
//! | Component        | Formula                                     |
//! |------------------|---------------------------------------------|
//! | Tier pay         | `basePay × multiplier`                      |
//! | Workers comp     | `tier pay × wCompPercent / 100`             |
//! | Payroll taxes    | `tier pay × payrollTaxesPercent / 100`      |
//! | Fringe           | profile's fringe dollars per hour (flat)    |
//! | Blended rate     | sum of the four rows above                  |
//!
//! | Tier        | Multiplier | Hours                          |
//! |-------------|------------|--------------------------------|
//! | Regular     | 1          | `quantity × days × 8`          |
//! | Overtime    | 1.5        | `quantity × days × otPd`       |
//! | Double time | 2          | `quantity × days × dtPd`       |
//!
//! `otPd` defaults to 2 and `dtPd` to 0 only when the field is absent; an
//! explicit zero, a blank or a `null` means no overtime is scheduled.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use estimate_core::LaborItem;
//! use estimate_core::calculations::LaborCalculator;
//!
//! let item = LaborItem {
//!     base_pay: Some(dec!(30)),
//!     quantity: Some(dec!(2)),
//!     days: Some(dec!(5)),
//!     ot_pd: Some(dec!(2)),
//!     w_comp_percent: Some(dec!(10)),
//!     payroll_taxes_percent: Some(dec!(8)),
//!     fringe: Some("None".to_string()),
//!     ..Default::default()
//! };
//!
//! let breakdown = LaborCalculator::new(&[]).calculate(&item);
//!
//! assert_eq!(breakdown.regular.rate, dec!(35.40));
//! assert_eq!(breakdown.overtime.rate, dec!(53.10));
//! assert_eq!(breakdown.total, dec!(3894.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{money, mul, num, percent_of, round_half_up, sum};
use crate::calculations::fringe::lookup_fringe;
use crate::{FringeConstant, LaborItem};

/// Regular hours per worker per day.
pub const REGULAR_HOURS_PER_DAY: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

/// Overtime hours per worker per day when the item does not say.
pub const DEFAULT_OT_HOURS_PER_DAY: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Double-time hours per worker per day when the item does not say.
pub const DEFAULT_DT_HOURS_PER_DAY: Decimal = Decimal::ZERO;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaborTier {
    Regular,
    Overtime,
    DoubleTime,
}

impl LaborTier {
    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Regular => Decimal::ONE,
            Self::Overtime => Decimal::new(15, 1),
            Self::DoubleTime => Decimal::TWO,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Regular => "Regular",
            Self::Overtime => "Overtime",
            Self::DoubleTime => "Double time",
        }
    }
}

/// One pay tier of a labor breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub tier: LaborTier,
    pub multiplier: Decimal,
    /// `basePay × multiplier`.
    pub pay_rate: Decimal,
    pub wcomp_amount: Decimal,
    pub payroll_amount: Decimal,
    pub fringe_amount: Decimal,
    /// Blended hourly rate for this tier.
    pub rate: Decimal,
    pub hours: Decimal,
    /// `rate × hours`, rounded to cents.
    pub subtotal: Decimal,
}

/// Fully itemized labor cost, used both for the total and for explaining it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborBreakdown {
    pub base_pay: Decimal,
    pub wcomp_pct: Decimal,
    pub payroll_pct: Decimal,
    pub fringe_amount: Decimal,
    /// Workers × days.
    pub crew_days: Decimal,
    pub regular: TierBreakdown,
    pub overtime: TierBreakdown,
    pub double_time: TierBreakdown,
    /// Sum of the three tier subtotals.
    pub total: Decimal,
}

impl LaborBreakdown {
    pub fn tiers(&self) -> [&TierBreakdown; 3] {
        [&self.regular, &self.overtime, &self.double_time]
    }

    pub fn total_hours(&self) -> Decimal {
        sum(self.tiers().iter().map(|t| t.hours))
    }
}

/// Burden rates applied to one labor item after resolving overrides.
#[derive(Debug, Clone, Copy)]
struct BurdenRates {
    wcomp_pct: Decimal,
    payroll_pct: Decimal,
    fringe_amount: Decimal,
}

/// Calculator for labor line items against a set of fringe profiles.
#[derive(Debug, Clone)]
pub struct LaborCalculator<'a> {
    fringes: &'a [FringeConstant],
}

impl<'a> LaborCalculator<'a> {
    pub fn new(fringes: &'a [FringeConstant]) -> Self {
        Self { fringes }
    }

    /// Expands a labor item into its full breakdown.
    pub fn calculate(
        &self,
        item: &LaborItem,
    ) -> LaborBreakdown {
        let base_pay = num(item.base_pay);
        let rates = self.burden_rates(item);
        let crew_days = mul(num(item.quantity), num(item.days));

        let regular = self.tier(LaborTier::Regular, base_pay, &rates, mul(crew_days, REGULAR_HOURS_PER_DAY));
        let overtime = self.tier(
            LaborTier::Overtime,
            base_pay,
            &rates,
            mul(crew_days, self.ot_hours_per_day(item)),
        );
        let double_time = self.tier(
            LaborTier::DoubleTime,
            base_pay,
            &rates,
            mul(crew_days, self.dt_hours_per_day(item)),
        );

        let total = sum([regular.subtotal, overtime.subtotal, double_time.subtotal]);

        LaborBreakdown {
            base_pay,
            wcomp_pct: rates.wcomp_pct,
            payroll_pct: rates.payroll_pct,
            fringe_amount: rates.fringe_amount,
            crew_days,
            regular,
            overtime,
            double_time,
            total,
        }
    }

    /// Item-level percentages win over the fringe profile's; the fringe
    /// dollar amount always comes from the profile.
    fn burden_rates(
        &self,
        item: &LaborItem,
    ) -> BurdenRates {
        let profile = lookup_fringe(item.fringe.as_deref(), self.fringes);
        BurdenRates {
            wcomp_pct: item.w_comp_percent.unwrap_or(profile.wcomp_pct),
            payroll_pct: item.payroll_taxes_percent.unwrap_or(profile.payroll_pct),
            fringe_amount: profile.fringe_amount,
        }
    }

    fn ot_hours_per_day(
        &self,
        item: &LaborItem,
    ) -> Decimal {
        item.ot_pd.unwrap_or(DEFAULT_OT_HOURS_PER_DAY)
    }

    fn dt_hours_per_day(
        &self,
        item: &LaborItem,
    ) -> Decimal {
        item.dt_pd.unwrap_or(DEFAULT_DT_HOURS_PER_DAY)
    }

    fn tier(
        &self,
        tier: LaborTier,
        base_pay: Decimal,
        rates: &BurdenRates,
        hours: Decimal,
    ) -> TierBreakdown {
        let multiplier = tier.multiplier();
        let pay_rate = round_half_up(mul(base_pay, multiplier));
        let wcomp_amount = round_half_up(percent_of(pay_rate, rates.wcomp_pct));
        let payroll_amount = round_half_up(percent_of(pay_rate, rates.payroll_pct));
        let rate = sum([pay_rate, wcomp_amount, payroll_amount, rates.fringe_amount]);

        TierBreakdown {
            tier,
            multiplier,
            pay_rate,
            wcomp_amount,
            payroll_amount,
            fringe_amount: rates.fringe_amount,
            rate,
            hours,
            subtotal: money(mul(rate, hours)),
        }
    }
}
