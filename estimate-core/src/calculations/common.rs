//! Common utility functions for estimate calculations.
//!
//! This module provides shared functionality used across every category
//! calculation: rounding, and the numeric-coercion helpers that let the
//! engine read partially-populated records without ever failing.

use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the maximum of two decimal values.
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(-200.00)), dec!(-100.00));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

fn saturated(negative: bool) -> Decimal {
    if negative { Decimal::MIN } else { Decimal::MAX }
}

/// `a × b`, saturating at the edge of the representable range.
///
/// Lenient input can carry arbitrarily large numbers; the engine caps them
/// rather than overflowing.
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::mul;
///
/// assert_eq!(mul(dec!(1.5), dec!(4)), dec!(6.0));
/// assert_eq!(mul(Decimal::MAX, dec!(2)), Decimal::MAX);
/// assert_eq!(mul(Decimal::MAX, dec!(-2)), Decimal::MIN);
/// ```
pub fn mul(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    a.checked_mul(b)
        .unwrap_or_else(|| saturated(a.is_sign_negative() != b.is_sign_negative()))
}

/// `a + b`, saturating at the edge of the representable range.
pub fn add(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| saturated(a.is_sign_negative()))
}

/// `a - b`, saturating at the edge of the representable range.
pub fn sub(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    a.checked_sub(b).unwrap_or_else(|| saturated(a.is_sign_negative()))
}

/// Saturating sum.
pub fn sum<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().fold(Decimal::ZERO, add)
}

/// `amount × pct / 100`.
pub fn percent_of(
    amount: Decimal,
    pct: Decimal,
) -> Decimal {
    mul(amount, pct) / Decimal::ONE_HUNDRED
}

/// Rounds a money amount to cents and clamps it at zero.
///
/// Every category total goes through here so totals are never negative.
pub fn money(value: Decimal) -> Decimal {
    max(round_half_up(value), Decimal::ZERO)
}

/// Reads an optional field as a number, treating a missing value as zero.
pub fn num(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}

/// Strips the decoration users type into numeric fields.
fn normalize_numeric_input(s: &str) -> String {
    s.trim()
        .trim_end_matches('%')
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect()
}

/// Parses free-form text into an optional [`Decimal`].
///
/// Accepts thousands separators, a leading `$`, a trailing `%` and
/// scientific notation. Returns `None` for empty or unparseable input.
pub fn parse_optional_num(s: &str) -> Option<Decimal> {
    let normalized = normalize_numeric_input(s);
    if normalized.is_empty() {
        return None;
    }
    normalized
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Parses free-form text into a [`Decimal`], coercing anything unparseable to zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::parse_num;
///
/// assert_eq!(parse_num("1,234.50"), dec!(1234.50));
/// assert_eq!(parse_num("$40"), dec!(40));
/// assert_eq!(parse_num("n/a"), dec!(0));
/// ```
pub fn parse_num(s: &str) -> Decimal {
    parse_optional_num(s).unwrap_or(Decimal::ZERO)
}

/// Parses a percentage that may carry a trailing `%`.
///
/// `"15%"`, `"15"` and `" 15 % "` all yield `15`. Failures yield zero.
pub fn parse_percent(s: &str) -> Decimal {
    parse_num(s)
}

/// Formats an amount as US currency, e.g. `$12,345.67` or `-$3.50`.
pub fn format_money(value: Decimal) -> String {
    let rounded = round_half_up(value);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}
