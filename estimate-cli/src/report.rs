//! Plain-text rendering of estimates for terminal output.

use std::fmt::Write;

use estimate_core::calculations::common::format_money;
use estimate_core::calculations::{LaborBreakdown, Section, build_sections, summarize};
use estimate_core::{Estimate, FringeConstant, LineItem};
use rust_decimal::Decimal;

const LABEL_WIDTH: usize = 24;
const AMOUNT_WIDTH: usize = 14;

fn amount_line(
    out: &mut String,
    label: &str,
    amount: Decimal,
) {
    let _ = writeln!(out, "{label:<LABEL_WIDTH$}{:>AMOUNT_WIDTH$}", format_money(amount));
}

fn heading(estimate: &Estimate) -> String {
    let mut out = format!(
        "Estimate {} v{} ({})",
        estimate.estimate_number,
        estimate.version_number,
        estimate.status.as_str()
    );
    if let Some(customer) = estimate.customer.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(out, " - {customer}");
    }
    out
}

/// Section totals, subtotal, markup and grand total.
///
/// Empty sections are left out; the labor section lists its fringe groups.
pub fn estimate_summary(
    estimate: &Estimate,
    fringes: &[FringeConstant],
) -> String {
    let sections = build_sections(estimate, fringes);
    let summary = summarize(&sections, estimate.markup);

    let mut out = heading(estimate);
    out.push('\n');
    if let Some(project) = estimate.project_name.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "Project: {project}");
    }
    out.push('\n');

    for section in sections.iter().filter(|s| !s.is_empty()) {
        write_section(&mut out, section);
    }

    amount_line(&mut out, "Subtotal", summary.sub_total);
    amount_line(&mut out, &format!("Markup ({})", estimate.markup), summary.markup_amount);
    amount_line(&mut out, "Grand total", summary.grand_total);
    out
}

fn write_section(
    out: &mut String,
    section: &Section,
) {
    let label = format!("{} ({})", section.title, section.items.len());
    amount_line(out, &label, section.total());
    for group in &section.fringe_groups {
        amount_line(out, &format!("  {}", group.name), group.total);
    }
}

fn item_label(item: &LineItem) -> String {
    let meta = item.meta();
    let name = meta
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(meta.key())
        .unwrap_or("unnamed");
    format!("{} item {}", item.category().title(), name)
}

/// Tier-by-tier explanation of a labor item's total.
pub fn labor_breakdown(
    item: &LineItem,
    fringe: Option<&str>,
    breakdown: &LaborBreakdown,
) -> String {
    let mut out = item_label(item);
    if let Some(fringe) = fringe.filter(|f| !f.trim().is_empty()) {
        let _ = write!(out, " ({})", fringe.trim());
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "Base pay {}  wcomp {}%  payroll {}%  fringe {}/h",
        format_money(breakdown.base_pay),
        breakdown.wcomp_pct.normalize(),
        breakdown.payroll_pct.normalize(),
        format_money(breakdown.fringe_amount),
    );
    let _ = writeln!(out, "Crew days {}", breakdown.crew_days.normalize());
    let _ = writeln!(out, "{:<14}{:>8}{:>12}{:>14}", "Tier", "Hours", "Rate", "Subtotal");
    for tier in breakdown.tiers() {
        let _ = writeln!(
            out,
            "{:<14}{:>8}{:>12}{:>14}",
            tier.tier.label(),
            tier.hours.normalize().to_string(),
            format_money(tier.rate),
            format_money(tier.subtotal),
        );
    }
    let _ = writeln!(out, "{:<34}{:>14}", "Total", format_money(breakdown.total));
    out
}

/// One-line description of a non-labor item's total.
pub fn item_total(item: &LineItem) -> String {
    format!("{}: {}\n", item_label(item), format_money(item.total()))
}

pub fn fringe_table(fringes: &[FringeConstant]) -> String {
    let mut out = format!("{:<20}{:>10}{:>10}{:>12}\n", "Profile", "WComp %", "Payroll %", "Fringe/h");
    for fringe in fringes {
        let _ = writeln!(
            out,
            "{:<20}{:>10}{:>10}{:>12}",
            fringe.name,
            fringe.w_comp_percent.normalize().to_string(),
            fringe.payroll_tax_percent.normalize().to_string(),
            format_money(fringe.fringe_amount),
        );
    }
    out
}

/// One line per estimate: id, number/version, slug, status and customer.
pub fn estimate_list(estimates: &[Estimate]) -> String {
    let mut out = String::new();
    for estimate in estimates {
        let id = estimate.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        let slug = estimate.slug.clone().unwrap_or_else(|| estimate.default_slug());
        let _ = writeln!(
            out,
            "{id:>5}  {:>6} v{:<3} {:<20} {:<9} {}",
            estimate.estimate_number,
            estimate.version_number,
            slug,
            estimate.status.as_str(),
            estimate.customer.as_deref().unwrap_or(""),
        );
    }
    out
}
