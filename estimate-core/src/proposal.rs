//! Proposal documents generated from templates.
//!
//! Templates carry `{{ name }}` placeholders which are filled from an
//! estimate's header fields and computed totals. A generated proposal is
//! stored on the estimate per template; once someone edits it by hand it is
//! only regenerated on request.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate, Utc};
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::calculations::common::format_money;
use crate::calculations::summarize_estimate;
use crate::models::{Estimate, FringeConstant, LineItemCategory, StoredProposal, Template};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Placeholder name to substituted text.
pub type ProposalVariables = BTreeMap<String, String>;

/// Variables for an estimate, dated today.
pub fn proposal_variables(
    estimate: &Estimate,
    fringes: &[FringeConstant],
) -> ProposalVariables {
    proposal_variables_on(estimate, fringes, Local::now().date_naive())
}

pub fn proposal_variables_on(
    estimate: &Estimate,
    fringes: &[FringeConstant],
    date: NaiveDate,
) -> ProposalVariables {
    let summary = summarize_estimate(estimate, fringes);
    let text = |value: &Option<String>| escape_html(value.as_deref().unwrap_or_default());

    let mut vars = ProposalVariables::new();
    vars.insert("grandTotal".into(), format_money(summary.grand_total));
    vars.insert("subTotal".into(), format_money(summary.sub_total));
    vars.insert("markupPct".into(), estimate.markup.to_string());
    vars.insert("markupAmount".into(), format_money(summary.markup_amount));
    for category in LineItemCategory::ALL {
        vars.insert(
            format!("{}Total", category.as_str()),
            format_money(summary.section_total(category)),
        );
    }

    vars.insert("customer".into(), text(&estimate.customer));
    vars.insert("contact".into(), text(&estimate.contact));
    vars.insert("jobAddress".into(), text(&estimate.job_address));
    vars.insert("projectName".into(), text(&estimate.project_name));
    vars.insert("proposalWriter".into(), text(&estimate.proposal_writer));
    vars.insert("estimateNumber".into(), estimate.estimate_number.to_string());
    vars.insert("versionNumber".into(), estimate.version_number.to_string());
    vars.insert("services".into(), escape_html(&estimate.services.join(", ")));
    vars.insert("date".into(), date.format("%B %-d, %Y").to_string());
    vars
}

/// Header fields are free text typed by users; templates are HTML.
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Substitutes every known placeholder in `body`.
///
/// Unknown placeholders are left in place so they stay visible in the output.
pub fn render(
    body: &str,
    vars: &ProposalVariables,
) -> String {
    PLACEHOLDER
        .replace_all(body, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => {
                warn!(placeholder = &caps[1], "unknown template placeholder");
                caps[0].to_string()
            }
        })
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateOutcome {
    Generated,
    /// A hand-edited proposal exists and `force` was not set.
    KeptCustom,
}

/// Regenerates the proposal for `template` and stores it on the estimate.
pub fn regenerate(
    estimate: &mut Estimate,
    template: &Template,
    fringes: &[FringeConstant],
    force: bool,
) -> RegenerateOutcome {
    if !force
        && estimate
            .proposals
            .get(&template.id)
            .is_some_and(|p| p.custom_edited)
    {
        debug!(template = %template.id, "keeping hand-edited proposal");
        return RegenerateOutcome::KeptCustom;
    }

    let html = render(&template.body, &proposal_variables(estimate, fringes));
    estimate.proposals.insert(
        template.id.clone(),
        StoredProposal {
            template_id: template.id.clone(),
            html,
            custom_edited: false,
            generated_at: Utc::now(),
        },
    );
    RegenerateOutcome::Generated
}

/// Records a hand edit of a proposal so regeneration leaves it alone.
pub fn mark_custom(
    estimate: &mut Estimate,
    template_id: &str,
    html: String,
) {
    estimate.proposals.insert(
        template_id.to_string(),
        StoredProposal {
            template_id: template_id.to_string(),
            html,
            custom_edited: true,
            generated_at: Utc::now(),
        },
    );
}
