//! Text or JSON rendering of command results.

use anyhow::Result;
use serde::Serialize;

use flagship_governance::{FinalizationOutcome, FinalizationReport, FlagshipView, StrategicPlan, VoteTally};

/// Print `value` as pretty JSON, or the text produced by `text`
pub fn emit<T, F>(json: bool, value: &T, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

pub fn plan_line(plan: &StrategicPlan) -> String {
    format!(
        "{}  {:<9}  goal {:>12}  {}",
        plan.id, plan.status, plan.funding_goal, plan.title
    )
}

pub fn flagship_line(view: &FlagshipView) -> String {
    format!(
        "{}  {:<7}  {:<8}  {:>10} / {:<10}  {}",
        view.flagship.id,
        view.flagship.funding_source,
        view.flagship.status,
        view.project.funding_raised,
        view.project.funding_goal,
        view.project.title
    )
}

pub fn flagship_detail(view: &FlagshipView) -> String {
    let mut lines = vec![
        format!("Flagship:  {}", view.flagship.id),
        format!("Title:     {}", view.project.title),
        format!("Category:  {}", view.project.category),
        format!("Creator:   {}", view.project.creator),
        format!("Source:    {}", view.flagship.funding_source),
        format!("Status:    {}", view.flagship.status),
        format!("Raised:    {} of {}", view.project.funding_raised, view.project.funding_goal),
    ];
    if let Some(plan_id) = &view.flagship.plan_id {
        lines.push(format!("Plan:      {}", plan_id));
    }
    if let Some(deadline) = view.flagship.voting_deadline {
        lines.push(format!("Deadline:  {} (round {})", deadline.to_rfc3339(), view.flagship.round));
    }
    if let Some(tabled_at) = view.flagship.tabled_at {
        lines.push(format!("Tabled at: {}", tabled_at.to_rfc3339()));
    }
    if !view.project.description.is_empty() {
        lines.push(String::new());
        lines.push(view.project.description.clone());
    }
    lines.join("\n")
}

pub fn tally_line(tally: &VoteTally) -> String {
    format!(
        "approve {}  reject {}  table {}  (total {}, approval {:.2}, table {:.2})",
        tally.approve, tally.reject, tally.table, tally.total, tally.approval_rate, tally.table_rate
    )
}

pub fn finalization_line(report: &FinalizationReport) -> String {
    let outcome = match &report.outcome {
        FinalizationOutcome::Funded { disbursed } => format!("funded from pool ({})", disbursed),
        FinalizationOutcome::ApprovedUnfunded { shortfall } => {
            format!("approved, pool short by {}", shortfall)
        }
        FinalizationOutcome::Tabled => "tabled".to_string(),
        FinalizationOutcome::Rejected => "rejected".to_string(),
    };
    format!("{}: {}\n  {}", report.flagship_id, outcome, tally_line(&report.tally))
}
