//! Command handlers.

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use tracing::info;

use flagship_common::MemberId;
use flagship_governance::{FlagshipFilter, FlagshipView, ProjectDraft};

use crate::app::App;
use crate::output::{emit, finalization_line, flagship_detail, flagship_line, plan_line, tally_line};
use crate::{
    FlagshipCommands, FundCommands, MemberCommands, PlanCommands, SponsorCommands, VoteCommands, WalletCommands,
};

fn lines<T>(items: &[T], line: fn(&T) -> String, empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.iter().map(line).collect::<Vec<_>>().join("\n")
    }
}

pub async fn plan(app: &App, command: PlanCommands) -> Result<()> {
    let manager = &app.manager;
    match command {
        PlanCommands::Create {
            title,
            description,
            vision,
            goal,
        } => {
            let plan = manager.create_plan(&title, &description, &vision, goal).await?;
            emit(app.json, &plan, |p| format!("Created plan {}", plan_line(p)))
        }
        PlanCommands::Complete { plan_id } => {
            let next = manager.complete_plan(&plan_id).await?;
            emit(app.json, &next, |next| match next {
                Some(plan) => format!("Completed {}; current plan is now {}", plan_id, plan_line(plan)),
                None => format!("Completed {}; no active plan remains", plan_id),
            })
        }
        PlanCommands::Archive { plan_id } => {
            let plan = manager.archive_plan(&plan_id).await?;
            emit(app.json, &plan, |p| format!("Archived {}", plan_line(p)))
        }
        PlanCommands::List => {
            let plans = manager.list_plans().await;
            emit(app.json, &plans, |plans| lines(plans, plan_line, "No plans"))
        }
        PlanCommands::Progress => {
            let progress = manager.reserve_progress().await;
            emit(app.json, &progress, |progress| match progress {
                Some(p) => format!(
                    "Plan {}: reserve {} of {} ({:.1}%)",
                    p.plan_id,
                    p.balance,
                    p.goal,
                    p.ratio * Decimal::ONE_HUNDRED
                ),
                None => "No active plan".to_string(),
            })
        }
    }
}

pub async fn fund(app: &App, command: FundCommands) -> Result<()> {
    let ledger = app.manager.ledger();
    match command {
        FundCommands::Contribute { member, amount, note } => {
            let contribution = ledger
                .contribute_from_member(&MemberId::new(member), amount, note)
                .await?;
            emit(app.json, &contribution, |c| {
                format!("Contributed {} to the pool ({})", c.amount, c.id)
            })
        }
        FundCommands::Operator { fund, amount, note } => {
            let contribution = ledger.contribute_from_operator(fund, amount, note).await?;
            emit(app.json, &contribution, |c| {
                format!("Added {} to the {} fund ({})", c.amount, c.fund_type, c.id)
            })
        }
        FundCommands::Balance => {
            let summaries = ledger.summaries().await;
            emit(app.json, &summaries, |summaries| {
                summaries
                    .iter()
                    .map(|s| {
                        format!(
                            "{:<8} balance {:>12}  contributed {:>12}  disbursed {:>12}  ({} contributions)",
                            s.fund_type, s.balance, s.total_contributed, s.total_disbursed, s.contribution_count
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        FundCommands::Audit { fund } => {
            let audit = ledger.reconcile(fund).await;
            emit(app.json, &audit, |a| {
                format!(
                    "{}: balance {} = contributed {} - disbursed {}: {}",
                    a.fund_type,
                    a.balance,
                    a.contributed,
                    a.disbursed,
                    if a.consistent { "consistent" } else { "MISMATCH" }
                )
            })
        }
    }
}

pub async fn wallet(app: &App, command: WalletCommands) -> Result<()> {
    let ledger = app.manager.ledger();
    match command {
        WalletCommands::Credit { member, amount } => {
            let member = MemberId::new(member);
            let balance = ledger.credit_wallet(&member, amount).await?;
            emit(app.json, &balance, |b| format!("{} now holds {}", member, b))
        }
        WalletCommands::Balance { member } => {
            let member = MemberId::new(member);
            let balance = ledger.wallet_balance(&member).await;
            emit(app.json, &balance, |b| format!("{} holds {}", member, b))
        }
    }
}

pub async fn flagship(app: &App, command: FlagshipCommands) -> Result<()> {
    let manager = &app.manager;
    match command {
        FlagshipCommands::Create {
            title,
            description,
            category,
            goal,
            creator,
            source,
            plan,
        } => {
            let draft = ProjectDraft {
                title,
                description,
                category,
                funding_goal: goal,
                creator: MemberId::new(creator),
            };
            let view = manager.create_flagship(draft, source, plan.as_deref()).await?;
            emit(app.json, &view, |v| format!("Created flagship\n{}", flagship_detail(v)))
        }
        FlagshipCommands::Fund { flagship_id, amount } => {
            let receipt = manager.fund_from_reserve(&flagship_id, amount).await?;
            emit(app.json, &receipt, |r| {
                format!(
                    "Disbursed {} of {} requested\n{}",
                    r.disbursement.amount,
                    r.disbursement.requested,
                    flagship_line(&r.flagship)
                )
            })
        }
        FlagshipCommands::Show { flagship_id } => {
            let view = manager.get_flagship(&flagship_id).await?;
            emit(app.json, &view, flagship_detail)
        }
        FlagshipCommands::List { status, source, plan } => {
            let views: Vec<FlagshipView> = match plan {
                Some(plan_id) => manager
                    .flagships_for_plan(&plan_id)
                    .await?
                    .into_iter()
                    .filter(|v| status.map_or(true, |s| v.flagship.status == s))
                    .filter(|v| source.map_or(true, |s| v.flagship.funding_source == s))
                    .collect(),
                None => {
                    manager
                        .list_flagships(&FlagshipFilter {
                            status,
                            funding_source: source,
                        })
                        .await
                }
            };
            emit(app.json, &views, |views| lines(views, flagship_line, "No flagships"))
        }
        FlagshipCommands::Remove { flagship_id } => {
            let view = manager.remove_flagship(&flagship_id).await?;
            emit(app.json, &view, |v| format!("Removed {}", flagship_line(v)))
        }
    }
}

pub async fn vote(app: &App, command: VoteCommands) -> Result<()> {
    let manager = &app.manager;
    match command {
        VoteCommands::Cast {
            flagship_id,
            member,
            choice,
        } => {
            let vote = manager.cast_vote(&flagship_id, &MemberId::new(member), choice).await?;
            emit(app.json, &vote, |v| {
                format!("{} votes {} on {}", v.voter, v.choice, v.flagship_id)
            })
        }
        VoteCommands::Tally { flagship_id } => {
            let tally = manager.tally(&flagship_id).await?;
            emit(app.json, &tally, tally_line)
        }
        VoteCommands::Finalize { flagship_id } => {
            let report = manager.finalize_vote(&flagship_id).await?;
            emit(app.json, &report, finalization_line)
        }
        VoteCommands::FinalizeDue => {
            let reports = manager.finalize_due().await;
            info!("Finalized {} flagships", reports.len());
            emit(app.json, &reports, |reports| {
                lines(reports, finalization_line, "No votes are due")
            })
        }
    }
}

pub async fn sponsor(app: &App, command: SponsorCommands) -> Result<()> {
    let manager = &app.manager;
    match command {
        SponsorCommands::Add { flagship_id, member } => {
            let outcome = manager.sponsor(&flagship_id, &MemberId::new(member)).await?;
            emit(app.json, &outcome, |o| {
                let mut text = format!("{} of {} sponsors", o.current, o.needed);
                if o.reactivated {
                    text.push_str("; flagship is open for voting again");
                }
                text
            })
        }
        SponsorCommands::Status { flagship_id } => {
            let status = manager.sponsorship_status(&flagship_id).await?;
            emit(app.json, &status, |s| format!("{} of {} sponsors", s.current, s.needed))
        }
    }
}

pub async fn member(app: &App, command: MemberCommands) -> Result<()> {
    match command {
        MemberCommands::Grant { member } => {
            let member = MemberId::new(member);
            if !app.membership.grant(member.clone()).await {
                return Err(anyhow!("{} is already an eligible voter", member));
            }
            app.save_members().await?;
            emit(app.json, &member, |m| format!("{} can now vote", m))
        }
        MemberCommands::Revoke { member } => {
            let member = MemberId::new(member);
            if !app.membership.revoke(&member).await {
                return Err(anyhow!("{} is not an eligible voter", member));
            }
            app.save_members().await?;
            emit(app.json, &member, |m| format!("{} can no longer vote", m))
        }
        MemberCommands::List => {
            let members = app.membership.members().await;
            emit(app.json, &members, |members| {
                if members.is_empty() {
                    "No eligible voters".to_string()
                } else {
                    members.iter().map(|m| m.to_string()).collect::<Vec<_>>().join("\n")
                }
            })
        }
    }
}
