//! The ledger's tables and the balance rules applied to them.
//!
//! Every method here mutates in place and is meant to be called inside a
//! `TxStore` transaction: a returned error aborts the whole transaction, so
//! methods may check and then write without re-validating on rollback.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use flagship_common::utils::generate_prefixed_uuid;
use flagship_common::{Amount, MemberId, Timestamp};

use crate::types::{Contribution, Disbursement, Fund, FundAudit, FundSummary, FundType, Wallet};
use crate::{LedgerError, LedgerResult};

/// All ledger state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerBook {
    funds: BTreeMap<FundType, Fund>,
    contributions: Vec<Contribution>,
    disbursements: Vec<Disbursement>,
    wallets: BTreeMap<MemberId, Wallet>,
}

fn require_positive(amount: Amount, what: &str) -> LedgerResult<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(format!(
            "{} must be positive, got {}",
            what, amount
        )));
    }
    Ok(())
}

fn checked_credit(balance: Amount, amount: Amount, account: &str) -> LedgerResult<Amount> {
    balance.checked_add(amount).ok_or_else(|| {
        LedgerError::InvalidAmount(format!(
            "crediting {} to {} would overflow its balance of {}",
            amount, account, balance
        ))
    })
}

impl LedgerBook {
    /// Current balance of a fund; zero if it has never been capitalized
    pub fn fund_balance(&self, fund_type: FundType) -> Amount {
        self.funds
            .get(&fund_type)
            .map(|f| f.balance)
            .unwrap_or_else(Amount::zero)
    }

    pub fn fund(&self, fund_type: FundType) -> Option<&Fund> {
        self.funds.get(&fund_type)
    }

    /// Current balance of a member's wallet; zero if the member has none
    pub fn wallet_balance(&self, member: &MemberId) -> Amount {
        self.wallets
            .get(member)
            .map(|w| w.balance)
            .unwrap_or_else(Amount::zero)
    }

    /// Add money to a member's personal wallet
    pub fn credit_wallet(&mut self, member: &MemberId, amount: Amount, now: Timestamp) -> LedgerResult<Amount> {
        require_positive(amount, "Wallet credit")?;

        let balance = checked_credit(self.wallet_balance(member), amount, member.as_str())?;
        let wallet = self.wallets.entry(member.clone()).or_insert_with(|| Wallet {
            member: member.clone(),
            balance: Amount::zero(),
            updated_at: now,
        });
        wallet.balance = balance;
        wallet.updated_at = now;
        Ok(balance)
    }

    fn credit_fund(&mut self, fund_type: FundType, amount: Amount, now: Timestamp) -> LedgerResult<()> {
        let balance = checked_credit(self.fund_balance(fund_type), amount, fund_type.as_str())?;
        let fund = self
            .funds
            .entry(fund_type)
            .or_insert_with(|| Fund::new(fund_type, now));
        fund.balance = balance;
        fund.updated_at = now;
        Ok(())
    }

    /// Move `amount` from the member's wallet into Pool
    pub fn contribute_from_member(
        &mut self,
        member: &MemberId,
        amount: Amount,
        note: Option<String>,
        now: Timestamp,
    ) -> LedgerResult<Contribution> {
        require_positive(amount, "Contribution")?;

        let available = self.wallet_balance(member);
        if available < amount {
            return Err(LedgerError::InsufficientBalance(format!(
                "member {} holds {}, contribution needs {}",
                member, available, amount
            )));
        }

        self.credit_fund(FundType::Pool, amount, now)?;
        // `available >= amount > 0` so the wallet row exists.
        if let Some(wallet) = self.wallets.get_mut(member) {
            wallet.balance -= amount;
            wallet.updated_at = now;
        }

        let contribution = Contribution {
            id: generate_prefixed_uuid("contribution"),
            fund_type: FundType::Pool,
            contributor: Some(member.clone()),
            amount,
            is_operator: false,
            note,
            created_at: now,
        };
        self.contributions.push(contribution.clone());
        Ok(contribution)
    }

    /// Credit a fund directly on behalf of the platform operator
    pub fn contribute_from_operator(
        &mut self,
        fund_type: FundType,
        amount: Amount,
        note: Option<String>,
        now: Timestamp,
    ) -> LedgerResult<Contribution> {
        require_positive(amount, "Contribution")?;

        self.credit_fund(fund_type, amount, now)?;

        let contribution = Contribution {
            id: generate_prefixed_uuid("contribution"),
            fund_type,
            contributor: None,
            amount,
            is_operator: true,
            note,
            created_at: now,
        };
        self.contributions.push(contribution.clone());
        Ok(contribution)
    }

    /// Draw money from a fund toward a flagship.
    ///
    /// The fund must hold at least `requested`. What actually leaves the fund
    /// is `min(requested, remaining_need)`; the caller credits the same
    /// amount to the flagship's project in the same transaction.
    pub fn disburse(
        &mut self,
        fund_type: FundType,
        flagship_id: &str,
        requested: Amount,
        remaining_need: Amount,
        now: Timestamp,
    ) -> LedgerResult<Disbursement> {
        require_positive(requested, "Disbursement")?;
        if !remaining_need.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "flagship {} has no remaining funding need",
                flagship_id
            )));
        }

        let fund = self
            .funds
            .get_mut(&fund_type)
            .ok_or_else(|| LedgerError::FundNotFound(fund_type.to_string()))?;

        if fund.balance < requested {
            return Err(LedgerError::InsufficientFunds(format!(
                "{} holds {}, disbursement requests {}",
                fund_type, fund.balance, requested
            )));
        }

        let applied = requested.min(remaining_need);
        fund.balance -= applied;
        fund.updated_at = now;

        let disbursement = Disbursement {
            id: generate_prefixed_uuid("disbursement"),
            fund_type,
            flagship_id: flagship_id.to_string(),
            requested,
            amount: applied,
            created_at: now,
        };
        self.disbursements.push(disbursement.clone());
        Ok(disbursement)
    }

    pub fn contributions(&self, fund_type: FundType) -> Vec<Contribution> {
        self.contributions
            .iter()
            .filter(|c| c.fund_type == fund_type)
            .cloned()
            .collect()
    }

    pub fn disbursements(&self, fund_type: FundType) -> Vec<Disbursement> {
        self.disbursements
            .iter()
            .filter(|d| d.fund_type == fund_type)
            .cloned()
            .collect()
    }

    /// Disbursements made toward one flagship, from either fund
    pub fn disbursements_for(&self, flagship_id: &str) -> Vec<Disbursement> {
        self.disbursements
            .iter()
            .filter(|d| d.flagship_id == flagship_id)
            .cloned()
            .collect()
    }

    /// Recompute a fund's balance from its records
    pub fn reconcile(&self, fund_type: FundType) -> FundAudit {
        let contributed: Amount = self
            .contributions
            .iter()
            .filter(|c| c.fund_type == fund_type)
            .map(|c| c.amount)
            .sum();
        let disbursed: Amount = self
            .disbursements
            .iter()
            .filter(|d| d.fund_type == fund_type)
            .map(|d| d.amount)
            .sum();
        let balance = self.fund_balance(fund_type);

        FundAudit {
            fund_type,
            balance,
            contributed,
            disbursed,
            consistent: balance == contributed - disbursed && !balance.is_negative(),
        }
    }

    pub fn summary(&self, fund_type: FundType) -> FundSummary {
        let audit = self.reconcile(fund_type);
        FundSummary {
            fund_type,
            balance: audit.balance,
            contribution_count: self
                .contributions
                .iter()
                .filter(|c| c.fund_type == fund_type)
                .count(),
            total_contributed: audit.contributed,
            total_disbursed: audit.disbursed,
        }
    }
}
