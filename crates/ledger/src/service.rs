//! Async front end over a transactional `LedgerBook`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use flagship_common::{Amount, Clock, MemberId};
use flagship_storage::TxStore;

use crate::book::LedgerBook;
use crate::types::{Contribution, Disbursement, FundAudit, FundSummary, FundType};
use crate::{LedgerError, LedgerResult};

/// Any transactional state that embeds the ledger.
///
/// Implemented by larger state types so that ledger mutations can share a
/// transaction with other tables (flagships, projects).
pub trait HasLedger: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn ledger(&self) -> &LedgerBook;
    fn ledger_mut(&mut self) -> &mut LedgerBook;
}

impl HasLedger for LedgerBook {
    fn ledger(&self) -> &LedgerBook {
        self
    }

    fn ledger_mut(&mut self) -> &mut LedgerBook {
        self
    }
}

/// The fund ledger service: the only public path that changes balances
/// outside of flagship funding.
pub struct FundLedger<S: HasLedger> {
    store: Arc<TxStore<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: HasLedger> Clone for FundLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: HasLedger> FundLedger<S> {
    pub fn new(store: Arc<TxStore<S>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Top up a member's personal wallet
    pub async fn credit_wallet(&self, member: &MemberId, amount: Amount) -> LedgerResult<Amount> {
        let now = self.clock.now();
        let balance = self
            .store
            .transaction(|state| state.ledger_mut().credit_wallet(member, amount, now))
            .await?;
        info!(member = %member, amount = %amount, balance = %balance, "Credited wallet");
        Ok(balance)
    }

    /// Debit the member's wallet and credit Pool in one step
    pub async fn contribute_from_member(
        &self,
        member: &MemberId,
        amount: Amount,
        note: Option<String>,
    ) -> LedgerResult<Contribution> {
        let now = self.clock.now();
        let result = self
            .store
            .transaction(|state| state.ledger_mut().contribute_from_member(member, amount, note, now))
            .await;

        match &result {
            Ok(c) => info!(contribution_id = %c.id, member = %member, amount = %amount, "Member contributed to pool"),
            Err(LedgerError::InsufficientBalance(msg)) => warn!(member = %member, "Contribution refused: {}", msg),
            Err(_) => {}
        }
        result
    }

    /// Capitalize a fund directly
    pub async fn contribute_from_operator(
        &self,
        fund_type: FundType,
        amount: Amount,
        note: Option<String>,
    ) -> LedgerResult<Contribution> {
        let now = self.clock.now();
        let contribution = self
            .store
            .transaction(|state| state.ledger_mut().contribute_from_operator(fund_type, amount, note, now))
            .await?;
        info!(contribution_id = %contribution.id, fund = %fund_type, amount = %amount, "Operator capitalized fund");
        Ok(contribution)
    }

    pub async fn fund_balance(&self, fund_type: FundType) -> Amount {
        self.store.read(|state| state.ledger().fund_balance(fund_type)).await
    }

    pub async fn wallet_balance(&self, member: &MemberId) -> Amount {
        self.store.read(|state| state.ledger().wallet_balance(member)).await
    }

    pub async fn contributions(&self, fund_type: FundType) -> Vec<Contribution> {
        self.store.read(|state| state.ledger().contributions(fund_type)).await
    }

    pub async fn disbursements(&self, fund_type: FundType) -> Vec<Disbursement> {
        self.store.read(|state| state.ledger().disbursements(fund_type)).await
    }

    pub async fn reconcile(&self, fund_type: FundType) -> FundAudit {
        self.store.read(|state| state.ledger().reconcile(fund_type)).await
    }

    /// Summaries for both funds, Reserve first
    pub async fn summaries(&self) -> Vec<FundSummary> {
        self.store
            .read(|state| {
                [FundType::Reserve, FundType::Pool]
                    .into_iter()
                    .map(|fund_type| state.ledger().summary(fund_type))
                    .collect()
            })
            .await
    }
}
