//! Records kept by the fund ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use flagship_common::{Amount, MemberId, Timestamp};

use crate::LedgerError;

/// The two named pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundType {
    /// Capitalized directly by the platform operator
    Reserve,
    /// Capitalized by community members
    Pool,
}

impl FundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundType::Reserve => "reserve",
            FundType::Pool => "pool",
        }
    }
}

impl fmt::Display for FundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reserve" => Ok(FundType::Reserve),
            "pool" => Ok(FundType::Pool),
            other => Err(LedgerError::FundNotFound(other.to_string())),
        }
    }
}

/// One pool and its current balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub fund_type: FundType,
    /// Never negative
    pub balance: Amount,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Fund {
    pub fn new(fund_type: FundType, now: Timestamp) -> Self {
        Self {
            fund_type,
            balance: Amount::zero(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Money added to a fund. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: String,
    pub fund_type: FundType,
    /// `None` for operator capitalization
    pub contributor: Option<MemberId>,
    pub amount: Amount,
    pub is_operator: bool,
    pub note: Option<String>,
    pub created_at: Timestamp,
}

/// Money drawn from a fund toward a flagship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disbursement {
    pub id: String,
    pub fund_type: FundType,
    pub flagship_id: String,
    /// What the caller asked for
    pub requested: Amount,
    /// What actually left the fund, capped at the flagship's remaining need
    pub amount: Amount,
    pub created_at: Timestamp,
}

/// A member's personal balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub member: MemberId,
    pub balance: Amount,
    pub updated_at: Timestamp,
}

/// Result of recomputing a fund's balance from its records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundAudit {
    pub fund_type: FundType,
    pub balance: Amount,
    pub contributed: Amount,
    pub disbursed: Amount,
    /// `balance == contributed - disbursed` and `balance >= 0`
    pub consistent: bool,
}

/// Dashboard view of a fund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSummary {
    pub fund_type: FundType,
    pub balance: Amount,
    pub contribution_count: usize,
    pub total_contributed: Amount,
    pub total_disbursed: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fund_type_parse() {
        assert_eq!("reserve".parse::<FundType>().unwrap(), FundType::Reserve);
        assert_eq!(" Pool ".parse::<FundType>().unwrap(), FundType::Pool);
        assert!(matches!("treasury".parse::<FundType>(), Err(LedgerError::FundNotFound(_))));
        assert_eq!(FundType::Pool.to_string(), "pool");
    }

    #[test]
    fn test_fund_type_serializes_lowercase() {
        let json = serde_json::to_string(&FundType::Reserve).unwrap();
        assert_eq!(json, "\"reserve\"");
    }
}
