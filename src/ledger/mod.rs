// ABOUTME: Ledger client seam used by the migration workflow
// ABOUTME: Defines query/broadcast traits, chain data types and message builders

pub mod rest;
pub mod signer;

pub use rest::{RestConnector, RestLedgerClient};
pub use signer::{AccountData, Signer};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A denomination and an amount, exactly as the node reports it
///
/// Amounts stay strings so no precision is lost between the node and the
/// decimal arithmetic in `migration::fees`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// One staking position of the delegator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub validator_address: String,
    /// Nodes omit the balance for positions that are being torn down
    pub balance: Option<Coin>,
}

/// Pending distribution rewards owed by one validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatorReward {
    pub validator_address: String,
    pub reward: Vec<Coin>,
}

/// Message kinds the ShareLedger fee schedule is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeAction {
    BankSend,
    StakingUnbond,
    WithdrawDelegatorReward,
}

impl FeeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeAction::BankSend => "bank_send",
            FeeAction::StakingUnbond => "staking_unbond",
            FeeAction::WithdrawDelegatorReward => "distribution_withdraw-delegator-reward",
        }
    }
}

impl fmt::Display for FeeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction message, independent of its protobuf encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerMsg {
    Send {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },
    Undelegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    WithdrawRewards {
        delegator_address: String,
        validator_address: String,
    },
}

impl LedgerMsg {
    pub fn send(from: &str, to: &str, amount: Vec<Coin>) -> Self {
        LedgerMsg::Send {
            from_address: from.to_string(),
            to_address: to.to_string(),
            amount,
        }
    }

    pub fn undelegate(delegator: &str, validator: &str, amount: Coin) -> Self {
        LedgerMsg::Undelegate {
            delegator_address: delegator.to_string(),
            validator_address: validator.to_string(),
            amount,
        }
    }

    /// Withdraws everything pending from `validator`, hence no amount
    pub fn withdraw_rewards(delegator: &str, validator: &str) -> Self {
        LedgerMsg::WithdrawRewards {
            delegator_address: delegator.to_string(),
            validator_address: validator.to_string(),
        }
    }

    pub fn fee_action(&self) -> FeeAction {
        match self {
            LedgerMsg::Send { .. } => FeeAction::BankSend,
            LedgerMsg::Undelegate { .. } => FeeAction::StakingUnbond,
            LedgerMsg::WithdrawRewards { .. } => FeeAction::WithdrawDelegatorReward,
        }
    }
}

/// Outcome of a signed transaction submitted to the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
    pub transaction_hash: String,
    pub height: u64,
    pub code: u32,
    pub raw_log: String,
}

impl BroadcastResult {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Fail unless the transaction was delivered on chain without error
pub fn assert_is_deliver_tx_success(result: &BroadcastResult) -> Result<()> {
    if !result.is_success() {
        bail!(
            "Error when broadcasting tx {} at height {}. Code: {}; Raw log: {}",
            result.transaction_hash,
            result.height,
            result.code,
            result.raw_log
        );
    }
    Ok(())
}

/// Read and write access to the ledger for one session
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn all_balances(&self, address: &str) -> Result<Vec<Coin>>;

    async fn delegator_delegations(&self, address: &str) -> Result<Vec<Delegation>>;

    async fn delegation_total_rewards(&self, address: &str) -> Result<Vec<DelegatorReward>>;

    /// Balance of one denom; an address that never held it reports zero
    async fn balance(&self, address: &str, denom: &str) -> Result<Coin>;

    async fn fee_by_action(&self, action: FeeAction) -> Result<Coin>;

    /// Sign `messages` as one transaction with `signer` and submit it
    async fn sign_and_broadcast(
        &self,
        signer: &Signer,
        messages: Vec<LedgerMsg>,
    ) -> Result<BroadcastResult>;
}

/// Opens sessions against a ledger node
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LedgerClient>>;
}
