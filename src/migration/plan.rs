// ABOUTME: Decides which migration actions apply to the OLD account
// ABOUTME: Holds the queried holdings and renders the summary shown to the user

use crate::ledger::{Coin, Delegation, DelegatorReward};
use crate::utils::format_coins;
use std::fmt;

/// One kind of fund movement offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationAction {
    Transfer,
    Undelegate,
    Claim,
}

impl MigrationAction {
    /// Label in the action selection list
    pub fn label(&self) -> &'static str {
        match self {
            MigrationAction::Transfer => "Transfer ALL balances from OLD address to NEW address",
            MigrationAction::Undelegate => "Undelegate ALL delegations from OLD address",
            MigrationAction::Claim => "Claim ALL rewards for OLD address",
        }
    }

    /// Consequence the user has to accept before the action runs
    pub fn warning(&self) -> &'static str {
        match self {
            MigrationAction::Transfer => {
                "Transferring ALL tokens may get your OLD address to be unable to perform any other transactions. \
                 If you have delegations and/or rewards to be claimed, please do it first. Continue?"
            }
            MigrationAction::Undelegate => {
                "Undelegating requires up to 21 days for the tokens to be avail in your balance. Continue?"
            }
            MigrationAction::Claim => {
                "Claimed rewards are paid into your OLD address balance and still need to be transferred to your NEW address afterwards. Continue?"
            }
        }
    }
}

impl fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationAction::Transfer => "transfer",
            MigrationAction::Undelegate => "undelegate",
            MigrationAction::Claim => "claim",
        };
        f.write_str(name)
    }
}

/// Everything the OLD account holds, as returned by the three queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holdings {
    pub balances: Vec<Coin>,
    pub delegations: Vec<Delegation>,
    pub rewards: Vec<DelegatorReward>,
}

impl Holdings {
    /// Delegations that still carry a balance; the rest are ignored everywhere
    pub fn active_delegations(&self) -> impl Iterator<Item = (&str, &Coin)> + '_ {
        self.delegations.iter().filter_map(|d| {
            d.balance
                .as_ref()
                .map(|balance| (d.validator_address.as_str(), balance))
        })
    }

    /// Actions with something to act on, in menu order
    pub fn available_actions(&self) -> Vec<MigrationAction> {
        let mut actions = Vec::new();
        if !self.balances.is_empty() {
            actions.push(MigrationAction::Transfer);
        }
        if self.active_delegations().next().is_some() {
            actions.push(MigrationAction::Undelegate);
        }
        if !self.rewards.is_empty() {
            actions.push(MigrationAction::Claim);
        }
        actions
    }

    /// Human readable overview of every non-empty category
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        if !self.balances.is_empty() {
            lines.push("Balances:".to_string());
            lines.push(format!("  {}", format_coins(&self.balances)));
        }

        if self.active_delegations().next().is_some() {
            lines.push("Delegations:".to_string());
            for (validator, balance) in self.active_delegations() {
                lines.push(format!("  {}: {}", validator, balance));
            }
        }

        if !self.rewards.is_empty() {
            lines.push("Rewards:".to_string());
            for reward in &self.rewards {
                lines.push(format!(
                    "  {}: {}",
                    reward.validator_address,
                    format_coins(&reward.reward)
                ));
            }
        }

        lines.join("\n")
    }
}
