// ABOUTME: Executes the chosen migration action as one signed transaction
// ABOUTME: Builds fee-aware messages, broadcasts them and contains any failure

use super::fees;
use super::plan::{Holdings, MigrationAction};
use crate::accounts::Account;
use crate::config::NetworkConfig;
use crate::ledger::{
    assert_is_deliver_tx_success, Coin, Delegation, DelegatorReward, FeeAction, LedgerClient,
    LedgerConnector, LedgerMsg, Signer,
};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::time::Duration;

pub const SUPPORT_MESSAGE: &str = "An unexpected error has occurred. Please take a screenshot of this screen and send to ShareRing customer support for further investigation.";

const SEPARATOR: &str = "-------------------------------";

/// How an action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Broadcast {
        transaction_hash: String,
        explorer_url: String,
    },
    /// The error was reported to the user and the run carries on
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: MigrationAction,
    pub result: ActionResult,
}

/// Send every balance to `recipient`, minus the send fee on the native denom
pub fn transfer_messages(
    sender: &str,
    recipient: &str,
    balances: &[Coin],
    fee: &Coin,
    native_denom: &str,
) -> Result<Vec<LedgerMsg>> {
    let amount = fees::deduct_fee(balances, fee, native_denom)?;
    Ok(vec![LedgerMsg::send(sender, recipient, amount)])
}

/// One undelegation per position that still has a balance
pub fn undelegate_messages(delegator: &str, delegations: &[Delegation]) -> Vec<LedgerMsg> {
    delegations
        .iter()
        .filter_map(|d| {
            d.balance
                .as_ref()
                .map(|balance| LedgerMsg::undelegate(delegator, &d.validator_address, balance.clone()))
        })
        .collect()
}

/// One withdrawal per distinct validator, whatever the reward denoms
pub fn claim_messages(delegator: &str, rewards: &[DelegatorReward]) -> Vec<LedgerMsg> {
    let mut seen = HashSet::new();
    rewards
        .iter()
        .filter(|r| seen.insert(r.validator_address.as_str()))
        .map(|r| LedgerMsg::withdraw_rewards(delegator, &r.validator_address))
        .collect()
}

/// Runs migration actions for the OLD account
pub struct ActionExecutor<'a> {
    connector: &'a dyn LedgerConnector,
    config: &'a NetworkConfig,
    old: &'a Account,
    new: &'a Account,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(
        connector: &'a dyn LedgerConnector,
        config: &'a NetworkConfig,
        old: &'a Account,
        new: &'a Account,
    ) -> Self {
        Self {
            connector,
            config,
            old,
            new,
        }
    }

    /// Run `action` inside its error boundary
    ///
    /// Failures never escape: they are printed with the support notice and
    /// returned as [`ActionResult::Failed`].
    pub async fn execute(&self, action: MigrationAction, holdings: &Holdings) -> ActionReport {
        let outcome = match action {
            MigrationAction::Transfer => self.transfer(&holdings.balances).await,
            MigrationAction::Undelegate => self.undelegate(&holdings.delegations).await,
            MigrationAction::Claim => self.claim(&holdings.rewards).await,
        };

        let result = match outcome {
            Ok(transaction_hash) => {
                let explorer_url = self.config.explorer_tx_url(&transaction_hash);
                println!("View transaction hash: {}", explorer_url);
                ActionResult::Broadcast {
                    transaction_hash,
                    explorer_url,
                }
            }
            Err(err) => {
                report_failure(&err);
                ActionResult::Failed {
                    error: format!("{:#}", err),
                }
            }
        };

        ActionReport { action, result }
    }

    pub async fn transfer(&self, balances: &[Coin]) -> Result<String> {
        tracing::info!("Creating transaction...");
        let client = self.connect().await?;
        let signer = self.signer()?;
        let fee = client
            .fee_by_action(FeeAction::BankSend)
            .await
            .context("Failed to look up the transfer fee")?;

        let sender = signer_address(&signer)?;
        let messages = transfer_messages(
            &sender,
            &self.new.address,
            balances,
            &fee,
            &self.config.native_denom,
        )?;

        broadcast(client.as_ref(), &signer, messages).await
    }

    pub async fn undelegate(&self, delegations: &[Delegation]) -> Result<String> {
        tracing::info!("Creating transaction...");
        let client = self.connect().await?;
        self.ensure_fee_covered(client.as_ref(), FeeAction::StakingUnbond)
            .await?;

        let signer = self.signer()?;
        let delegator = signer_address(&signer)?;
        let messages = undelegate_messages(&delegator, delegations);

        broadcast(client.as_ref(), &signer, messages).await
    }

    pub async fn claim(&self, rewards: &[DelegatorReward]) -> Result<String> {
        tracing::info!("Creating transaction...");
        let client = self.connect().await?;
        let signer = self.signer()?;
        self.ensure_fee_covered(client.as_ref(), FeeAction::WithdrawDelegatorReward)
            .await?;

        let delegator = signer_address(&signer)?;
        let messages = claim_messages(&delegator, rewards);

        broadcast(client.as_ref(), &signer, messages).await
    }

    async fn connect(&self) -> Result<Box<dyn LedgerClient>> {
        self.connector
            .connect()
            .await
            .context("Failed to connect to the ledger node")
    }

    fn signer(&self) -> Result<Signer> {
        Signer::from_private_key_hex(&self.old.private_key_hex, &self.config.address_prefix)
            .context("Failed to build a signer for the OLD address")
    }

    /// Abort before signing when the native balance cannot pay `action`'s fee
    async fn ensure_fee_covered(&self, client: &dyn LedgerClient, action: FeeAction) -> Result<()> {
        let balance = client
            .balance(&self.old.address, &self.config.native_denom)
            .await
            .context("Failed to query the OLD address balance")?;
        let fee = client
            .fee_by_action(action)
            .await
            .with_context(|| format!("Failed to look up the fee for '{}'", action))?;

        fees::ensure_fee_covered(&balance, &fee)
    }
}

fn signer_address(signer: &Signer) -> Result<String> {
    signer
        .accounts()
        .first()
        .map(|account| account.address.clone())
        .context("Signer does not expose any account")
}

async fn broadcast(
    client: &dyn LedgerClient,
    signer: &Signer,
    messages: Vec<LedgerMsg>,
) -> Result<String> {
    tracing::info!("Signing and broadcasting...");

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message("Waiting for the transaction to be included in a block");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = client.sign_and_broadcast(signer, messages).await;
    spinner.finish_and_clear();

    let result = result.context("Failed to sign and broadcast the transaction")?;
    assert_is_deliver_tx_success(&result)?;
    Ok(result.transaction_hash)
}

fn report_failure(err: &anyhow::Error) {
    tracing::debug!("Action failed: {:#}", err);
    eprintln!("{}", SUPPORT_MESSAGE);
    println!("{}", SEPARATOR);
    println!("{}", SEPARATOR);
    eprintln!("{:?}", err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{derive_accounts, validate_mnemonic, DerivedAccounts};
    use crate::testing::{FakeLedger, TEST_MNEMONIC};

    fn accounts(config: &NetworkConfig) -> DerivedAccounts {
        derive_accounts(&validate_mnemonic(TEST_MNEMONIC).unwrap(), config).unwrap()
    }

    fn delegation(validator: &str, balance: Option<Coin>) -> Delegation {
        Delegation {
            validator_address: validator.to_string(),
            balance,
        }
    }

    #[test]
    fn test_transfer_messages_deduct_fee_from_native_denom() {
        let balances = vec![Coin::new("nshr", "1000"), Coin::new("other", "50")];
        let messages =
            transfer_messages("old", "new", &balances, &Coin::new("nshr", "10"), "nshr").unwrap();

        assert_eq!(
            messages,
            vec![LedgerMsg::send(
                "old",
                "new",
                vec![Coin::new("nshr", "990"), Coin::new("other", "50")]
            )]
        );
    }

    #[test]
    fn test_undelegate_messages_skip_missing_balances() {
        let delegations = vec![
            delegation("A", Some(Coin::new("nshr", "100"))),
            delegation("B", None),
        ];
        let messages = undelegate_messages("old", &delegations);
        assert_eq!(
            messages,
            vec![LedgerMsg::undelegate("old", "A", Coin::new("nshr", "100"))]
        );
    }

    #[test]
    fn test_claim_messages_one_per_validator() {
        let rewards = vec![
            DelegatorReward {
                validator_address: "A".to_string(),
                reward: vec![Coin::new("nshr", "1.5"), Coin::new("other", "2")],
            },
            DelegatorReward {
                validator_address: "B".to_string(),
                reward: vec![Coin::new("nshr", "3")],
            },
            DelegatorReward {
                validator_address: "A".to_string(),
                reward: vec![Coin::new("third", "1")],
            },
        ];
        let messages = claim_messages("old", &rewards);
        assert_eq!(
            messages,
            vec![
                LedgerMsg::withdraw_rewards("old", "A"),
                LedgerMsg::withdraw_rewards("old", "B"),
            ]
        );
    }

    #[tokio::test]
    async fn test_transfer_broadcasts_fee_adjusted_balances() {
        let config = NetworkConfig::default();
        let accounts = accounts(&config);
        let ledger = FakeLedger::new();
        ledger.set_fee(FeeAction::BankSend, "10");

        let holdings = Holdings {
            balances: vec![Coin::new("nshr", "1000"), Coin::new("other", "50")],
            ..Default::default()
        };

        let executor = ActionExecutor::new(&ledger, &config, &accounts.old, &accounts.new);
        let report = executor.execute(MigrationAction::Transfer, &holdings).await;

        assert!(matches!(report.result, ActionResult::Broadcast { .. }));
        let broadcasts = ledger.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].signer, accounts.old.address);
        assert_eq!(
            broadcasts[0].messages,
            vec![LedgerMsg::send(
                &accounts.old.address,
                &accounts.new.address,
                vec![Coin::new("nshr", "990"), Coin::new("other", "50")]
            )]
        );
    }

    #[tokio::test]
    async fn test_undelegate_aborts_when_fee_not_covered() {
        let config = NetworkConfig::default();
        let accounts = accounts(&config);
        let ledger = FakeLedger::new();
        ledger.set_native_balance("5");
        ledger.set_fee(FeeAction::StakingUnbond, "10");

        let holdings = Holdings {
            delegations: vec![delegation("A", Some(Coin::new("nshr", "100")))],
            ..Default::default()
        };

        let executor = ActionExecutor::new(&ledger, &config, &accounts.old, &accounts.new);
        let report = executor.execute(MigrationAction::Undelegate, &holdings).await;

        match report.result {
            ActionResult::Failed { error } => {
                assert!(error.contains(fees::INSUFFICIENT_BALANCE_MESSAGE))
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(ledger.broadcasts().is_empty());
        assert!(!ledger.calls().contains(&"sign_and_broadcast".to_string()));
    }

    #[tokio::test]
    async fn test_undelegate_broadcasts_one_message_per_funded_delegation() {
        let config = NetworkConfig::default();
        let accounts = accounts(&config);
        let ledger = FakeLedger::new();
        ledger.set_native_balance("100");
        ledger.set_fee(FeeAction::StakingUnbond, "10");

        let holdings = Holdings {
            delegations: vec![
                delegation("A", Some(Coin::new("nshr", "100"))),
                delegation("B", None),
            ],
            ..Default::default()
        };

        let executor = ActionExecutor::new(&ledger, &config, &accounts.old, &accounts.new);
        let report = executor.execute(MigrationAction::Undelegate, &holdings).await;

        assert!(matches!(report.result, ActionResult::Broadcast { .. }));
        let broadcasts = ledger.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(
            broadcasts[0].messages,
            vec![LedgerMsg::undelegate(
                &accounts.old.address,
                "A",
                Coin::new("nshr", "100")
            )]
        );
    }

    #[tokio::test]
    async fn test_claim_checks_fee_and_broadcasts() {
        let config = NetworkConfig::default();
        let accounts = accounts(&config);
        let ledger = FakeLedger::new();
        ledger.set_native_balance("50");
        ledger.set_fee(FeeAction::WithdrawDelegatorReward, "10");

        let holdings = Holdings {
            rewards: vec![DelegatorReward {
                validator_address: "V".to_string(),
                reward: vec![Coin::new("nshr", "7.25")],
            }],
            ..Default::default()
        };

        let executor = ActionExecutor::new(&ledger, &config, &accounts.old, &accounts.new);
        let report = executor.execute(MigrationAction::Claim, &holdings).await;

        match report.result {
            ActionResult::Broadcast {
                transaction_hash,
                explorer_url,
            } => {
                assert!(explorer_url.ends_with(&format!("/transactions/{}", transaction_hash)));
            }
            other => panic!("expected broadcast, got {:?}", other),
        }
        assert_eq!(
            ledger.broadcasts()[0].messages,
            vec![LedgerMsg::withdraw_rewards(&accounts.old.address, "V")]
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_is_contained() {
        let config = NetworkConfig::default();
        let accounts = accounts(&config);
        let ledger = FakeLedger::new();
        ledger.set_fee(FeeAction::BankSend, "10");
        ledger.fail_delivery(11, "out of gas");

        let holdings = Holdings {
            balances: vec![Coin::new("nshr", "1000")],
            ..Default::default()
        };

        let executor = ActionExecutor::new(&ledger, &config, &accounts.old, &accounts.new);
        let report = executor.execute(MigrationAction::Transfer, &holdings).await;

        assert_eq!(report.action, MigrationAction::Transfer);
        match report.result {
            ActionResult::Failed { error } => assert!(error.contains("out of gas")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(ledger.broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_contained() {
        let config = NetworkConfig::default();
        let accounts = accounts(&config);
        let ledger = FakeLedger::new();
        ledger.fail_connect();

        let holdings = Holdings {
            balances: vec![Coin::new("nshr", "1000")],
            ..Default::default()
        };

        let executor = ActionExecutor::new(&ledger, &config, &accounts.old, &accounts.new);
        let report = executor.execute(MigrationAction::Transfer, &holdings).await;

        assert!(matches!(report.result, ActionResult::Failed { .. }));
        assert!(ledger.broadcasts().is_empty());
    }
}
