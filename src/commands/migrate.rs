// ABOUTME: Migrate command - the end-to-end OLD to NEW address workflow
// ABOUTME: Derives accounts, inspects the OLD account and runs one chosen action

use crate::accounts;
use crate::config::NetworkConfig;
use crate::interactive::{self, Prompter};
use crate::ledger::LedgerConnector;
use crate::migration::{ActionExecutor, ActionReport, Holdings, MigrationAction};
use anyhow::{Context, Result};

pub const ADDRESS_MISMATCH_MESSAGE: &str =
    "You must have used different passphrases for your accounts. There's not much we can do.";

pub const NOTHING_TO_MIGRATE_MESSAGE: &str =
    "There's no actions required. You can start over with your NEW shareledger address";

pub const FEE_FUNDS_DECLINED_MESSAGE: &str =
    "Please top up your OLD address with SHR to cover transaction fees, then run this tool again.";

/// Where a run stopped
///
/// Every variant is a normal ending; the binary exits with status 0 for all
/// of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The opening question was declined
    Cancelled,
    /// The user did not recognise one of the derived addresses
    AddressMismatch,
    NothingToMigrate,
    FeeFundsNotConfirmed,
    ActionDeclined(MigrationAction),
    Executed(ActionReport),
}

/// Interactive migration from the OLD address to the NEW address
///
/// Runs these steps in order, each finishing before the next starts:
/// 1. Opening confirmation
/// 2. Mnemonic entry, re-asked until it is a valid BIP-39 phrase
/// 3. Derivation of the OLD and NEW accounts and confirmation of both addresses
/// 4. Balance, delegation and reward queries for the OLD address
/// 5. Summary, fee funds confirmation and action selection
/// 6. Action warning, then execution inside the action's error boundary
///
/// # Errors
///
/// Only setup failures surface as errors: terminal I/O, key derivation, the
/// initial connection and the three read queries. Failures while executing
/// the chosen action are reported to the user and returned inside
/// [`MigrationOutcome::Executed`].
pub async fn migrate(
    prompter: &mut dyn Prompter,
    connector: &dyn LedgerConnector,
    config: &NetworkConfig,
) -> Result<MigrationOutcome> {
    if !interactive::confirm_start(prompter)? {
        println!("Bye!");
        return Ok(MigrationOutcome::Cancelled);
    }

    let mnemonic = interactive::prompt_mnemonic(prompter)?;
    let accounts = accounts::derive_accounts(&mnemonic, config)?;

    let confirmation = interactive::confirm_addresses(prompter, &accounts)?;
    if !confirmation.both() {
        println!("{}", ADDRESS_MISMATCH_MESSAGE);
        return Ok(MigrationOutcome::AddressMismatch);
    }

    let holdings = query_holdings(connector, &accounts.old.address).await?;

    let actions = holdings.available_actions();
    if actions.is_empty() {
        println!("{}", NOTHING_TO_MIGRATE_MESSAGE);
        return Ok(MigrationOutcome::NothingToMigrate);
    }

    println!();
    println!("{}", holdings.summary());
    println!();

    if !interactive::confirm_fee_funds(prompter)? {
        println!("{}", FEE_FUNDS_DECLINED_MESSAGE);
        return Ok(MigrationOutcome::FeeFundsNotConfirmed);
    }

    let action = interactive::select_action(prompter, &actions)?;
    if !interactive::confirm_action(prompter, action)? {
        println!("Bye!");
        return Ok(MigrationOutcome::ActionDeclined(action));
    }

    let executor = ActionExecutor::new(connector, config, &accounts.old, &accounts.new);
    let report = executor.execute(action, &holdings).await;
    tracing::debug!("Action finished: {:?}", report);

    Ok(MigrationOutcome::Executed(report))
}

/// Read balances, delegations and rewards of `address`, one after another
pub async fn query_holdings(connector: &dyn LedgerConnector, address: &str) -> Result<Holdings> {
    tracing::info!("Connecting to ledger node...");
    let client = connector
        .connect()
        .await
        .context("Failed to connect to the ledger node")?;

    tracing::info!("Checking balance...");
    let balances = client
        .all_balances(address)
        .await
        .context("Failed to query balances")?;

    tracing::info!("Checking delegations...");
    let delegations = client
        .delegator_delegations(address)
        .await
        .context("Failed to query delegations")?;

    tracing::info!("Checking rewards...");
    let rewards = client
        .delegation_total_rewards(address)
        .await
        .context("Failed to query rewards")?;

    Ok(Holdings {
        balances,
        delegations,
        rewards,
    })
}
