// ABOUTME: Decimal fee arithmetic applied before a migration transaction is built
// ABOUTME: Deducts the send fee from the native balance and checks fee coverage

use crate::ledger::Coin;
use anyhow::{anyhow, bail, Result};
use cosmwasm_std::Decimal256;
use std::str::FromStr;

pub const INSUFFICIENT_BALANCE_MESSAGE: &str = "You don't have enough balance to proceed.";

/// Parse a ledger amount without going through floating point
pub fn parse_amount(amount: &str) -> Result<Decimal256> {
    Decimal256::from_str(amount.trim()).map_err(|e| anyhow!("Invalid amount '{}': {}", amount, e))
}

/// Subtract `fee` from every balance entry in `native_denom`
///
/// Other denominations pass through untouched and the order is kept. A fee
/// larger than the native balance is an error rather than a negative amount.
///
/// ```
/// # use shareledger_migrator::ledger::Coin;
/// # use shareledger_migrator::migration::fees::deduct_fee;
/// let balances = vec![Coin::new("nshr", "1000"), Coin::new("other", "50")];
/// let adjusted = deduct_fee(&balances, &Coin::new("nshr", "10"), "nshr").unwrap();
/// assert_eq!(adjusted, vec![Coin::new("nshr", "990"), Coin::new("other", "50")]);
/// ```
pub fn deduct_fee(balances: &[Coin], fee: &Coin, native_denom: &str) -> Result<Vec<Coin>> {
    let fee_amount = parse_amount(&fee.amount)?;

    balances
        .iter()
        .map(|coin| {
            if coin.denom != native_denom {
                return Ok(coin.clone());
            }
            let amount = parse_amount(&coin.amount)?;
            let remaining = amount.checked_sub(fee_amount).map_err(|_| {
                anyhow!(
                    "{} Balance {} is lower than the transaction fee {}{}",
                    INSUFFICIENT_BALANCE_MESSAGE,
                    coin,
                    fee.amount,
                    native_denom
                )
            })?;
            Ok(Coin::new(native_denom, remaining.to_string()))
        })
        .collect()
}

/// Fail when `balance` cannot pay `fee`
pub fn ensure_fee_covered(balance: &Coin, fee: &Coin) -> Result<()> {
    let available = parse_amount(&balance.amount)?;
    let required = parse_amount(&fee.amount)?;

    if available < required {
        bail!(
            "{} Balance: {}, fee: {}{}",
            INSUFFICIENT_BALANCE_MESSAGE,
            balance,
            fee.amount,
            balance.denom
        );
    }
    Ok(())
}
