// ABOUTME: REST implementation of the ledger client against a ShareLedger node
// ABOUTME: Handles queries, fee lookups, direct-mode signing and broadcast polling

use super::{
    BroadcastResult, Coin, Delegation, DelegatorReward, FeeAction, LedgerClient, LedgerConnector,
    LedgerMsg, Signer,
};
use crate::config::NetworkConfig;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use cosmrs::tendermint::chain;
use cosmrs::tx::{self, Msg, SignDoc, SignerInfo};
use cosmrs::{bank, distribution, staking, AccountId, Any, Denom};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const BROADCAST_MODE_SYNC: &str = "BROADCAST_MODE_SYNC";

#[derive(Debug, Deserialize)]
struct NodeInfoResponse {
    default_node_info: DefaultNodeInfo,
}

#[derive(Debug, Deserialize)]
struct DefaultNodeInfo {
    network: String,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    balances: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    balance: Option<Coin>,
}

#[derive(Debug, Deserialize)]
struct DelegationsResponse {
    #[serde(default)]
    delegation_responses: Vec<DelegationResponse>,
}

#[derive(Debug, Deserialize)]
struct DelegationResponse {
    delegation: DelegationInfo,
    #[serde(default)]
    balance: Option<Coin>,
}

#[derive(Debug, Deserialize)]
struct DelegationInfo {
    validator_address: String,
}

#[derive(Debug, Deserialize)]
struct RewardsResponse {
    #[serde(default)]
    rewards: Vec<RewardEntry>,
}

#[derive(Debug, Deserialize)]
struct RewardEntry {
    validator_address: String,
    #[serde(default)]
    reward: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct FeeByActionResponse {
    fee: Coin,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct BroadcastRequest<'a> {
    tx_bytes: String,
    mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct TxResponseEnvelope {
    tx_response: TxResponse,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    height: String,
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    raw_log: String,
}

impl TxResponse {
    fn into_result(self) -> BroadcastResult {
        BroadcastResult {
            height: self.height.parse().unwrap_or(0),
            transaction_hash: self.txhash,
            code: self.code,
            raw_log: self.raw_log,
        }
    }
}

/// Signing data the node keeps for an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AccountInfo {
    account_number: u64,
    sequence: u64,
}

/// Opens [`RestLedgerClient`] sessions for a [`NetworkConfig`]
#[derive(Debug, Clone)]
pub struct RestConnector {
    config: NetworkConfig,
}

impl RestConnector {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LedgerConnector for RestConnector {
    async fn connect(&self) -> Result<Box<dyn LedgerClient>> {
        let client = RestLedgerClient::connect(self.config.clone()).await?;
        Ok(Box::new(client))
    }
}

/// Ledger session talking to the node's REST gateway
#[derive(Debug, Clone)]
pub struct RestLedgerClient {
    http: reqwest::Client,
    config: NetworkConfig,
    chain_id: String,
}

impl RestLedgerClient {
    /// Connect to the node and learn which chain it serves
    pub async fn connect(config: NetworkConfig) -> Result<Self> {
        let mut client = Self::new(config, String::new())?;
        let node_info: NodeInfoResponse = client
            .get_json("/cosmos/base/tendermint/v1beta1/node_info", &[], "node info")
            .await
            .with_context(|| format!("Failed to connect to {}", client.config.node_url))?;
        client.chain_id = node_info.default_node_info.network;
        tracing::debug!("Connected to chain '{}'", client.chain_id);
        Ok(client)
    }

    /// Build a client for a known chain without contacting the node
    pub fn new(config: NetworkConfig, chain_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("shareledger-migrator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            config,
            chain_id: chain_id.into(),
        })
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.config.node_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to query {}", what))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Node returned {} while querying {}: {}", status, what, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }

    async fn account_info(&self, address: &str) -> Result<AccountInfo> {
        let response: AccountResponse = self
            .get_json(
                &format!("/cosmos/auth/v1beta1/accounts/{}", address),
                &[],
                "account",
            )
            .await?;
        Ok(AccountInfo {
            account_number: account_field(&response.account, "account_number").unwrap_or(0),
            sequence: account_field(&response.account, "sequence").unwrap_or(0),
        })
    }

    /// Total fee for `messages`: one schedule entry per message
    async fn transaction_fee(&self, messages: &[LedgerMsg]) -> Result<cosmrs::Coin> {
        let mut schedule: HashMap<FeeAction, u128> = HashMap::new();
        let mut total: u128 = 0;

        for message in messages {
            let action = message.fee_action();
            let amount = match schedule.get(&action) {
                Some(amount) => *amount,
                None => {
                    let fee = self.fee_by_action(action).await?;
                    let amount = parse_integer_amount(&fee.amount)
                        .with_context(|| format!("Invalid fee for action '{}'", action))?;
                    schedule.insert(action, amount);
                    amount
                }
            };
            total = total
                .checked_add(amount)
                .context("Transaction fee overflowed")?;
        }

        Ok(cosmrs::Coin {
            denom: parse_denom(&self.config.native_denom)?,
            amount: total,
        })
    }

    fn build_tx_bytes(
        &self,
        signer: &Signer,
        messages: &[LedgerMsg],
        fee: cosmrs::Coin,
        account: AccountInfo,
    ) -> Result<Vec<u8>> {
        let anys = messages
            .iter()
            .map(to_any)
            .collect::<Result<Vec<Any>>>()?;

        let gas_limit = self.config.gas_per_message * messages.len() as u64;
        let fee = tx::Fee::from_amount_and_gas(fee, gas_limit);

        let body = tx::Body::new(anys, "", 0u32);
        let auth_info =
            SignerInfo::single_direct(Some(signer.public_key().clone()), account.sequence)
                .auth_info(fee);

        let chain_id: chain::Id = self
            .chain_id
            .parse()
            .map_err(|e| anyhow!("Invalid chain id '{}': {}", self.chain_id, e))?;

        let sign_doc = SignDoc::new(&body, &auth_info, &chain_id, account.account_number)
            .map_err(|e| anyhow!("Failed to build sign doc: {}", e))?;

        signer
            .sign_direct(sign_doc)?
            .to_bytes()
            .map_err(|e| anyhow!("Failed to encode signed transaction: {}", e))
    }

    async fn fetch_tx(&self, hash: &str) -> Result<Option<TxResponse>> {
        let url = format!("{}/cosmos/tx/v1beta1/txs/{}", self.config.node_url, hash);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to query transaction")?;

        let status = response.status();
        if status.is_success() {
            let envelope: TxResponseEnvelope = response
                .json()
                .await
                .context("Failed to parse transaction response")?;
            return Ok(Some(envelope.tx_response));
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND || body.contains("not found") {
            return Ok(None);
        }
        bail!("Node returned {} while querying transaction: {}", status, body)
    }

    async fn wait_for_inclusion(&self, hash: &str) -> Result<BroadcastResult> {
        let deadline = tokio::time::Instant::now() + self.config.broadcast_timeout;

        loop {
            tokio::time::sleep(self.config.broadcast_poll_interval).await;

            if let Some(tx) = self.fetch_tx(hash).await? {
                return Ok(tx.into_result());
            }

            if tokio::time::Instant::now() >= deadline {
                bail!(
                    "Transaction {} was accepted by the node but was not included in a block within {:?}. \
                     Check the explorer before trying again.",
                    hash,
                    self.config.broadcast_timeout
                );
            }
        }
    }
}

#[async_trait]
impl LedgerClient for RestLedgerClient {
    async fn all_balances(&self, address: &str) -> Result<Vec<Coin>> {
        let response: BalancesResponse = self
            .get_json(
                &format!("/cosmos/bank/v1beta1/balances/{}", address),
                &[],
                "balances",
            )
            .await?;
        Ok(response.balances)
    }

    async fn delegator_delegations(&self, address: &str) -> Result<Vec<Delegation>> {
        let response: DelegationsResponse = self
            .get_json(
                &format!("/cosmos/staking/v1beta1/delegations/{}", address),
                &[],
                "delegations",
            )
            .await?;
        Ok(response
            .delegation_responses
            .into_iter()
            .map(|d| Delegation {
                validator_address: d.delegation.validator_address,
                balance: d.balance,
            })
            .collect())
    }

    async fn delegation_total_rewards(&self, address: &str) -> Result<Vec<DelegatorReward>> {
        let response: RewardsResponse = self
            .get_json(
                &format!("/cosmos/distribution/v1beta1/delegators/{}/rewards", address),
                &[],
                "rewards",
            )
            .await?;
        Ok(response
            .rewards
            .into_iter()
            .map(|r| DelegatorReward {
                validator_address: r.validator_address,
                reward: r.reward,
            })
            .collect())
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<Coin> {
        let response: BalanceResponse = self
            .get_json(
                &format!("/cosmos/bank/v1beta1/balances/{}/by_denom", address),
                &[("denom", denom)],
                "balance",
            )
            .await?;
        Ok(response.balance.unwrap_or_else(|| Coin::new(denom, "0")))
    }

    async fn fee_by_action(&self, action: FeeAction) -> Result<Coin> {
        let response: FeeByActionResponse = self
            .get_json(
                &format!("/shareledger/gentlemint/fee_by_action/{}", action),
                &[],
                "fee schedule",
            )
            .await?;
        Ok(response.fee)
    }

    async fn sign_and_broadcast(
        &self,
        signer: &Signer,
        messages: Vec<LedgerMsg>,
    ) -> Result<BroadcastResult> {
        if messages.is_empty() {
            bail!("Refusing to broadcast a transaction without messages");
        }

        let address = signer.address().to_string();
        let account = self
            .account_info(&address)
            .await
            .with_context(|| format!("Failed to load signing data for {}", address))?;
        tracing::debug!(
            "Signing as {} (account number {}, sequence {})",
            address,
            account.account_number,
            account.sequence
        );

        let fee = self.transaction_fee(&messages).await?;
        let tx_bytes = self.build_tx_bytes(signer, &messages, fee, account)?;
        tracing::debug!("Local transaction hash: {}", transaction_hash(&tx_bytes));

        let request = BroadcastRequest {
            tx_bytes: base64::engine::general_purpose::STANDARD.encode(&tx_bytes),
            mode: BROADCAST_MODE_SYNC,
        };
        let response = self
            .http
            .post(format!("{}/cosmos/tx/v1beta1/txs", self.config.node_url))
            .json(&request)
            .send()
            .await
            .context("Failed to broadcast transaction")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Node returned {} while broadcasting: {}", status, body);
        }

        let envelope: TxResponseEnvelope = response
            .json()
            .await
            .context("Failed to parse broadcast response")?;
        let checked = envelope.tx_response.into_result();

        // CheckTx rejected it, nothing will be included
        if !checked.is_success() {
            return Ok(checked);
        }

        self.wait_for_inclusion(&checked.transaction_hash).await
    }
}

/// Upper-case hex SHA-256 of the encoded transaction, as explorers show it
fn transaction_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

/// Find a numeric field in an account, looking through vesting wrappers
fn account_field(account: &serde_json::Value, key: &str) -> Option<u64> {
    if let Some(value) = account.get(key) {
        return value
            .as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| value.as_u64());
    }
    account
        .as_object()?
        .values()
        .filter(|v| v.is_object())
        .find_map(|v| account_field(v, key))
}

fn parse_integer_amount(amount: &str) -> Result<u128> {
    amount
        .trim()
        .parse::<u128>()
        .with_context(|| format!("'{}' is not a whole token amount", amount))
}

fn parse_denom(denom: &str) -> Result<Denom> {
    denom
        .parse()
        .map_err(|e| anyhow!("Invalid denom '{}': {}", denom, e))
}

fn parse_account_id(address: &str) -> Result<AccountId> {
    address
        .parse()
        .map_err(|e| anyhow!("Invalid address '{}': {}", address, e))
}

fn to_cosmos_coin(coin: &Coin) -> Result<cosmrs::Coin> {
    Ok(cosmrs::Coin {
        denom: parse_denom(&coin.denom)?,
        amount: parse_integer_amount(&coin.amount)?,
    })
}

fn to_any(message: &LedgerMsg) -> Result<Any> {
    let any = match message {
        LedgerMsg::Send {
            from_address,
            to_address,
            amount,
        } => bank::MsgSend {
            from_address: parse_account_id(from_address)?,
            to_address: parse_account_id(to_address)?,
            amount: amount
                .iter()
                .map(to_cosmos_coin)
                .collect::<Result<Vec<_>>>()?,
        }
        .to_any(),
        LedgerMsg::Undelegate {
            delegator_address,
            validator_address,
            amount,
        } => staking::MsgUndelegate {
            delegator_address: parse_account_id(delegator_address)?,
            validator_address: parse_account_id(validator_address)?,
            amount: to_cosmos_coin(amount)?,
        }
        .to_any(),
        LedgerMsg::WithdrawRewards {
            delegator_address,
            validator_address,
        } => distribution::MsgWithdrawDelegatorReward {
            delegator_address: parse_account_id(delegator_address)?,
            validator_address: parse_account_id(validator_address)?,
        }
        .to_any(),
    };

    any.map_err(|e| anyhow!("Failed to encode {} message: {}", message.fee_action(), e))
}
