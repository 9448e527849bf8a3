// ABOUTME: Network configuration for the ShareLedger migration assistant
// ABOUTME: Holds endpoints, denoms, derivation paths and broadcast settings

use std::time::Duration;

/// REST endpoint of the ShareLedger testnet node
pub const DEFAULT_NODE_URL: &str = "https://tencent.blockchain.testnet.sharetoken.io:1317";

/// Block explorer used to print transaction links
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.testnet.sharetoken.io";

/// Bech32 human readable part shared by OLD and NEW addresses
pub const ADDRESS_PREFIX: &str = "shareledger";

/// Denomination transaction fees are paid in
pub const NATIVE_DENOM: &str = "nshr";

/// HD path used by the legacy ShareLedger key tooling
pub const OLD_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Cosmos default HD path used by current ShareLedger wallets
pub const NEW_DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

pub const DEFAULT_GAS_PER_MESSAGE: u64 = 200_000;

/// Settings for a single migration run
///
/// Everything except the two endpoints is fixed for the ShareLedger network.
/// The endpoints can be overridden from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub node_url: String,
    pub explorer_url: String,
    pub address_prefix: String,
    pub native_denom: String,
    pub old_derivation_path: String,
    pub new_derivation_path: String,
    pub gas_per_message: u64,
    /// Delay between two inclusion checks after a transaction was accepted
    pub broadcast_poll_interval: Duration,
    /// How long to wait for a broadcast transaction to land in a block
    pub broadcast_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            address_prefix: ADDRESS_PREFIX.to_string(),
            native_denom: NATIVE_DENOM.to_string(),
            old_derivation_path: OLD_DERIVATION_PATH.to_string(),
            new_derivation_path: NEW_DERIVATION_PATH.to_string(),
            gas_per_message: DEFAULT_GAS_PER_MESSAGE,
            broadcast_poll_interval: Duration::from_secs(3),
            broadcast_timeout: Duration::from_secs(60),
        }
    }
}

impl NetworkConfig {
    pub fn with_node_url(mut self, node_url: impl Into<String>) -> Self {
        self.node_url = node_url.into();
        self
    }

    pub fn with_explorer_url(mut self, explorer_url: impl Into<String>) -> Self {
        self.explorer_url = explorer_url.into();
        self
    }

    /// Explorer link for a broadcast transaction
    ///
    /// ```
    /// # use shareledger_migrator::config::NetworkConfig;
    /// let config = NetworkConfig::default().with_explorer_url("https://explorer.example");
    /// assert_eq!(
    ///     config.explorer_tx_url("ABC123"),
    ///     "https://explorer.example/transactions/ABC123"
    /// );
    /// ```
    pub fn explorer_tx_url(&self, transaction_hash: &str) -> String {
        format!("{}/transactions/{}", self.explorer_url, transaction_hash)
    }
}
