use alloy::primitives::Address;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Ledger contract
    pub rpc_url: String,
    pub contract_address: Address,
    pub chain_id: Option<u64>,
    /// Enables wager/record submission. Read-only without it.
    pub private_key: Option<String>,

    // Session (falls back to the signer address)
    pub user_address: Option<Address>,

    // Scanning
    pub scan_concurrency: usize,
    pub rpc_timeout_ms: u64,
    pub record_poll_interval_secs: u64,
    pub tx_confirmation_timeout_secs: u64,

    pub api_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            rpc_url: env::var("RPC_URL").map_err(|_| anyhow::anyhow!("RPC_URL must be set"))?,
            contract_address: env::var("CONTRACT_ADDRESS")
                .map_err(|_| anyhow::anyhow!("CONTRACT_ADDRESS must be set"))?
                .parse()?,
            chain_id: non_empty("CHAIN_ID").map(|v| v.parse()).transpose()?,
            private_key: non_empty("PRIVATE_KEY"),

            user_address: non_empty("USER_ADDRESS").map(|v| v.parse()).transpose()?,

            scan_concurrency: env::var("SCAN_CONCURRENCY")
                .unwrap_or_else(|_| "4".into())
                .parse::<usize>()
                .unwrap_or(4)
                .max(1),
            rpc_timeout_ms: env::var("RPC_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".into())
                .parse()
                .unwrap_or(10_000),
            record_poll_interval_secs: env::var("RECORD_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .unwrap_or(15),
            tx_confirmation_timeout_secs: env::var("TX_CONFIRMATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".into())
                .parse()
                .unwrap_or(120),

            api_token: non_empty("API_TOKEN"),
        })
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn tx_confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_confirmation_timeout_secs)
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
