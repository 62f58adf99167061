use std::{env, fmt::Display, str::FromStr};

use log::*;
use payout_common::{
    helpers::{parse_boolean_flag, parse_optional},
    Amount,
};

use crate::db_types::ActorId;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/payout_store.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_WORKER_PERCENT: i64 = 60;
const DEFAULT_MAX_VALUATION_UNITS: i64 = 10_000;
const DEFAULT_WALLET_MIN_LENGTH: usize = 8;
const DEFAULT_WALLET_MAX_LENGTH: usize = 100;
const DEFAULT_WALLET_TYPE: &str = "TON Wallet";
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// The founding admin. When set, [`crate::PayoutApi::ensure_founder_admin`] puts this actor on the roster.
    pub founder_admin_id: Option<ActorId>,
    /// The worker percentage given to newly registered actors.
    pub default_worker_percent: i64,
    /// The largest total an admin may assign to a single request.
    pub max_valuation: Amount,
    pub wallet_min_length: usize,
    pub wallet_max_length: usize,
    /// The type tag stored with wallets created through the guided flows.
    pub default_wallet_type: String,
    pub event_buffer_size: usize,
    /// If true, the founding admin also receives "wallet added" notifications.
    pub notify_founder_of_wallets: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            founder_admin_id: None,
            default_worker_percent: DEFAULT_WORKER_PERCENT,
            max_valuation: Amount::from_units(DEFAULT_MAX_VALUATION_UNITS),
            wallet_min_length: DEFAULT_WALLET_MIN_LENGTH,
            wallet_max_length: DEFAULT_WALLET_MAX_LENGTH,
            default_wallet_type: DEFAULT_WALLET_TYPE.to_string(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            notify_founder_of_wallets: false,
        }
    }
}

impl EngineConfig {
    pub fn new(database_url: &str) -> Self {
        Self { database_url: database_url.to_string(), ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let database_url = env::var("PAYOUT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ PAYOUT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            defaults.database_url.clone()
        });
        let max_connections = env_or("PAYOUT_DB_MAX_CONNECTIONS", defaults.max_connections);
        let founder_admin_id = parse_optional::<i64>(env::var("PAYOUT_FOUNDER_ADMIN_ID").ok())
            .unwrap_or_else(|e| {
                error!("🪛️ PAYOUT_FOUNDER_ADMIN_ID is invalid. {e} No founding admin will be configured.");
                None
            })
            .map(ActorId::from);
        if founder_admin_id.is_none() {
            warn!("🪛️ No founding admin is configured. Set PAYOUT_FOUNDER_ADMIN_ID to seed the admin roster.");
        }
        let mut default_worker_percent = env_or("PAYOUT_DEFAULT_WORKER_PERCENT", defaults.default_worker_percent);
        if !(0..=100).contains(&default_worker_percent) {
            error!(
                "🪛️ PAYOUT_DEFAULT_WORKER_PERCENT must be between 0 and 100, but is {default_worker_percent}. \
                 Using the default, {DEFAULT_WORKER_PERCENT}, instead."
            );
            default_worker_percent = DEFAULT_WORKER_PERCENT;
        }
        let mut max_valuation = env_or("PAYOUT_MAX_VALUATION", defaults.max_valuation);
        if !max_valuation.is_positive() {
            error!("🪛️ PAYOUT_MAX_VALUATION must be positive. Using the default, {DEFAULT_MAX_VALUATION_UNITS}.");
            max_valuation = defaults.max_valuation;
        }
        let mut wallet_min_length = env_or("PAYOUT_WALLET_MIN_LENGTH", defaults.wallet_min_length);
        let mut wallet_max_length = env_or("PAYOUT_WALLET_MAX_LENGTH", defaults.wallet_max_length);
        if wallet_min_length == 0 || wallet_min_length > wallet_max_length {
            error!(
                "🪛️ The wallet address length bounds ({wallet_min_length}..={wallet_max_length}) are invalid. \
                 Using the defaults, {DEFAULT_WALLET_MIN_LENGTH}..={DEFAULT_WALLET_MAX_LENGTH}, instead."
            );
            wallet_min_length = DEFAULT_WALLET_MIN_LENGTH;
            wallet_max_length = DEFAULT_WALLET_MAX_LENGTH;
        }
        let default_wallet_type = env::var("PAYOUT_DEFAULT_WALLET_TYPE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| defaults.default_wallet_type.clone());
        let event_buffer_size = env_or("PAYOUT_EVENT_BUFFER_SIZE", defaults.event_buffer_size).max(1);
        let notify_founder_of_wallets =
            parse_boolean_flag(env::var("PAYOUT_NOTIFY_FOUNDER_OF_WALLETS").ok(), defaults.notify_founder_of_wallets);
        Self {
            database_url,
            max_connections,
            founder_admin_id,
            default_worker_percent,
            max_valuation,
            wallet_min_length,
            wallet_max_length,
            default_wallet_type,
            event_buffer_size,
            notify_founder_of_wallets,
        }
    }
}

/// Reads `var` from the environment, logging and falling back to `default` if it is missing or malformed.
fn env_or<T>(var: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match parse_optional::<T>(env::var(var).ok()) {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!("🪛️ {var} is not set. Using the default, {default}.");
            default
        },
        Err(e) => {
            error!("🪛️ {var} is invalid. {e} Using the default, {default}, instead.");
            default
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // All environment manipulation lives in one test, since tests run in parallel threads.
    #[test]
    fn from_env() {
        let _ = env_logger::try_init();
        let vars = [
            "PAYOUT_DATABASE_URL",
            "PAYOUT_DB_MAX_CONNECTIONS",
            "PAYOUT_FOUNDER_ADMIN_ID",
            "PAYOUT_DEFAULT_WORKER_PERCENT",
            "PAYOUT_MAX_VALUATION",
            "PAYOUT_WALLET_MIN_LENGTH",
            "PAYOUT_WALLET_MAX_LENGTH",
            "PAYOUT_DEFAULT_WALLET_TYPE",
            "PAYOUT_EVENT_BUFFER_SIZE",
            "PAYOUT_NOTIFY_FOUNDER_OF_WALLETS",
        ];
        vars.iter().for_each(|v| env::remove_var(v));
        assert_eq!(EngineConfig::from_env_or_default(), EngineConfig::default());

        env::set_var("PAYOUT_DATABASE_URL", "sqlite://tmp/x.db");
        env::set_var("PAYOUT_FOUNDER_ADMIN_ID", "4242");
        env::set_var("PAYOUT_DEFAULT_WORKER_PERCENT", "70");
        env::set_var("PAYOUT_MAX_VALUATION", "2500.5");
        env::set_var("PAYOUT_NOTIFY_FOUNDER_OF_WALLETS", "yes");
        env::set_var("PAYOUT_EVENT_BUFFER_SIZE", "not-a-number");
        let config = EngineConfig::from_env_or_default();
        assert_eq!(config.database_url, "sqlite://tmp/x.db");
        assert_eq!(config.founder_admin_id, Some(ActorId(4242)));
        assert_eq!(config.default_worker_percent, 70);
        assert_eq!(config.max_valuation, Amount::from(2_500_500_000));
        assert!(config.notify_founder_of_wallets);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);

        env::set_var("PAYOUT_DEFAULT_WORKER_PERCENT", "150");
        env::set_var("PAYOUT_WALLET_MIN_LENGTH", "50");
        env::set_var("PAYOUT_WALLET_MAX_LENGTH", "20");
        let config = EngineConfig::from_env_or_default();
        assert_eq!(config.default_worker_percent, DEFAULT_WORKER_PERCENT);
        assert_eq!(config.wallet_min_length, DEFAULT_WALLET_MIN_LENGTH);
        assert_eq!(config.wallet_max_length, DEFAULT_WALLET_MAX_LENGTH);

        vars.iter().for_each(|v| env::remove_var(v));
    }
}
