//! Configuration types for the withdrawal builder

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, FeeRateError, TxType};

/// Per-currency builder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Currency symbol (e.g., "BTC")
    pub currency: String,

    /// Fee margin applied to the first build attempt
    #[serde(default = "default_base_fee_float_up")]
    pub base_fee_float_up: Decimal,

    /// Fee margin used when the chain rejects the first attempt's fee
    #[serde(default = "default_fee_float_up")]
    pub fee_float_up: Decimal,

    /// Largest single withdrawal; gather outputs are capped at 5% of it
    #[serde(default)]
    pub max_withdraw_amount: Decimal,

    /// Custody address receiving change
    #[serde(default)]
    pub change_address: String,

    /// Fee rate in minor units per byte when no per-type rate is set
    #[serde(default)]
    pub default_fee_rate: Option<Decimal>,

    /// Fee rates keyed by transaction type name
    #[serde(default)]
    pub fee_rates: HashMap<String, Decimal>,
}

fn default_base_fee_float_up() -> Decimal {
    Decimal::new(10, 2)
}

fn default_fee_float_up() -> Decimal {
    Decimal::new(50, 2)
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            currency: "BTC".to_string(),
            base_fee_float_up: default_base_fee_float_up(),
            fee_float_up: default_fee_float_up(),
            max_withdraw_amount: Decimal::ZERO,
            change_address: String::new(),
            default_fee_rate: None,
            fee_rates: HashMap::new(),
        }
    }
}

impl BuilderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Source of the current network fee rate
pub trait FeeRateSource: Send + Sync {
    /// Fee rate in minor units per byte
    fn transaction_fee_rate(
        &self,
        tx_type: TxType,
        config: &BuilderConfig,
    ) -> Result<Decimal, FeeRateError>;
}

/// Reads fee rates straight from [`BuilderConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredFeeRate;

impl FeeRateSource for ConfiguredFeeRate {
    fn transaction_fee_rate(
        &self,
        tx_type: TxType,
        config: &BuilderConfig,
    ) -> Result<Decimal, FeeRateError> {
        let rate = config
            .fee_rates
            .get(tx_type.as_str())
            .copied()
            .or(config.default_fee_rate)
            .ok_or_else(|| FeeRateError::Missing {
                tx_type: tx_type.to_string(),
            })?;

        if rate.is_sign_negative() {
            return Err(FeeRateError::Invalid {
                tx_type: tx_type.to_string(),
                rate,
            });
        }
        Ok(rate)
    }
}
