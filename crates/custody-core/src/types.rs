//! Core type definitions for the withdrawal builder

use std::collections::HashMap;
use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Custodial address class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressClass {
    /// Exchange hot-wallet address that funds withdrawals
    System,
    /// Per-user deposit address, swept by gather tasks
    Normal,
}

impl AddressClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A funding address with its booked balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub balance: Decimal,
    pub class: AddressClass,
}

impl Account {
    pub fn new(address: impl Into<String>, balance: Decimal, class: AddressClass) -> Self {
        Self {
            address: address.into(),
            balance,
            class,
        }
    }
}

/// An unspent output owned by exactly one account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub address: String,
    pub amount: Decimal,
}

impl Utxo {
    pub fn new(
        txid: impl Into<String>,
        vout: u32,
        address: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            txid: txid.into(),
            vout,
            address: address.into(),
            amount,
        }
    }
}

/// UTXOs returned by a store query, with their summed amount
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoBatch {
    pub utxos: Vec<Utxo>,
    pub total_in: Decimal,
}

impl UtxoBatch {
    pub fn new(utxos: Vec<Utxo>) -> Self {
        let total_in = utxos.iter().map(|u| u.amount).sum();
        Self { utxos, total_in }
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

/// Per-asset constants.
///
/// `fee` is rewritten by every build attempt. Builders hand each attempt its
/// own clone, so a template must never be shared mutably between builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyMeta {
    pub symbol: String,
    /// Maximum number of inputs allowed in one transaction
    pub max_tx_in_len: usize,
    /// Fee reserved by the current build attempt
    #[serde(default)]
    pub fee: Decimal,
    /// Decimal places between the display unit and the chain's minor unit
    pub precision: u32,
}

impl CurrencyMeta {
    pub fn new(symbol: impl Into<String>, max_tx_in_len: usize, precision: u32) -> Self {
        Self {
            symbol: symbol.into(),
            max_tx_in_len,
            fee: Decimal::ZERO,
            precision,
        }
    }

    /// `10^precision` as a decimal, if representable
    pub fn unit_factor(&self) -> Option<Decimal> {
        let factor = 10_i128.checked_pow(self.precision)?;
        Decimal::try_from_i128_with_scale(factor, 0).ok()
    }

    /// Convert an amount to integer minor units, truncating any remainder.
    ///
    /// Returns `None` for negative amounts or when the result does not fit
    /// in a `u64`.
    pub fn to_minor_units(&self, amount: Decimal) -> Option<u64> {
        amount
            .checked_mul(self.unit_factor()?)
            .map(|v| v.trunc())
            .and_then(|v| v.to_u64())
    }
}

/// Currency metadata lookup
pub trait MetadataLookup {
    fn metadata_for(&self, symbol: &str) -> Option<CurrencyMeta>;
}

/// Static metadata table keyed by upper-case currency symbol
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entries: HashMap<String, CurrencyMeta>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, meta: CurrencyMeta) {
        self.entries.insert(meta.symbol.to_uppercase(), meta);
    }

    pub fn with(mut self, meta: CurrencyMeta) -> Self {
        self.register(meta);
        self
    }
}

impl MetadataLookup for MetadataRegistry {
    fn metadata_for(&self, symbol: &str) -> Option<CurrencyMeta> {
        self.entries.get(&symbol.to_uppercase()).cloned()
    }
}

/// Transaction category of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Withdraw,
    Gather,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdraw => "withdraw",
            Self::Gather => "gather",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A withdrawal or gather task.
///
/// For gather tasks `amount` is overwritten with the settled sweep amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalTask {
    pub sequence_id: String,
    pub amount: Decimal,
    pub tx_type: TxType,
    pub to_address: String,
}

impl WithdrawalTask {
    pub fn withdraw(
        sequence_id: impl Into<String>,
        amount: Decimal,
        to_address: impl Into<String>,
    ) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            amount,
            tx_type: TxType::Withdraw,
            to_address: to_address.into(),
        }
    }

    pub fn gather(sequence_id: impl Into<String>, to_address: impl Into<String>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            amount: Decimal::ZERO,
            tx_type: TxType::Gather,
            to_address: to_address.into(),
        }
    }
}

/// Ledger model a builder works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Model {
    Account,
    Utxo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units_truncate() {
        let meta = CurrencyMeta::new("BTC", 50, 8);
        assert_eq!(meta.to_minor_units(dec!(0.05)), Some(5_000_000));
        assert_eq!(meta.to_minor_units(dec!(0.123456789)), Some(12_345_678));
        assert_eq!(meta.to_minor_units(dec!(-0.1)), None);
    }

    #[test]
    fn test_minor_units_overflow() {
        let meta = CurrencyMeta::new("BTC", 50, 8);
        assert_eq!(meta.to_minor_units(dec!(1000000000000)), None);

        let meta = CurrencyMeta::new("XXX", 50, 40);
        assert_eq!(meta.unit_factor(), None);
        assert_eq!(meta.to_minor_units(dec!(1)), None);
    }

    #[test]
    fn test_utxo_batch_total() {
        let batch = UtxoBatch::new(vec![
            Utxo::new("a", 0, "addr", dec!(0.1)),
            Utxo::new("b", 1, "addr", dec!(0.25)),
        ]);
        assert_eq!(batch.total_in, dec!(0.35));
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = MetadataRegistry::new().with(CurrencyMeta::new("btc", 50, 8));
        assert_eq!(registry.metadata_for("BTC").map(|m| m.precision), Some(8));
        assert!(registry.metadata_for("LTC").is_none());
    }

    #[test]
    fn test_enum_display() {
        assert_eq!(AddressClass::System.as_str(), "system");
        assert_eq!(AddressClass::Normal.to_string(), "normal");
        assert_eq!(TxType::Gather.to_string(), "gather");
    }
}
