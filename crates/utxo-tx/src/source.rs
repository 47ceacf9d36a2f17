//! Named strategies for pulling UTXO batches out of the store

use custody_core::{Account, AccountStore, StoreError, UtxoBatch};
use rust_decimal::Decimal;

/// Decides which of an account's UTXOs the selector gets to see
pub trait UtxoBatchSource {
    fn name(&self) -> &'static str;

    /// Fetch at most `limit` UTXOs of `account`.
    ///
    /// `remaining_cost` is what the selector still has to fund; batch sources
    /// that sweep rather than fund may ignore it.
    fn fetch(
        &self,
        store: &dyn AccountStore,
        account: &Account,
        remaining_cost: Decimal,
        limit: usize,
    ) -> Result<Option<UtxoBatch>, StoreError>;
}

/// Largest-first UTXOs for funding a withdrawal, leaving room for per-input fees
#[derive(Debug, Clone, Copy, Default)]
pub struct CostTargeted;

impl UtxoBatchSource for CostTargeted {
    fn name(&self) -> &'static str {
        "cost-targeted"
    }

    fn fetch(
        &self,
        store: &dyn AccountStore,
        account: &Account,
        remaining_cost: Decimal,
        limit: usize,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        store.select_utxos_for_cost(&account.address, remaining_cost, limit, true)
    }
}

/// Sweep batch whose total stays within `cap` (zero = only bounded by count)
#[derive(Debug, Clone, Copy)]
pub struct CapBoundedBatch {
    pub cap: Decimal,
}

impl UtxoBatchSource for CapBoundedBatch {
    fn name(&self) -> &'static str {
        "cap-bounded-batch"
    }

    fn fetch(
        &self,
        store: &dyn AccountStore,
        account: &Account,
        _remaining_cost: Decimal,
        limit: usize,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        store.select_utxos_batch(&account.address, self.cap, limit)
    }
}

/// Sweep batch made only of UTXOs no larger than `max_amount`
#[derive(Debug, Clone, Copy)]
pub struct SmallUtxoBatch {
    pub max_amount: Decimal,
}

impl UtxoBatchSource for SmallUtxoBatch {
    fn name(&self) -> &'static str {
        "small-utxo-batch"
    }

    fn fetch(
        &self,
        store: &dyn AccountStore,
        account: &Account,
        _remaining_cost: Decimal,
        limit: usize,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        store.select_small_utxos(&account.address, self.max_amount, limit)
    }
}
