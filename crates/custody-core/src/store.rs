//! Account and UTXO store interface
//!
//! The builder never owns persistence. It queries accounts and spendable
//! UTXOs through [`AccountStore`]; [`InMemoryAccountStore`] backs tests and
//! local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use crate::{Account, AddressClass, StoreError, Utxo, UtxoBatch};

/// Query surface over custodial accounts and their UTXOs.
///
/// Selection queries return `Ok(None)` when the address has nothing to offer
/// for the request.
pub trait AccountStore: Send + Sync {
    /// Accounts of `class` whose balance is at least `min_balance`
    fn matched_accounts(
        &self,
        min_balance: Decimal,
        class: AddressClass,
    ) -> Result<Vec<Account>, StoreError>;

    /// UTXOs for funding `target_cost`, largest first, at most `max_count`.
    ///
    /// With `with_fee_margin` the store returns the full ordered candidate
    /// list up to `max_count` and lets the caller stop once fees converge;
    /// the coin selector always asks for this mode. Without it the store
    /// returns the shortest prefix whose total reaches `target_cost`, for
    /// callers that already know the fee (consolidation tools, audits).
    fn select_utxos_for_cost(
        &self,
        address: &str,
        target_cost: Decimal,
        max_count: usize,
        with_fee_margin: bool,
    ) -> Result<Option<UtxoBatch>, StoreError>;

    /// Smallest-first batch whose total stays within `cap` (0 = no cap)
    fn select_utxos_batch(
        &self,
        address: &str,
        cap: Decimal,
        max_count: usize,
    ) -> Result<Option<UtxoBatch>, StoreError>;

    /// Smallest-first batch of UTXOs no larger than `max_amount`
    fn select_small_utxos(
        &self,
        address: &str,
        max_amount: Decimal,
        max_count: usize,
    ) -> Result<Option<UtxoBatch>, StoreError>;

    /// Order accounts by ascending balance; `None` when there are none
    fn sort_accounts_by_balance(&self, mut accounts: Vec<Account>) -> Option<Vec<Account>> {
        if accounts.is_empty() {
            return None;
        }
        accounts.sort_by(|a, b| a.balance.cmp(&b.balance));
        Some(accounts)
    }
}

#[derive(Debug, Default)]
struct Ledger {
    accounts: Vec<Account>,
    utxos: HashMap<String, Vec<Utxo>>,
}

/// In-process store keeping accounts in insertion order
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    ledger: RwLock<Ledger>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with an explicit booked balance
    pub fn add_account(&self, account: Account) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write().map_err(poisoned)?;
        ledger.accounts.retain(|a| a.address != account.address);
        ledger.accounts.push(account);
        Ok(())
    }

    /// Register an account whose balance equals the sum of `amounts`
    pub fn add_funded_account(
        &self,
        address: &str,
        class: AddressClass,
        amounts: &[Decimal],
    ) -> Result<(), StoreError> {
        let balance = amounts.iter().copied().sum();
        self.add_account(Account::new(address, balance, class))?;
        for (i, amount) in amounts.iter().enumerate() {
            self.add_utxo(Utxo::new(
                format!("{}-{}", address, i),
                i as u32,
                address,
                *amount,
            ))?;
        }
        Ok(())
    }

    pub fn add_utxo(&self, utxo: Utxo) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write().map_err(poisoned)?;
        ledger
            .utxos
            .entry(utxo.address.clone())
            .or_default()
            .push(utxo);
        Ok(())
    }

    fn utxos_of(&self, address: &str) -> Result<Vec<Utxo>, StoreError> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger.utxos.get(address).cloned().unwrap_or_default())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable {
        reason: "ledger lock poisoned".to_string(),
    }
}

fn non_empty(utxos: Vec<Utxo>) -> Option<UtxoBatch> {
    if utxos.is_empty() {
        None
    } else {
        Some(UtxoBatch::new(utxos))
    }
}

impl AccountStore for InMemoryAccountStore {
    fn matched_accounts(
        &self,
        min_balance: Decimal,
        class: AddressClass,
    ) -> Result<Vec<Account>, StoreError> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger
            .accounts
            .iter()
            .filter(|a| a.class == class && a.balance >= min_balance)
            .cloned()
            .collect())
    }

    fn select_utxos_for_cost(
        &self,
        address: &str,
        target_cost: Decimal,
        max_count: usize,
        with_fee_margin: bool,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        let mut utxos = self.utxos_of(address)?;
        utxos.sort_by(|a, b| b.amount.cmp(&a.amount));
        utxos.truncate(max_count);

        if !with_fee_margin {
            let mut total = Decimal::ZERO;
            let mut keep = 0;
            for utxo in &utxos {
                if total >= target_cost {
                    break;
                }
                total += utxo.amount;
                keep += 1;
            }
            utxos.truncate(keep);
        }

        Ok(non_empty(utxos))
    }

    fn select_utxos_batch(
        &self,
        address: &str,
        cap: Decimal,
        max_count: usize,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        let mut utxos = self.utxos_of(address)?;
        utxos.sort_by(|a, b| a.amount.cmp(&b.amount));

        let mut selected = Vec::new();
        let mut total = Decimal::ZERO;
        for utxo in utxos {
            if selected.len() >= max_count {
                break;
            }
            if cap > Decimal::ZERO && total + utxo.amount > cap {
                break;
            }
            total += utxo.amount;
            selected.push(utxo);
        }

        Ok(non_empty(selected))
    }

    fn select_small_utxos(
        &self,
        address: &str,
        max_amount: Decimal,
        max_count: usize,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        let mut utxos: Vec<Utxo> = self
            .utxos_of(address)?
            .into_iter()
            .filter(|u| u.amount <= max_amount)
            .collect();
        utxos.sort_by(|a, b| a.amount.cmp(&b.amount));
        utxos.truncate(max_count);

        Ok(non_empty(utxos))
    }
}
