//! Mock collaborators shared by the builder tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use custody_core::{
    Account, AccountStore, AddressClass, AssembleError, BuildError, BuilderConfig,
    ConfiguredFeeRate, CurrencyMeta, InMemoryAccountStore, MetadataRegistry, StoreError,
    UtxoBatch, WithdrawalTask,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use utxo_tx::SelectionPlan;

use crate::alarm::{Notifier, NotifyError};
use crate::assembler::{TransferAssembler, TxAssembler, UnsignedTransfer};
use crate::builder::{BuilderParts, UtxoModelBuilder};

/// BTC at 1000 sat/byte, 10% base margin, 50% retry margin, 5 inputs max
pub fn fixture_config() -> BuilderConfig {
    BuilderConfig {
        currency: "BTC".into(),
        base_fee_float_up: dec!(0.1),
        fee_float_up: dec!(0.5),
        max_withdraw_amount: dec!(2),
        change_address: "1Change".into(),
        default_fee_rate: Some(dec!(1000)),
        ..BuilderConfig::default()
    }
}

pub fn fixture_registry() -> MetadataRegistry {
    MetadataRegistry::new().with(CurrencyMeta::new("BTC", 5, 8))
}

/// In-memory store that counts account queries
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryAccountStore,
    account_queries: AtomicUsize,
}

impl AccountStore for CountingStore {
    fn matched_accounts(
        &self,
        min_balance: Decimal,
        class: AddressClass,
    ) -> Result<Vec<Account>, StoreError> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.matched_accounts(min_balance, class)
    }

    fn select_utxos_for_cost(
        &self,
        address: &str,
        target_cost: Decimal,
        max_count: usize,
        with_fee_margin: bool,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        self.inner
            .select_utxos_for_cost(address, target_cost, max_count, with_fee_margin)
    }

    fn select_utxos_batch(
        &self,
        address: &str,
        cap: Decimal,
        max_count: usize,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        self.inner.select_utxos_batch(address, cap, max_count)
    }

    fn select_small_utxos(
        &self,
        address: &str,
        max_amount: Decimal,
        max_count: usize,
    ) -> Result<Option<UtxoBatch>, StoreError> {
        self.inner.select_small_utxos(address, max_amount, max_count)
    }
}

#[derive(Debug, Clone)]
pub struct AssembleCall {
    pub fee: Decimal,
    pub amount: Decimal,
}

/// Wraps [`TransferAssembler`], recording calls and failing the fee check a
/// configured number of times
pub struct ScriptedAssembler {
    pub inner: TransferAssembler,
    fee_failures: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<AssembleCall>>>,
}

impl TxAssembler for ScriptedAssembler {
    type TxInfo = UnsignedTransfer;

    fn supports(&self, currency: &str) -> bool {
        self.inner.supports(currency)
    }

    fn assemble(
        &self,
        meta: &CurrencyMeta,
        task: &WithdrawalTask,
        plan: &SelectionPlan,
    ) -> Result<UnsignedTransfer, AssembleError> {
        self.calls.lock().unwrap().push(AssembleCall {
            fee: meta.fee,
            amount: task.amount,
        });

        let failing = self
            .fee_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AssembleError::FeeNotEnough {
                message: "min relay fee not met".into(),
            });
        }
        self.inner.assemble(meta, task, plan)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedAlert {
    pub sequence_id: String,
    pub code: String,
    pub message: String,
}

pub struct ChannelNotifier {
    tx: Mutex<Sender<RecordedAlert>>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, Receiver<RecordedAlert>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(
        &self,
        _config: &BuilderConfig,
        task: &WithdrawalTask,
        error: &BuildError,
        message: &str,
    ) -> Result<(), NotifyError> {
        let tx = self
            .tx
            .lock()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        tx.send(RecordedAlert {
            sequence_id: task.sequence_id.clone(),
            code: error.error_code().to_string(),
            message: message.to_string(),
        })
        .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(
        &self,
        _config: &BuilderConfig,
        _task: &WithdrawalTask,
        _error: &BuildError,
        _message: &str,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unreachable".into()))
    }
}

/// Store, assembler and notifier wired together for one test
pub struct Harness {
    store: Arc<CountingStore>,
    fee_failures: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<AssembleCall>>>,
    notifier: Arc<ChannelNotifier>,
    alerts: Receiver<RecordedAlert>,
}

impl Harness {
    pub fn new() -> Self {
        let (notifier, alerts) = ChannelNotifier::new();
        Self {
            store: Arc::new(CountingStore::default()),
            fee_failures: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            notifier: Arc::new(notifier),
            alerts,
        }
    }

    pub fn fund(&self, address: &str, class: AddressClass, amounts: &[Decimal]) {
        self.store
            .inner
            .add_funded_account(address, class, amounts)
            .unwrap();
    }

    pub fn add_account(&self, account: Account) {
        self.store.inner.add_account(account).unwrap();
    }

    pub fn fail_fee_checks(&self, times: usize) {
        self.fee_failures.store(times, Ordering::SeqCst);
    }

    pub fn parts(&self) -> BuilderParts<ScriptedAssembler> {
        BuilderParts {
            assembler: ScriptedAssembler {
                inner: TransferAssembler::from_config(&fixture_config()),
                fee_failures: Arc::clone(&self.fee_failures),
                calls: Arc::clone(&self.calls),
            },
            store: self.store.clone(),
            fee_rates: Arc::new(ConfiguredFeeRate),
            notifier: self.notifier.clone(),
        }
    }

    pub fn builder(&self) -> UtxoModelBuilder<ScriptedAssembler> {
        UtxoModelBuilder::new(fixture_config(), &fixture_registry(), self.parts()).unwrap()
    }

    pub fn assemble_calls(&self) -> Vec<AssembleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn account_queries(&self) -> usize {
        self.store.account_queries.load(Ordering::SeqCst)
    }

    pub fn next_alert(&self, timeout: Duration) -> Option<RecordedAlert> {
        self.alerts.recv_timeout(timeout).ok()
    }
}
