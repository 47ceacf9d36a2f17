//! UTXO-model transaction builder
//!
//! Holds one currency's metadata template and the collaborators a build
//! needs. Every build attempt works on a fresh clone of the metadata and a
//! fee schedule scoped to that attempt, so builds never share mutable state.

use std::sync::Arc;

use custody_core::{
    AccountStore, BuildError, BuilderConfig, ConfigError, CurrencyMeta, FeeRateSource,
    MetadataLookup, Model, TxType, WithdrawalTask,
};
use rust_decimal::Decimal;
use utxo_tx::{FeeEstimator, FeeMargin, FeeSchedule};

use crate::alarm::{AlertDispatcher, Notifier};
use crate::assembler::TxAssembler;
use crate::retry::FeeRetry;

/// Collaborators injected into a [`UtxoModelBuilder`]
pub struct BuilderParts<A> {
    pub assembler: A,
    pub store: Arc<dyn AccountStore>,
    pub fee_rates: Arc<dyn FeeRateSource>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct UtxoModelBuilder<A> {
    pub(crate) config: Arc<BuilderConfig>,
    pub(crate) meta: CurrencyMeta,
    pub(crate) assembler: A,
    pub(crate) store: Arc<dyn AccountStore>,
    pub(crate) fee_rates: Arc<dyn FeeRateSource>,
    pub(crate) estimator: FeeEstimator,
    pub(crate) retry: FeeRetry,
    pub(crate) alerts: AlertDispatcher,
}

impl<A: TxAssembler> UtxoModelBuilder<A> {
    /// Create a builder for `config.currency`.
    ///
    /// Fails when the currency has no metadata, the assembler does not
    /// support it, or the retry margin does not exceed the base margin.
    pub fn new(
        config: BuilderConfig,
        metadata: &dyn MetadataLookup,
        parts: BuilderParts<A>,
    ) -> Result<Self, ConfigError> {
        let meta = metadata.metadata_for(&config.currency).ok_or_else(|| {
            ConfigError::MissingMetadata {
                currency: config.currency.clone(),
            }
        })?;

        if !parts.assembler.supports(&config.currency) {
            return Err(ConfigError::UnsupportedCurrency {
                currency: config.currency.clone(),
            });
        }

        let retry = FeeRetry::from_config(&config)?;
        let config = Arc::new(config);

        Ok(Self {
            alerts: AlertDispatcher::new(parts.notifier, Arc::clone(&config)),
            config,
            meta,
            assembler: parts.assembler,
            store: parts.store,
            fee_rates: parts.fee_rates,
            estimator: FeeEstimator::default(),
            retry,
        })
    }

    /// Replace the default size weights and unit scale
    pub fn with_estimator(mut self, estimator: FeeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn model(&self) -> Model {
        Model::Utxo
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Metadata template; build attempts work on clones of it
    pub fn meta(&self) -> &CurrencyMeta {
        &self.meta
    }

    pub fn retry_policy(&self) -> FeeRetry {
        self.retry
    }

    /// Fee schedule for one attempt at the current network rate
    pub fn fee_schedule(
        &self,
        tx_type: TxType,
        margin: FeeMargin,
    ) -> Result<FeeSchedule, BuildError> {
        let rate = self.fee_rates.transaction_fee_rate(tx_type, &self.config)?;
        Ok(FeeSchedule::new(self.estimator, rate, margin))
    }

    pub fn estimate_trans_fee(
        &self,
        inputs: usize,
        outputs: usize,
        tx_type: TxType,
        margin: FeeMargin,
    ) -> Result<Decimal, BuildError> {
        self.fee_schedule(tx_type, margin)?.for_counts(inputs, outputs)
    }

    /// Minimum balance a funding account needs to be worth spending from
    pub fn one_in_one_out_fee(
        &self,
        tx_type: TxType,
        margin: FeeMargin,
    ) -> Result<Decimal, BuildError> {
        self.fee_schedule(tx_type, margin)?.one_in_one_out_fee()
    }

    /// Write the settled fee for the realized transaction shape into `meta`
    pub(crate) fn update_meta_fee(
        &self,
        meta: &mut CurrencyMeta,
        fee: Decimal,
        inputs: usize,
        outputs: usize,
        task: &WithdrawalTask,
    ) -> Result<Decimal, BuildError> {
        if fee.is_zero() {
            return Err(BuildError::ZeroFee { inputs, outputs });
        }

        tracing::info!(
            "Task {} sequence [{}], amount [{}], uses {} inputs and {} outputs, pays {} {}",
            task.tx_type,
            task.sequence_id,
            task.amount,
            inputs,
            outputs,
            fee,
            self.config.currency
        );
        meta.fee = fee;
        Ok(fee)
    }

    /// Hand `result`'s error to the alert dispatcher when it is alertable
    pub(crate) fn alert_on_failure<T>(
        &self,
        task: &WithdrawalTask,
        result: &Result<T, BuildError>,
    ) {
        if let Err(err) = result {
            self.alerts.dispatch(task, err);
        }
    }
}
