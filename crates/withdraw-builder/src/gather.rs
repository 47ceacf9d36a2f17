//! Gather (sweep) transactions
//!
//! A gather spends a batch of UTXOs into a single custody output. The payout
//! is whatever the inputs carry minus the fee, so there is no target amount
//! to converge on.

use custody_core::{AddressClass, BuildError, WithdrawalTask};
use rust_decimal::Decimal;
use utxo_tx::{
    collect_batches, CapBoundedBatch, FeeMargin, FeeSchedule, SelectionPlan, SmallUtxoBatch,
};

use crate::assembler::TxAssembler;
use crate::builder::UtxoModelBuilder;

/// Share of `max_withdraw_amount` a single gather output may carry (5%)
const GATHER_OUTPUT_SHARE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Largest system-address UTXO worth sweeping, relative to the output cap (70%)
const SMALL_UTXO_SHARE: Decimal = Decimal::from_parts(7, 0, 0, false, 1);

impl<A: TxAssembler> UtxoModelBuilder<A> {
    /// Cap on each gather output
    pub fn gather_max_out_amount(&self) -> Decimal {
        self.config.max_withdraw_amount * GATHER_OUTPUT_SHARE
    }

    /// Build a sweep into `task.to_address`, overwriting `task.amount` with
    /// the swept amount.
    ///
    /// Returns `Ok(None)` when there is nothing to gather this cycle. That is
    /// not an error: unlike a withdrawal, a sweep has no obligation to move
    /// funds.
    pub fn build_gather(
        &self,
        task: &mut WithdrawalTask,
    ) -> Result<Option<A::TxInfo>, BuildError> {
        let result = self
            .retry
            .run(|margin| self.build_gather_with_margin(task, margin));
        self.alert_on_failure(task, &result);
        result
    }

    fn build_gather_with_margin(
        &self,
        task: &mut WithdrawalTask,
        margin: FeeMargin,
    ) -> Result<Option<A::TxInfo>, BuildError> {
        let schedule = self.fee_schedule(task.tx_type, margin)?;
        let plan = match self.gather_plan(&schedule) {
            Ok(Some(plan)) => plan,
            Ok(None) | Err(BuildError::EmptyInputs) => {
                tracing::debug!("Nothing to gather for {}", self.config.currency);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let inputs = plan.utxo_count();
        let mut meta = self.meta.clone();
        let fee = schedule.for_counts(inputs, 1)?;
        let fee = self.update_meta_fee(&mut meta, fee, inputs, 1, task)?;

        let total_input = plan.total_input();
        task.amount = total_input - fee;
        if task.amount < Decimal::ZERO {
            return Err(BuildError::InsufficientBalanceToCoverCost { fee, total_input });
        }

        Ok(Some(self.assembler.assemble(&meta, task, &plan)?))
    }

    /// Normal addresses first; system addresses only contribute dust
    fn gather_plan(&self, schedule: &FeeSchedule) -> Result<Option<SelectionPlan>, BuildError> {
        let max_out_amount = self.gather_max_out_amount();
        let filter_fee = schedule.one_in_one_out_fee()?;
        if filter_fee.is_zero() {
            return Err(BuildError::ZeroFee {
                inputs: 1,
                outputs: 1,
            });
        }
        let store = self.store.as_ref();

        let accounts = store.matched_accounts(filter_fee, AddressClass::Normal)?;
        if !accounts.is_empty() {
            let source = CapBoundedBatch { cap: Decimal::ZERO };
            return collect_batches(
                &accounts,
                store,
                &source,
                self.meta.max_tx_in_len,
                max_out_amount,
            )
            .map(Some);
        }

        let accounts = store.matched_accounts(filter_fee, AddressClass::System)?;
        if !accounts.is_empty() {
            let source = SmallUtxoBatch {
                max_amount: max_out_amount * SMALL_UTXO_SHARE,
            };
            return collect_batches(
                &accounts,
                store,
                &source,
                self.meta.max_tx_in_len,
                max_out_amount,
            )
            .map(Some);
        }

        Ok(None)
    }
}
