//! Withdrawals funded from system addresses

use custody_core::{AddressClass, BuildError, WithdrawalTask};
use rust_decimal::Decimal;
use utxo_tx::{select_for_cost, CostTargeted, FeeMargin};

use crate::assembler::TxAssembler;
use crate::builder::UtxoModelBuilder;

impl<A: TxAssembler> UtxoModelBuilder<A> {
    /// Build a withdrawal of `task.amount` to `task.to_address`.
    ///
    /// System accounts are spent smallest balance first, which drains
    /// low-balance addresses before touching large ones.
    pub fn build_withdraw(&self, task: &WithdrawalTask) -> Result<A::TxInfo, BuildError> {
        if task.amount <= Decimal::ZERO {
            return Err(BuildError::InvalidAmount {
                amount: task.amount,
            });
        }

        let result = self
            .retry
            .run(|margin| self.build_withdraw_with_margin(task, margin));
        self.alert_on_failure(task, &result);
        result
    }

    fn build_withdraw_with_margin(
        &self,
        task: &WithdrawalTask,
        margin: FeeMargin,
    ) -> Result<A::TxInfo, BuildError> {
        let schedule = self.fee_schedule(task.tx_type, margin)?;
        let filter_fee = schedule.one_in_one_out_fee()?;
        if filter_fee.is_zero() {
            return Err(BuildError::ZeroFee {
                inputs: 1,
                outputs: 1,
            });
        }

        let accounts = self
            .store
            .matched_accounts(filter_fee, AddressClass::System)?;
        let accounts = self
            .store
            .sort_accounts_by_balance(accounts)
            .ok_or(BuildError::InsufficientFeeBalance { filter_fee })?;

        let mut meta = self.meta.clone();
        let selection = select_for_cost(
            &accounts,
            task.amount,
            &meta,
            &schedule,
            self.store.as_ref(),
            &CostTargeted,
            Decimal::ZERO,
        )?;

        let fee = self.update_meta_fee(
            &mut meta,
            selection.fee,
            selection.input_count,
            selection.output_count,
            task,
        )?;
        let total_input = selection.plan.total_input();
        if total_input < task.amount + fee {
            return Err(BuildError::InsufficientBalanceToCoverCost { fee, total_input });
        }

        Ok(self.assembler.assemble(&meta, task, &selection.plan)?)
    }
}
