//! UTXO selection against a converging fee
//!
//! The fee of a transaction depends on how many inputs and outputs it has,
//! and the number of inputs depends on the fee. [`select_for_cost`] walks the
//! funding accounts in order and settles both at once: every consumed UTXO
//! adds one input's fee to the outstanding cost, and the first time the cost
//! goes negative a change output (and its fee) is added.

use custody_core::{Account, AccountStore, BuildError, CurrencyMeta, UtxoBatch};
use rust_decimal::Decimal;

use crate::fee::FeeSchedule;
use crate::plan::{FundingInput, SelectionPlan};
use crate::source::UtxoBatchSource;

/// Payout plus change: the most outputs the convergence loop will plan for
const MAX_CONVERGED_OUTPUTS: usize = 2;

/// Outcome of a cost-converging selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub plan: SelectionPlan,
    pub input_count: usize,
    pub output_count: usize,
    /// Fee for the realized `input_count` and `output_count`
    pub fee: Decimal,
}

/// Select inputs covering `amount` plus the fee of the resulting transaction.
///
/// `accounts` are consumed in the given order. The outstanding cost starts at
/// `amount` plus the payout output's fee.
///
/// The returned fee always pays for every output the plan can emit: a
/// single-output plan never leaves change behind. Surplus too small to
/// fund a change output is added to the fee.
pub fn select_for_cost(
    accounts: &[Account],
    amount: Decimal,
    meta: &CurrencyMeta,
    schedule: &FeeSchedule,
    store: &dyn AccountStore,
    source: &dyn UtxoBatchSource,
    max_out_amount: Decimal,
) -> Result<Selection, BuildError> {
    if amount <= Decimal::ZERO {
        return Err(BuildError::InvalidAmount { amount });
    }

    let one_input = schedule.one_input_fee()?;
    let one_output = schedule.one_output_fee()?;

    let mut cost = amount + one_output;
    let mut inputs = Vec::new();
    let mut used = 0usize;
    let mut output_count = 1usize;

    for account in accounts {
        if cost.is_zero() || cost < one_output {
            break;
        }
        let limit = meta.max_tx_in_len.saturating_sub(used);
        if limit == 0 {
            break;
        }

        let batch = source
            .fetch(store, account, cost, limit)?
            .ok_or_else(|| BuildError::UtxoMismatch {
                address: account.address.clone(),
            })?;

        let mut taken = Vec::new();
        let mut total_in = Decimal::ZERO;
        for utxo in batch.utxos {
            if cost <= one_output || taken.len() >= limit {
                break;
            }

            cost += one_input;
            cost -= utxo.amount;
            total_in += utxo.amount;
            taken.push(utxo);

            // Leftover value needs a change output, which has a fee of its own
            if cost < Decimal::ZERO && output_count < MAX_CONVERGED_OUTPUTS {
                output_count += 1;
                cost += one_output;
            }
        }

        tracing::debug!(
            "{} selected {} utxos ({}) from {}, outstanding cost {}",
            source.name(),
            taken.len(),
            total_in,
            account.address,
            cost
        );

        if taken.is_empty() {
            continue;
        }
        if account.balance < total_in {
            return Err(BuildError::BalanceMismatch {
                address: account.address.clone(),
                balance: account.balance,
                total_in,
            });
        }

        used += taken.len();
        inputs.push(FundingInput::new(
            account.clone(),
            UtxoBatch {
                utxos: taken,
                total_in,
            },
        ));

        if used >= meta.max_tx_in_len {
            break;
        }
    }

    if inputs.is_empty() {
        return Err(BuildError::EmptyInputs);
    }

    let plan = SelectionPlan::new(inputs, max_out_amount);
    let input_count = plan.utxo_count();
    let total_input = plan.total_input();
    let mut fee = schedule.for_counts(input_count, output_count)?;
    if fee.is_zero() {
        return Err(BuildError::ZeroFee {
            inputs: input_count,
            outputs: output_count,
        });
    }
    if total_input < amount + fee {
        return Err(BuildError::InsufficientBalance { fee, total_input });
    }

    // Per-count fees are rounded separately, so a single-output walk can
    // end a few minor units over.
    let surplus = total_input - amount - fee;
    if output_count == 1 && surplus > Decimal::ZERO {
        let with_change = schedule.for_counts(input_count, MAX_CONVERGED_OUTPUTS)?;
        if total_input >= amount + with_change {
            output_count = MAX_CONVERGED_OUTPUTS;
            fee = with_change;
        } else {
            fee += surplus;
        }
    }

    Ok(Selection {
        plan,
        input_count,
        output_count,
        fee,
    })
}

/// Accumulate whatever batches `source` offers until the input budget is spent.
///
/// Used by sweeps, where the payout is "everything minus fee" and there is no
/// target to converge on.
pub fn collect_batches(
    accounts: &[Account],
    store: &dyn AccountStore,
    source: &dyn UtxoBatchSource,
    max_tx_in_len: usize,
    max_out_amount: Decimal,
) -> Result<SelectionPlan, BuildError> {
    let mut inputs = Vec::new();
    let mut used = 0usize;

    for account in accounts {
        let limit = max_tx_in_len.saturating_sub(used);
        if limit == 0 {
            break;
        }

        let mut batch = match source.fetch(store, account, Decimal::ZERO, limit)? {
            Some(batch) if !batch.is_empty() => batch,
            _ => continue,
        };
        if batch.len() > limit {
            batch = UtxoBatch::new(batch.utxos.into_iter().take(limit).collect());
        }

        if account.balance < batch.total_in {
            return Err(BuildError::BalanceMismatch {
                address: account.address.clone(),
                balance: account.balance,
                total_in: batch.total_in,
            });
        }

        tracing::debug!(
            "{} collected {} utxos ({}) from {}",
            source.name(),
            batch.len(),
            batch.total_in,
            account.address
        );

        used += batch.len();
        inputs.push(FundingInput::new(account.clone(), batch));
        if used >= max_tx_in_len {
            break;
        }
    }

    if inputs.is_empty() {
        return Err(BuildError::EmptyInputs);
    }

    Ok(SelectionPlan::new(inputs, max_out_amount))
}
