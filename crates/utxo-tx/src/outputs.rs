//! Output composition
//!
//! Splits a payout into outputs no larger than the plan's cap and returns
//! whatever the inputs carry beyond payout plus fee to the change address.

use custody_core::{BuildError, CurrencyMeta};
use rust_decimal::Decimal;
use serde::Serialize;

/// One outgoing output in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutput {
    pub address: String,
    pub value: u64,
}

fn minor_units(meta: &CurrencyMeta, amount: Decimal) -> Result<u64, BuildError> {
    meta.to_minor_units(amount)
        .ok_or(BuildError::AmountOutOfRange { amount })
}

/// Emit payout and change outputs through `add_output`.
///
/// With a positive `max_out_amount` the payout is split into cap-sized
/// outputs followed by the remainder; otherwise it is a single output.
/// Change is `total_in - main_out - meta.fee` and is only emitted when
/// strictly positive. Amounts are truncated to whole minor units.
pub fn compose_outputs<F>(
    total_in: Decimal,
    main_out: Decimal,
    max_out_amount: Decimal,
    out_address: &str,
    change_address: &str,
    meta: &CurrencyMeta,
    mut add_output: F,
) -> Result<(), BuildError>
where
    F: FnMut(&str, u64),
{
    if main_out > Decimal::ZERO {
        if max_out_amount > Decimal::ZERO {
            let full = minor_units(meta, max_out_amount)?;
            let mut amount = main_out;
            while amount > max_out_amount {
                add_output(out_address, full);
                amount -= max_out_amount;
            }
            if amount > Decimal::ZERO {
                add_output(out_address, minor_units(meta, amount)?);
            }
        } else {
            add_output(out_address, minor_units(meta, main_out)?);
        }
    }

    let cost = main_out + meta.fee;
    if total_in > cost {
        add_output(change_address, minor_units(meta, total_in - cost)?);
    }

    Ok(())
}

/// [`compose_outputs`] collected into a vector
pub fn collect_outputs(
    total_in: Decimal,
    main_out: Decimal,
    max_out_amount: Decimal,
    out_address: &str,
    change_address: &str,
    meta: &CurrencyMeta,
) -> Result<Vec<TxOutput>, BuildError> {
    let mut outputs = Vec::new();
    compose_outputs(
        total_in,
        main_out,
        max_out_amount,
        out_address,
        change_address,
        meta,
        |address, value| {
            outputs.push(TxOutput {
                address: address.to_string(),
                value,
            })
        },
    )?;
    Ok(outputs)
}
