//! Selection plan handed to chain-specific assemblers

use custody_core::{Account, Utxo, UtxoBatch};
use rust_decimal::Decimal;
use serde::Serialize;

/// UTXOs spent from one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingInput {
    pub account: Account,
    pub utxos: Vec<Utxo>,
    /// Sum of `utxos`
    pub cost: Decimal,
}

impl FundingInput {
    pub fn new(account: Account, batch: UtxoBatch) -> Self {
        Self {
            account,
            cost: batch.total_in,
            utxos: batch.utxos,
        }
    }
}

/// Inputs chosen for one build attempt.
///
/// A plan is frozen once constructed; assemblers only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionPlan {
    inputs: Vec<FundingInput>,
    total_input: Decimal,
    max_out_amount: Decimal,
}

impl SelectionPlan {
    pub fn new(inputs: Vec<FundingInput>, max_out_amount: Decimal) -> Self {
        let total_input = inputs.iter().map(|i| i.cost).sum();
        Self {
            inputs,
            total_input,
            max_out_amount,
        }
    }

    pub fn inputs(&self) -> &[FundingInput] {
        &self.inputs
    }

    pub fn total_input(&self) -> Decimal {
        self.total_input
    }

    /// Cap on any single payout output, zero when uncapped
    pub fn max_out_amount(&self) -> Decimal {
        self.max_out_amount
    }

    pub fn utxo_count(&self) -> usize {
        self.inputs.iter().map(|i| i.utxos.len()).sum()
    }

    pub fn utxos(&self) -> impl Iterator<Item = &Utxo> {
        self.inputs.iter().flat_map(|i| i.utxos.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
