//! Chain-specific transaction assembly

use custody_core::{AssembleError, BuilderConfig, CurrencyMeta, Utxo, WithdrawalTask};
use rust_decimal::Decimal;
use serde::Serialize;
use utxo_tx::{collect_outputs, SelectionPlan, TxOutput};

/// Turns a selection plan into a chain transaction.
///
/// Implementations report a fee the network will not relay as
/// [`AssembleError::FeeNotEnough`] so the builder can retry with a larger
/// margin.
pub trait TxAssembler: Send + Sync {
    type TxInfo;

    fn supports(&self, currency: &str) -> bool;

    fn assemble(
        &self,
        meta: &CurrencyMeta,
        task: &WithdrawalTask,
        plan: &SelectionPlan,
    ) -> Result<Self::TxInfo, AssembleError>;
}

/// Unsigned transfer: the inputs to spend and the outputs to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsignedTransfer {
    pub sequence_id: String,
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<TxOutput>,
    pub fee: Decimal,
}

impl UnsignedTransfer {
    /// Sum of output values in minor units
    pub fn output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

/// Chain-agnostic assembler producing an [`UnsignedTransfer`] for a signer
#[derive(Debug, Clone)]
pub struct TransferAssembler {
    currency: String,
    change_address: String,
}

impl TransferAssembler {
    pub fn new(currency: impl Into<String>, change_address: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            change_address: change_address.into(),
        }
    }

    /// Assembler for `config.currency` returning change to `config.change_address`
    pub fn from_config(config: &BuilderConfig) -> Self {
        Self::new(config.currency.clone(), config.change_address.clone())
    }
}

impl TxAssembler for TransferAssembler {
    type TxInfo = UnsignedTransfer;

    fn supports(&self, currency: &str) -> bool {
        self.currency.eq_ignore_ascii_case(currency)
    }

    fn assemble(
        &self,
        meta: &CurrencyMeta,
        task: &WithdrawalTask,
        plan: &SelectionPlan,
    ) -> Result<UnsignedTransfer, AssembleError> {
        let outputs = collect_outputs(
            plan.total_input(),
            task.amount,
            plan.max_out_amount(),
            &task.to_address,
            &self.change_address,
            meta,
        )
        .map_err(|e| AssembleError::Failed {
            message: e.to_string(),
        })?;

        if outputs.is_empty() {
            return Err(AssembleError::Failed {
                message: format!("task {} produced no outputs", task.sequence_id),
            });
        }

        Ok(UnsignedTransfer {
            sequence_id: task.sequence_id.clone(),
            inputs: plan.utxos().cloned().collect(),
            outputs,
            fee: meta.fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_core::{Account, AddressClass, UtxoBatch};
    use rust_decimal_macros::dec;
    use utxo_tx::FundingInput;

    fn plan(amounts: &[Decimal], cap: Decimal) -> SelectionPlan {
        let utxos = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Utxo::new(format!("tx{i}"), 0, "sys", *a))
            .collect();
        SelectionPlan::new(
            vec![FundingInput::new(
                Account::new("sys", dec!(100), AddressClass::System),
                UtxoBatch::new(utxos),
            )],
            cap,
        )
    }

    fn meta(fee: Decimal) -> CurrencyMeta {
        CurrencyMeta {
            fee,
            ..CurrencyMeta::new("BTC", 50, 8)
        }
    }

    #[test]
    fn test_assemble_withdraw_with_change() {
        let assembler = TransferAssembler::new("BTC", "1Change");
        let task = WithdrawalTask::withdraw("w1", dec!(0.3), "1Dest");
        let tx = assembler
            .assemble(&meta(dec!(0.001)), &task, &plan(&[dec!(0.6), dec!(0.4)], dec!(0)))
            .unwrap();

        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].address, "1Dest");
        assert_eq!(tx.outputs[1].value, 69_900_000);
        assert_eq!(tx.output_value(), 99_900_000);
        assert_eq!(tx.fee, dec!(0.001));
    }

    #[test]
    fn test_change_address_from_config() {
        let config = BuilderConfig {
            currency: "LTC".into(),
            change_address: "ltc1change".into(),
            ..BuilderConfig::default()
        };
        let assembler = TransferAssembler::from_config(&config);
        assert!(assembler.supports("ltc"));

        let task = WithdrawalTask::withdraw("w3", dec!(0.3), "ltc1dest");
        let tx = assembler
            .assemble(&meta(dec!(0.001)), &task, &plan(&[dec!(1)], dec!(0)))
            .unwrap();
        assert_eq!(tx.outputs[1].address, "ltc1change");
    }

    #[test]
    fn test_supports_is_case_insensitive() {
        let assembler = TransferAssembler::new("BTC", "1Change");
        assert!(assembler.supports("btc"));
        assert!(!assembler.supports("LTC"));
    }

    #[test]
    fn test_unsigned_transfer_serializes() {
        let assembler = TransferAssembler::new("BTC", "1Change");
        let task = WithdrawalTask::withdraw("w2", dec!(0.1), "1Dest");
        let tx = assembler
            .assemble(&meta(dec!(0.001)), &task, &plan(&[dec!(0.101)], dec!(0)))
            .unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["sequence_id"], "w2");
        assert_eq!(json["outputs"][0]["value"], 10_000_000);
    }

    #[test]
    fn test_no_outputs_is_failure() {
        let assembler = TransferAssembler::new("BTC", "1Change");
        let task = WithdrawalTask::gather("g1", "1Dest");
        let err = assembler
            .assemble(&meta(dec!(0.001)), &task, &plan(&[dec!(0.001)], dec!(0)))
            .unwrap_err();
        assert!(matches!(err, AssembleError::Failed { .. }));
    }
}
