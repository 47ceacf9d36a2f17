//! utxo-tx: Transaction planning utilities for UTXO-model currencies
//!
//! Provides fee estimation, UTXO selection against a converging fee, and
//! output composition for the chain-specific assemblers.

pub mod fee;
pub mod outputs;
pub mod plan;
pub mod selector;
pub mod source;

pub use fee::{FeeEstimator, FeeMargin, FeeSchedule, TxWeights};
pub use outputs::{collect_outputs, compose_outputs, TxOutput};
pub use plan::{FundingInput, SelectionPlan};
pub use selector::{collect_batches, select_for_cost, Selection};
pub use source::{CapBoundedBatch, CostTargeted, SmallUtxoBatch, UtxoBatchSource};
