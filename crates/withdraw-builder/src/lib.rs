//! withdraw-builder: Withdraw and gather orchestration for UTXO currencies
//!
//! [`UtxoModelBuilder`] picks funding accounts, runs coin selection, settles
//! the fee and hands the plan to a chain-specific [`TxAssembler`]. A fee the
//! chain rejects as too low is retried once with a larger margin; balance
//! shortfalls are reported through a [`Notifier`].

pub mod alarm;
pub mod assembler;
pub mod builder;
pub mod gather;
pub mod retry;
pub mod withdraw;

#[cfg(test)]
mod test_support;

pub use alarm::{AlertDispatcher, LogNotifier, Notifier, NotifyError};
pub use assembler::{TransferAssembler, TxAssembler, UnsignedTransfer};
pub use builder::{BuilderParts, UtxoModelBuilder};
pub use retry::FeeRetry;
