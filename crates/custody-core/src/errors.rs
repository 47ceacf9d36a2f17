//! Error types for the withdrawal builder

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while building a single withdraw or gather transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Transfer amount must be greater than zero, got {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("No spendable inputs were selected")]
    EmptyInputs,

    #[error("No system account balance covers the one-in-one-out fee {filter_fee}")]
    InsufficientFeeBalance { filter_fee: Decimal },

    #[error("Insufficient balance: selected inputs {total_input} do not cover amount plus fee {fee}")]
    InsufficientBalance { fee: Decimal, total_input: Decimal },

    #[error("Insufficient balance to cover cost: total input {total_input}, fee {fee}")]
    InsufficientBalanceToCoverCost { fee: Decimal, total_input: Decimal },

    #[error("Fee not enough: {message}")]
    FeeNotEnough { message: String },

    #[error("Account {address} has a balance but no spendable UTXOs")]
    UtxoMismatch { address: String },

    #[error("Account {address} balance {balance} is below its selected UTXO total {total_in}")]
    BalanceMismatch {
        address: String,
        balance: Decimal,
        total_in: Decimal,
    },

    #[error("Transaction fee is zero for {inputs} inputs and {outputs} outputs")]
    ZeroFee { inputs: usize, outputs: usize },

    #[error("Fee for {inputs} inputs and {outputs} outputs at rate {rate} is not representable")]
    FeeOverflow {
        inputs: usize,
        outputs: usize,
        rate: Decimal,
    },

    #[error("Amount {amount} can not be expressed in minor units")]
    AmountOutOfRange { amount: Decimal },

    #[error("Fee rate error: {0}")]
    FeeRate(#[from] FeeRateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to assemble transaction: {message}")]
    Assembly { message: String },
}

/// Discriminant of [`BuildError`], used by retry and alert logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAmount,
    EmptyInputs,
    InsufficientFeeBalance,
    InsufficientBalance,
    InsufficientBalanceToCoverCost,
    FeeNotEnough,
    UtxoMismatch,
    BalanceMismatch,
    ZeroFee,
    FeeOverflow,
    AmountOutOfRange,
    FeeRate,
    Store,
    Assembly,
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::EmptyInputs => ErrorKind::EmptyInputs,
            Self::InsufficientFeeBalance { .. } => ErrorKind::InsufficientFeeBalance,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::InsufficientBalanceToCoverCost { .. } => {
                ErrorKind::InsufficientBalanceToCoverCost
            }
            Self::FeeNotEnough { .. } => ErrorKind::FeeNotEnough,
            Self::UtxoMismatch { .. } => ErrorKind::UtxoMismatch,
            Self::BalanceMismatch { .. } => ErrorKind::BalanceMismatch,
            Self::ZeroFee { .. } => ErrorKind::ZeroFee,
            Self::FeeOverflow { .. } => ErrorKind::FeeOverflow,
            Self::AmountOutOfRange { .. } => ErrorKind::AmountOutOfRange,
            Self::FeeRate(_) => ErrorKind::FeeRate,
            Self::Store(_) => ErrorKind::Store,
            Self::Assembly { .. } => ErrorKind::Assembly,
        }
    }

    /// Get a stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidAmount => "invalid_amount",
            ErrorKind::EmptyInputs => "empty_inputs",
            ErrorKind::InsufficientFeeBalance => "insufficient_fee_balance",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::InsufficientBalanceToCoverCost => "insufficient_balance_to_cover_cost",
            ErrorKind::FeeNotEnough => "fee_not_enough",
            ErrorKind::UtxoMismatch => "utxo_mismatch",
            ErrorKind::BalanceMismatch => "balance_mismatch",
            ErrorKind::ZeroFee => "zero_fee",
            ErrorKind::FeeOverflow => "fee_overflow",
            ErrorKind::AmountOutOfRange => "amount_out_of_range",
            ErrorKind::FeeRate => "fee_rate",
            ErrorKind::Store => "store",
            ErrorKind::Assembly => "assembly",
        }
    }

    /// Balance shortfalls are reported to operators in addition to the caller
    pub fn is_alertable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InsufficientFeeBalance
                | ErrorKind::InsufficientBalance
                | ErrorKind::InsufficientBalanceToCoverCost
        )
    }

    /// Only a chain-reported fee underestimate is worth rebuilding
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::FeeNotEnough
    }

    /// Operator-facing alert text for alertable errors
    pub fn alert_detail(&self) -> Option<String> {
        match self {
            Self::InsufficientFeeBalance { filter_fee } => Some(format!(
                "No system address holds enough balance to pay fee {}",
                filter_fee
            )),
            Self::InsufficientBalance { fee, total_input } => Some(format!(
                "Selected UTXOs total {} is not enough for withdraw amount and fee {}",
                total_input, fee
            )),
            Self::InsufficientBalanceToCoverCost { fee, total_input } => Some(format!(
                "Balance {} is less than cost, fee {}",
                total_input, fee
            )),
            _ => None,
        }
    }
}

/// Account/UTXO store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store query failed: {message}")]
    Query { message: String },
}

/// Fee-rate source failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeRateError {
    #[error("No fee rate configured for {tx_type}")]
    Missing { tx_type: String },

    #[error("Invalid fee rate {rate} for {tx_type}")]
    Invalid { tx_type: String, rate: Decimal },
}

/// Failures reported by a chain-specific transaction assembler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// The chain rejected the assembled fee as too low
    #[error("{message}")]
    FeeNotEnough { message: String },

    #[error("{message}")]
    Failed { message: String },
}

impl From<AssembleError> for BuildError {
    fn from(err: AssembleError) -> Self {
        match err {
            AssembleError::FeeNotEnough { message } => Self::FeeNotEnough { message },
            AssembleError::Failed { message } => Self::Assembly { message },
        }
    }
}

/// Builder construction errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No metadata registered for currency {currency}")]
    MissingMetadata { currency: String },

    #[error("Assembler does not support currency {currency}")]
    UnsupportedCurrency { currency: String },

    #[error("Retry fee margin {bumped} must be greater than base margin {base}")]
    MarginNotIncreasing { base: Decimal, bumped: Decimal },

    #[error("Fee margin {0} must not be negative")]
    NegativeMargin(Decimal),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;
