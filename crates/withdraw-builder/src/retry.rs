//! Fee-not-enough retry policy

use custody_core::{BuildError, BuilderConfig, ConfigError};
use utxo_tx::FeeMargin;

/// Runs a build attempt with the base margin and, if the chain reported the
/// fee as too low, exactly once more with the bumped margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRetry {
    base: FeeMargin,
    bumped: FeeMargin,
}

impl FeeRetry {
    pub fn new(base: FeeMargin, bumped: FeeMargin) -> Result<Self, ConfigError> {
        if bumped <= base {
            return Err(ConfigError::MarginNotIncreasing {
                base: base.fraction(),
                bumped: bumped.fraction(),
            });
        }
        Ok(Self { base, bumped })
    }

    pub fn from_config(config: &BuilderConfig) -> Result<Self, ConfigError> {
        Self::new(
            FeeMargin::new(config.base_fee_float_up)?,
            FeeMargin::new(config.fee_float_up)?,
        )
    }

    pub fn base(&self) -> FeeMargin {
        self.base
    }

    pub fn bumped(&self) -> FeeMargin {
        self.bumped
    }

    pub fn run<T, F>(&self, mut attempt: F) -> Result<T, BuildError>
    where
        F: FnMut(FeeMargin) -> Result<T, BuildError>,
    {
        match attempt(self.base) {
            Err(err) if err.is_retryable() => {
                tracing::warn!(
                    "{}, try to rebuild with fee margin {}",
                    err,
                    self.bumped.fraction()
                );
                attempt(self.bumped)
            }
            other => other,
        }
    }
}
