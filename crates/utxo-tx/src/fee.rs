//! Size-based fee estimation
//!
//! Fees are computed from a virtual transaction size
//! (`inputs * W_in + outputs * W_out`), the network fee rate and a float-up
//! margin. The result is quantized to 6 decimal places by formatting and
//! re-parsing, so binary floating point never leaks into decimal amounts.

use std::str::FromStr;

use custody_core::{BuildError, ConfigError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Byte weight of a P2PKH input
pub const DEFAULT_INPUT_WEIGHT: u64 = 148;

/// Byte weight of a P2PKH output
pub const DEFAULT_OUTPUT_WEIGHT: u64 = 43;

/// Satoshi to coin
pub const DEFAULT_UNIT_SCALE: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Safety multiplier over the raw estimate, as a fraction (0.1 = +10%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeMargin(Decimal);

impl FeeMargin {
    pub const ZERO: FeeMargin = FeeMargin(Decimal::ZERO);

    pub fn new(fraction: Decimal) -> Result<Self, ConfigError> {
        if fraction.is_sign_negative() && !fraction.is_zero() {
            return Err(ConfigError::NegativeMargin(fraction));
        }
        Ok(Self(fraction))
    }

    pub fn fraction(&self) -> Decimal {
        self.0
    }

    /// `1 + fraction`
    pub fn multiplier(&self) -> Decimal {
        Decimal::ONE + self.0
    }
}

/// Per-input and per-output size weights of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxWeights {
    pub input: u64,
    pub output: u64,
}

impl Default for TxWeights {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT_WEIGHT,
            output: DEFAULT_OUTPUT_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimator {
    weights: TxWeights,
    unit_scale: Decimal,
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(TxWeights::default(), DEFAULT_UNIT_SCALE)
    }
}

impl FeeEstimator {
    pub fn new(weights: TxWeights, unit_scale: Decimal) -> Self {
        Self {
            weights,
            unit_scale,
        }
    }

    pub fn weights(&self) -> TxWeights {
        self.weights
    }

    /// Virtual size of a transaction with the given shape
    pub fn size(&self, inputs: usize, outputs: usize) -> u64 {
        inputs as u64 * self.weights.input + outputs as u64 * self.weights.output
    }

    /// Estimated fee in display units, rounded to 6 decimal places.
    ///
    /// `fee_rate` is in minor units per byte. Returns `None` when the product
    /// is not representable.
    pub fn estimate(
        &self,
        inputs: usize,
        outputs: usize,
        fee_rate: Decimal,
        margin: FeeMargin,
    ) -> Option<Decimal> {
        let raw = Decimal::from(self.size(inputs, outputs))
            .checked_mul(fee_rate)?
            .checked_mul(margin.multiplier())?
            .checked_mul(self.unit_scale)?;

        let quantized = format!("{:.6}", raw.to_f64()?);
        Decimal::from_str(&quantized).ok()
    }
}

/// Fee estimator bound to one build attempt's rate and margin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    estimator: FeeEstimator,
    rate: Decimal,
    margin: FeeMargin,
}

impl FeeSchedule {
    pub fn new(estimator: FeeEstimator, rate: Decimal, margin: FeeMargin) -> Self {
        Self {
            estimator,
            rate,
            margin,
        }
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn margin(&self) -> FeeMargin {
        self.margin
    }

    pub fn for_counts(&self, inputs: usize, outputs: usize) -> Result<Decimal, BuildError> {
        self.estimator
            .estimate(inputs, outputs, self.rate, self.margin)
            .ok_or(BuildError::FeeOverflow {
                inputs,
                outputs,
                rate: self.rate,
            })
    }

    pub fn one_input_fee(&self) -> Result<Decimal, BuildError> {
        self.for_counts(1, 0)
    }

    pub fn one_output_fee(&self) -> Result<Decimal, BuildError> {
        self.for_counts(0, 1)
    }

    pub fn one_in_one_out_fee(&self) -> Result<Decimal, BuildError> {
        self.for_counts(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn margin(fraction: Decimal) -> FeeMargin {
        FeeMargin::new(fraction).unwrap()
    }

    #[test]
    fn test_estimate_matches_size_formula() {
        let est = FeeEstimator::default();
        // (1*148 + 2*43) * 20 * 1.1 * 1e-8 = 0.00005148
        assert_eq!(est.estimate(1, 2, dec!(20), margin(dec!(0.1))), Some(dec!(0.000051)));
        // (3*148 + 1*43) * 50 * 1.5 * 1e-8 = 0.00036525
        assert_eq!(est.estimate(3, 1, dec!(50), margin(dec!(0.5))), Some(dec!(0.000365)));
        // (1*148 + 1*43) * 100 * 1.0 * 1e-8 = 0.000191
        assert_eq!(est.estimate(1, 1, dec!(100), FeeMargin::ZERO), Some(dec!(0.000191)));
    }

    #[test]
    fn test_estimate_against_exact_rounding() {
        let est = FeeEstimator::default();
        for (i, o, rate) in [(1, 1, 7), (4, 2, 13), (10, 1, 33), (0, 1, 250), (20, 2, 3)] {
            let rate = Decimal::from(rate);
            let m = margin(dec!(0.1));
            let exact = Decimal::from(i * 148 + o * 43) * rate * dec!(1.1) * dec!(0.00000001);
            assert_eq!(
                est.estimate(i, o, rate, m),
                Some(exact.round_dp(6)),
                "({i}, {o}, {rate})"
            );
        }
    }

    #[test]
    fn test_estimate_monotonic_in_counts() {
        let est = FeeEstimator::default();
        let m = margin(dec!(0.1));
        let rate = dec!(37);
        for outputs in 0..4 {
            let mut prev = Decimal::ZERO;
            for inputs in 0..60 {
                let fee = est.estimate(inputs, outputs, rate, m).unwrap();
                assert!(fee >= prev);
                prev = fee;
            }
        }
        for inputs in 0..4 {
            let mut prev = Decimal::ZERO;
            for outputs in 0..60 {
                let fee = est.estimate(inputs, outputs, rate, m).unwrap();
                assert!(fee >= prev);
                prev = fee;
            }
        }
    }

    #[test]
    fn test_larger_margin_never_cheaper() {
        let est = FeeEstimator::default();
        let low = est.estimate(5, 2, dec!(40), margin(dec!(0.1))).unwrap();
        let high = est.estimate(5, 2, dec!(40), margin(dec!(0.5))).unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_schedule_helpers() {
        let schedule = FeeSchedule::new(FeeEstimator::default(), dec!(100), FeeMargin::ZERO);
        assert_eq!(schedule.one_input_fee(), Ok(dec!(0.000148)));
        assert_eq!(schedule.one_output_fee(), Ok(dec!(0.000043)));
        assert_eq!(schedule.one_in_one_out_fee(), Ok(dec!(0.000191)));
        assert_eq!(schedule.for_counts(0, 0), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_unrepresentable_fee_is_an_error() {
        let schedule = FeeSchedule::new(FeeEstimator::default(), Decimal::MAX, FeeMargin::ZERO);
        assert_eq!(
            schedule.one_in_one_out_fee(),
            Err(BuildError::FeeOverflow {
                inputs: 1,
                outputs: 1,
                rate: Decimal::MAX,
            })
        );
        assert_eq!(
            FeeEstimator::default().estimate(1, 1, Decimal::MAX, FeeMargin::ZERO),
            None
        );
    }

    #[test]
    fn test_negative_margin_rejected() {
        assert!(FeeMargin::new(dec!(-0.1)).is_err());
        assert_eq!(margin(dec!(0.25)).multiplier(), dec!(1.25));
    }
}
