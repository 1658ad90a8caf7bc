//! Monetary helpers for reported amounts.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` end to end; accumulation keeps full
//! precision and rounding happens once, when a figure leaves the engine.

use rust_decimal::Decimal;

/// Number of decimal places used for every reported monetary figure.
pub const REPORTING_SCALE: u32 = 2;

/// Rounds an accumulated amount for external reporting.
///
/// Uses Banker's Rounding (round half to even), the default strategy of
/// `Decimal::round_dp`.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(REPORTING_SCALE)
}

/// Converts a percentage rate into a multiplicative factor: `1 + rate / 100`.
#[must_use]
pub fn percent_factor(rate_pct: Decimal) -> Decimal {
    Decimal::ONE + rate_pct / Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(236), dec!(236.00))]
    #[case(dec!(10.004), dec!(10.00))]
    #[case(dec!(10.005), dec!(10.00))]
    #[case(dec!(10.015), dec!(10.02))]
    #[case(dec!(-3.333), dec!(-3.33))]
    fn test_round_money(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_money(input), expected);
    }

    #[test]
    fn test_round_money_scale() {
        assert_eq!(round_money(dec!(1.23456)).scale(), REPORTING_SCALE);
    }

    #[rstest]
    #[case(dec!(0), dec!(1))]
    #[case(dec!(18), dec!(1.18))]
    #[case(dec!(20.5), dec!(1.205))]
    #[case(dec!(100), dec!(2))]
    fn test_percent_factor(#[case] rate: Decimal, #[case] expected: Decimal) {
        assert_eq!(percent_factor(rate), expected);
    }
}
