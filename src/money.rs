use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary rounding policy: two decimal places, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Amounts never go below zero; a deduction larger than what is owed clamps.
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        Decimal::ZERO
    } else {
        value
    }
}

/// Per-installment amount for an advance of `principal` repaid over `installments`
/// equal deductions.
pub fn installment_amount(principal: Decimal, installments: i32) -> Decimal {
    round_money(principal / Decimal::from(installments))
}
