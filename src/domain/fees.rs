//! Brokerage, securities transaction tax and GST on a reward purchase.

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{Money, Quantity};
use crate::error::RewardsError;

/// Brokerage charged on the principal: 0.1 %.
pub const BROKERAGE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Securities transaction tax on the principal: 0.025 %.
pub const STT_RATE: Decimal = Decimal::from_parts(25, 0, 0, false, 5);

/// GST charged on the brokerage: 18 %.
pub const GST_ON_BROKERAGE_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Cost breakdown of acquiring `quantity` shares at `price`.
///
/// Each component is rounded to money scale on its own; the totals are
/// exact sums of the rounded components, which keeps the ledger legs
/// built from them balanced to the last paisa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    /// Execution price per share.
    pub price: Money,
    /// `price × quantity`.
    pub principal: Money,
    /// Brokerage on the principal.
    pub brokerage: Money,
    /// Securities transaction tax on the principal.
    pub stt: Money,
    /// GST on the brokerage.
    pub gst: Money,
    /// `brokerage + stt + gst`.
    pub total_fees: Money,
    /// `principal + total_fees`.
    pub total_cost: Money,
}

impl FeeBreakdown {
    /// Computes the breakdown. Pure and deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::InvalidRequest`] when the principal or any
    /// total does not fit the money range.
    pub fn compute(price: Money, quantity: Quantity) -> Result<Self, RewardsError> {
        let out_of_range = || {
            RewardsError::InvalidRequest(format!(
                "reward value {price} x {quantity} is out of range"
            ))
        };
        let principal = price.checked_mul(quantity).ok_or_else(out_of_range)?;
        let brokerage = principal.apply_rate(BROKERAGE_RATE).ok_or_else(out_of_range)?;
        let stt = principal.apply_rate(STT_RATE).ok_or_else(out_of_range)?;
        let gst = brokerage
            .apply_rate(GST_ON_BROKERAGE_RATE)
            .ok_or_else(out_of_range)?;
        let total_fees = Money::checked_sum([brokerage, stt, gst]).ok_or_else(out_of_range)?;
        let total_cost = principal.checked_add(total_fees).ok_or_else(out_of_range)?;

        Ok(Self {
            price,
            principal,
            brokerage,
            stt,
            gst,
            total_fees,
            total_cost,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn money(num: i64, scale: u32) -> Money {
        Money::new(Decimal::new(num, scale))
    }

    fn compute(price: Money, quantity: Quantity) -> FeeBreakdown {
        let Ok(fees) = FeeBreakdown::compute(price, quantity) else {
            panic!("{price} x {quantity} should be in range");
        };
        fees
    }

    #[test]
    fn rates_have_expected_values() {
        assert_eq!(BROKERAGE_RATE, Decimal::new(1, 3));
        assert_eq!(STT_RATE, Decimal::new(25, 5));
        assert_eq!(GST_ON_BROKERAGE_RATE, Decimal::new(18, 2));
    }

    #[test]
    fn price_1000_quantity_2() {
        let fees = compute(money(1000, 0), Quantity::new(Decimal::new(2, 0)));

        assert_eq!(fees.principal, money(2000, 0));
        assert_eq!(fees.brokerage, money(2, 0));
        assert_eq!(fees.stt, money(5, 1));
        assert_eq!(fees.gst, money(36, 2));
        assert_eq!(fees.total_fees, money(286, 2));
        assert_eq!(fees.total_cost, money(200_286, 2));
    }

    #[test]
    fn fractional_quantity_rounds_each_component() {
        // 2512.37 × 0.333333 = 837.455...; every component is 4dp.
        let fees = compute(money(251_237, 2), Quantity::new(Decimal::new(333_333, 6)));

        for part in [fees.principal, fees.brokerage, fees.stt, fees.gst] {
            assert!(part.amount().scale() <= 4);
        }
        assert_eq!(
            Money::checked_sum([fees.brokerage, fees.stt, fees.gst]),
            Some(fees.total_fees)
        );
        assert_eq!(fees.principal.checked_add(fees.total_fees), Some(fees.total_cost));
    }

    #[test]
    fn zero_price_has_no_fees() {
        let fees = compute(Money::ZERO, Quantity::new(Decimal::new(10, 0)));
        assert!(fees.total_fees.is_zero());
        assert!(fees.total_cost.is_zero());
    }

    #[test]
    fn oversized_reward_is_rejected_not_panicking() {
        let price = money(3500, 0);
        for quantity in [
            Decimal::from_i128_with_scale(10_i128.pow(26), 0),
            Decimal::from(10_u64.pow(13)),
        ] {
            let result = FeeBreakdown::compute(price, Quantity::new(quantity));
            assert!(
                matches!(result, Err(RewardsError::InvalidRequest(_))),
                "quantity {quantity} should be refused"
            );
        }
    }
}
