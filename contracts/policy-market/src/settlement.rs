/*!
 * Settlement Arithmetic
 *
 * Fixed-point payout computations shared by policy creation, expiry
 * settlement and the read-only previews. Prices are 8-decimal fixed point,
 * percentages are basis points, and every division truncates toward zero.
 *
 * The truncation direction is part of the numeric contract: repeated
 * multiply-then-divide steps each round down, so computed payouts are never
 * larger than an infinite-precision evaluation, and the conservation
 * invariant seller + buyer == collateral is maintained by construction
 * (the buyer leg is a subtraction, never an independent computation).
 */

use crate::types::Error;

pub const BPS_DENOMINATOR: i128 = 10_000;

/// Decimal places in oracle prices.
pub const PRICE_DECIMALS: u32 = 8;

fn pow10(exp: u32) -> Result<i128, Error> {
    10i128.checked_pow(exp).ok_or(Error::Overflow)
}

/// Computes the upfront payout owed to the seller at purchase time.
///
/// The collateral's entry value is converted into payout-asset units,
/// bridging the decimal conventions of the two tokens and the 8-decimal
/// price, then discounted by `payout_bps`:
///
/// ```text
/// total_value   = amount * entry_price / 10^(collateral_decimals + 8 - payout_decimals)
/// payout_amount = total_value * payout_bps / 10000
/// ```
pub fn upfront_payout(
    amount: i128,
    entry_price: i128,
    collateral_decimals: u32,
    payout_decimals: u32,
    payout_bps: u32,
) -> Result<i128, Error> {
    let raw = amount.checked_mul(entry_price).ok_or(Error::Overflow)?;

    // Payout tokens with more decimals than collateral_decimals + 8 scale up
    // instead of down; no truncation happens on that branch.
    let total_value = if payout_decimals <= collateral_decimals + PRICE_DECIMALS {
        raw / pow10(collateral_decimals + PRICE_DECIMALS - payout_decimals)?
    } else {
        raw.checked_mul(pow10(payout_decimals - collateral_decimals - PRICE_DECIMALS)?)
            .ok_or(Error::Overflow)?
    };

    total_value
        .checked_mul(payout_bps as i128)
        .ok_or(Error::Overflow)
        .map(|v| v / BPS_DENOMINATOR)
}

/// Splits the locked collateral between seller and buyer at settlement.
///
/// The seller's upside is a bounded fraction of the price gain only, never of
/// the principal; flat or falling prices send the entire collateral to the
/// buyer. The seller leg is clamped to the collateral so the buyer leg can
/// never go negative under extreme appreciation.
///
/// Returns `(seller_payout, buyer_payout)`; the two always sum to
/// `collateral_amount` exactly.
pub fn split_collateral(
    entry_price: i128,
    exit_price: i128,
    collateral_amount: i128,
    upside_share_bps: u32,
) -> Result<(i128, i128), Error> {
    if entry_price <= 0 {
        return Err(Error::InvalidParameters);
    }
    if exit_price <= entry_price {
        return Ok((0, collateral_amount));
    }

    let price_gain_bps = (exit_price - entry_price)
        .checked_mul(BPS_DENOMINATOR)
        .ok_or(Error::Overflow)?
        / entry_price;
    let total_gain = collateral_amount
        .checked_mul(price_gain_bps)
        .ok_or(Error::Overflow)?
        / BPS_DENOMINATOR;
    let seller_payout = total_gain
        .checked_mul(upside_share_bps as i128)
        .ok_or(Error::Overflow)?
        / BPS_DENOMINATOR;

    let seller_payout = seller_payout.min(collateral_amount);
    Ok((seller_payout, collateral_amount - seller_payout))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario from the product design: 1.0 unit (7 decimals) at $3000 entry,
    // 95% payout rate, payout asset also 7 decimals.
    const ENTRY: i128 = 300_000_000_000; // $3000 * 1e8
    const ONE_UNIT: i128 = 10_000_000; // 1.0 with 7 decimals

    #[test]
    fn upfront_payout_matches_reference_scenario() {
        // 0.95 * $3000 = $2850 in 7-decimal payout units
        let payout = upfront_payout(ONE_UNIT, ENTRY, 7, 7, 9_500).unwrap();
        assert_eq!(payout, 28_500_000_000);
    }

    #[test]
    fn upfront_payout_bridges_decimal_conventions() {
        // 18-decimal collateral into a 6-decimal payout asset
        let amount = 1_000_000_000_000_000_000i128; // 1.0 with 18 decimals
        let payout = upfront_payout(amount, ENTRY, 18, 6, 10_000).unwrap();
        assert_eq!(payout, 3_000_000_000); // $3000 with 6 decimals

        // and the scale-up branch: 6-decimal collateral, 18-decimal payout
        let payout = upfront_payout(1_000_000, ENTRY, 6, 18, 10_000).unwrap();
        assert_eq!(payout, 3_000_000_000_000_000_000_000);
    }

    #[test]
    fn split_gain_scenario() {
        // $3000 -> $3600 is a 20% gain; 25% upside share
        let exit = 360_000_000_000;
        let (seller, buyer) = split_collateral(ENTRY, exit, ONE_UNIT, 2_500).unwrap();
        assert_eq!(seller, 500_000); // 0.05 units
        assert_eq!(buyer, 9_500_000); // 0.95 units
        assert_eq!(seller + buyer, ONE_UNIT);
    }

    #[test]
    fn split_flat_and_falling_prices_pay_buyer_everything() {
        let (seller, buyer) = split_collateral(ENTRY, ENTRY, ONE_UNIT, 2_500).unwrap();
        assert_eq!((seller, buyer), (0, ONE_UNIT));

        let (seller, buyer) = split_collateral(ENTRY, 280_000_000_000, ONE_UNIT, 2_500).unwrap();
        assert_eq!((seller, buyer), (0, ONE_UNIT));
    }

    #[test]
    fn split_extreme_gain_clamps_seller_to_collateral() {
        // 2000% gain with a 100% upside share would exceed the principal
        let (seller, buyer) = split_collateral(ENTRY, ENTRY * 21, ONE_UNIT, 10_000).unwrap();
        assert_eq!(seller, ONE_UNIT);
        assert_eq!(buyer, 0);
    }

    #[test]
    fn split_conserves_collateral_exactly() {
        let amounts = [1i128, 3, 999, ONE_UNIT, 123_456_789];
        let exits = [
            ENTRY + 1,
            ENTRY + ENTRY / 3,
            ENTRY * 2 - 1,
            ENTRY * 5,
        ];
        for &amount in amounts.iter() {
            for &exit in exits.iter() {
                for upside in [1u32, 777, 2_500, 9_999, 10_000] {
                    let (seller, buyer) =
                        split_collateral(ENTRY, exit, amount, upside).unwrap();
                    assert_eq!(seller + buyer, amount);
                    assert!(seller >= 0 && buyer >= 0);
                }
            }
        }
    }

    #[test]
    fn split_truncation_stays_below_high_precision_reference() {
        // The staged computation truncates twice (gain bps, then the upside
        // share). It must never exceed the single-division reference and may
        // fall short of it by at most one unit per truncation step.
        for exit in [ENTRY + 1, ENTRY + 7_777, ENTRY * 3 / 2, ENTRY * 4 + 13] {
            for upside in [1u32, 499, 2_500, 9_999] {
                let amount = 987_654_321i128;
                let (seller, _) = split_collateral(ENTRY, exit, amount, upside).unwrap();

                let reference = amount * (exit - ENTRY) / ENTRY * upside as i128
                    / BPS_DENOMINATOR;
                assert!(seller <= reference);
                // one lost unit per truncating division, scaled through the
                // following multiply
                let bound = amount / BPS_DENOMINATOR + upside as i128 / BPS_DENOMINATOR + 2;
                assert!(reference - seller <= bound);
            }
        }
    }

    #[test]
    fn split_rejects_nonpositive_entry_price() {
        assert_eq!(
            split_collateral(0, 100, ONE_UNIT, 2_500),
            Err(Error::InvalidParameters)
        );
    }
}
