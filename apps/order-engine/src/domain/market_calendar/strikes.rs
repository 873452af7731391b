//! Strike ladders around an underlying price.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::domain::order_execution::OptionRight;

/// `count` strikes spaced `interval` apart, centred on the lattice point
/// nearest `price`.
///
/// The ladder holds `(count - 1) / 2` strikes below the centre and is
/// shifted up so every strike is positive. Returns an empty ladder when
/// `count` is zero, `price`/`interval` are not positive, or the ladder does
/// not fit in a `Decimal`.
#[must_use]
pub fn strikes_around_price(price: Decimal, interval: Decimal, count: usize) -> Vec<Decimal> {
    if count == 0 || interval <= Decimal::ZERO || price <= Decimal::ZERO {
        return Vec::new();
    }
    ladder(price, interval, count).unwrap_or_default()
}

fn ladder(price: Decimal, interval: Decimal, count: usize) -> Option<Vec<Decimal>> {
    let center = price
        .checked_div(interval)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(interval)?;
    let below = Decimal::from((count - 1) / 2);
    let mut lowest = center.checked_sub(interval.checked_mul(below)?)?;
    while lowest <= Decimal::ZERO {
        lowest = lowest.checked_add(interval)?;
    }

    (0..count)
        .map(|step| {
            interval
                .checked_mul(Decimal::from(step))
                .and_then(|offset| lowest.checked_add(offset))
        })
        .collect()
}

/// Conventional listed strike spacing for an underlying trading at `price`.
#[must_use]
pub fn standard_strike_interval(price: Decimal) -> Decimal {
    if price < dec!(25) {
        dec!(0.5)
    } else if price < dec!(200) {
        dec!(2.5)
    } else {
        dec!(5)
    }
}

/// The price `otm_percent` away from `price` in the out-of-the-money
/// direction: below for puts, above for calls.
#[must_use]
pub fn otm_target(price: Decimal, right: OptionRight, otm_percent: Decimal) -> Option<Decimal> {
    let shift = price.checked_mul(otm_percent)?.checked_div(dec!(100))?;
    match right {
        OptionRight::Put => price.checked_sub(shift),
        OptionRight::Call => price.checked_add(shift),
    }
}

/// Up to `count` listed strikes around the `otm_percent` target, keeping
/// only strikes strictly out of the money.
#[must_use]
pub fn otm_strikes(
    price: Decimal,
    right: OptionRight,
    otm_percent: Decimal,
    count: usize,
) -> Vec<Decimal> {
    let Some(target) = otm_target(price, right, otm_percent) else {
        return Vec::new();
    };
    strikes_around_price(target, standard_strike_interval(price), count)
        .into_iter()
        .filter(|strike| match right {
            OptionRight::Put => *strike < price,
            OptionRight::Call => *strike > price,
        })
        .collect()
}
