//! Market Calendar
//!
//! Trading hours, option expirations and strike ladders. Everything here is
//! pure and clock-injected so it can be tested without wall time.

pub mod clock;
pub mod expiration;
pub mod strikes;
pub mod trading_hours;

pub use clock::{Clock, FixedClock, SystemClock};
pub use expiration::{
    EXPIRATION_FORMAT, closest_friday, format_expiration, next_monthly_expiration,
    parse_expiration, upcoming_expirations,
};
pub use strikes::{otm_strikes, otm_target, standard_strike_interval, strikes_around_price};
pub use trading_hours::{MarketSession, classify_session, is_market_hours, to_eastern};
