//! Broker session adapters.
//!
//! - [`ManagedSession`]: the [`BrokerSession`](crate::application::ports::BrokerSession)
//!   implementation, generic over a raw [`VenueClient`]
//! - [`PaperVenue`]: deterministic in-process venue
//! - [`SessionSupervisor`]: keepalive check and reconnect loop

mod managed;
mod paper;
mod reconnect;
mod supervisor;
mod venue;

pub use managed::ManagedSession;
pub use paper::{PaperControl, PaperVenue};
pub use reconnect::ReconnectPolicy;
pub use supervisor::SessionSupervisor;
pub use venue::{QuoteTicket, VenueClient, VenueEndpoint};
