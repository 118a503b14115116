//! `eventrelay` core: event envelope, tier classification, dispatch outcomes,
//! and wire schemas shared by every transport.

pub mod classify;
pub mod envelope;
pub mod messages;
pub mod outcome;
pub mod types;

pub use classify::{classify, RoutingConfig, Tier};
pub use envelope::{envelopes_from_wire, Envelope, EnvelopeError, WireEvent};
pub use outcome::{BatchResult, Outcome};
pub use types::{Payload, Value};

