//! Session negotiation against the control plane.
//!
//! Negotiation retries with a fixed delay; the resulting session is wrapped
//! in a [`SessionLease`] so it is terminated on every exit path.

mod lease;
mod negotiator;
mod request;

pub use lease::SessionLease;
pub use negotiator::{NegotiateError, negotiate};
pub use request::SessionRequest;
