//! Pull-event reader
//!
//! - SliceReader: strict pull parser over decoded input
//! - Events: event types consumed by the DOM builder

pub mod events;
pub mod slice;
