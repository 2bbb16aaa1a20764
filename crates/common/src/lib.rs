//! Common utilities and types for the flagship governance engine

pub mod clock;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use types::{Amount, MemberId, Timestamp};
