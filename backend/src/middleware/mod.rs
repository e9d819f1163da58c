//! Request middleware: trace scoping, panic recovery and rate limiting.

pub mod rate_limit;
pub mod recover;
pub mod trace;

pub use rate_limit::{RateLimit, RateLimitConfig, RateLimitStore};
pub use recover::{Recover, install_panic_hook};
pub use trace::{TRACE_ID_HEADER, Trace};
