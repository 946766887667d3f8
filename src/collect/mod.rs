pub mod aws;
pub mod collector;
pub mod cost;
pub mod host;
pub mod identity;
pub mod runner;

use crate::utils::Payload;

/// A source of one payload per run. Implementations never fail: degraded
/// steps are recorded inside the payload.
pub trait Collect {
    fn collect(&self) -> Payload;
}
