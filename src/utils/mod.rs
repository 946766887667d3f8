mod error;
mod logging;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AgentError, BackendError, DeliveryError, Result};
pub use logging::init_tracing;
pub use types::*;
