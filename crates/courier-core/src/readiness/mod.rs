//! Readiness gate and bounded retry for the automation API.

mod gate;
mod retrier;
mod retry;

pub use gate::{Readiness, ReadinessGate};
pub use retrier::{Retrier, RetryPhase, RetryState};
pub use retry::RetryPolicy;
