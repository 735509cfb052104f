//! The connection registry: a single control loop that owns the live
//! session set and serializes every membership change and delivery.

pub mod control;
pub mod error;
pub mod handle;
pub mod registry;

pub use control::{Hub, HubQuery, HubStats, HubSummary};
pub use error::HubError;
pub use handle::HubHandle;
pub use registry::{FanOut, LiveSet};
