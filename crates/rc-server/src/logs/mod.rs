//! Session log fan-out

mod registry;

pub use registry::{LogRegistry, LogSubscription, SubscriberId};
