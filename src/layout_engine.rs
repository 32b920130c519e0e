pub mod effective;
pub mod engine;
mod subscriptions;

pub use effective::{EffectiveItem, compute_effective_items, effective_items_for};
pub use engine::NodeConfigEngine;
pub use subscriptions::{ChangeCallback, ConfigChange, SubscriptionId};

#[cfg(test)]
mod tests;
