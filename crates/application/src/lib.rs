//! Application layer - Controller driver, refresh scheduling and entities

pub mod coordinator;
pub mod entity;
pub mod system;

pub use coordinator::{Coordinator, UpdateStatus};
pub use entity::{Entities, build_entities};
pub use system::DobissSystem;
