//! Declarative belt content: loads belt types and world settings from data
//! files and turns them into a ready-to-use [`beltway_core::registry::BeltRegistry`].

pub mod loader;
pub mod schema;

pub use loader::{ConveyorData, DataLoadError, load_conveyor_data};
