//! Game simulation modules

pub mod combat;
pub mod engine;
pub mod entity;
pub mod physics;
pub mod registry;
pub mod room;
pub mod snapshot;

pub use engine::{EngineHandle, SessionEngine};
