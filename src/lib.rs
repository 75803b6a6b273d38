pub mod display;
pub mod events;
pub mod geometry;
pub mod handles;
pub mod input;
pub mod manipulation;
pub mod picker;
pub mod scenegraph;
pub mod selection;
pub mod tasks;
pub mod undo;

pub use manipulation::{DragMode, ManipConfig, ManipulationContext, ManipulationControl};
