pub mod content;
pub mod registry;
pub mod render;
pub mod tier;
pub mod workflow;
