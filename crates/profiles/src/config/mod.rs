pub mod components;
pub mod loader;
pub mod registry;
