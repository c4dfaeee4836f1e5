pub mod engine;
pub mod event_bus;
pub mod state;
