pub mod list;
pub mod overlay;
pub mod snapshot;
