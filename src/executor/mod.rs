pub mod launcher;
pub mod safety;
