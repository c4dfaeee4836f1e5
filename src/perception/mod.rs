pub mod annotator;
pub mod decoder;
pub mod mapper;
pub mod pipeline;
pub mod replay;
pub mod screenshot;
pub mod session;
pub mod traits;
pub mod types;
