pub mod loader;
pub mod encoder;

pub use loader::*;
pub use encoder::*;
