pub mod types;
pub mod raster;
pub mod layout;
pub mod drag;
pub mod transform;
pub mod extract;
pub mod session;

pub use types::*;
pub use raster::*;
pub use layout::*;
pub use drag::*;
pub use transform::*;
pub use extract::*;
pub use session::*;
