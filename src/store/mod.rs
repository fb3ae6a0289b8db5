pub mod entity_store;
pub mod http;
pub mod memory;
pub mod registry;
pub mod traits;

pub use entity_store::*;
pub use http::*;
pub use memory::*;
pub use registry::*;
pub use traits::*;
