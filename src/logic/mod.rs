pub mod edit;
pub mod lifecycle;
pub mod pagination;
pub mod relation;

pub use edit::*;
pub use pagination::*;
pub use relation::*;
