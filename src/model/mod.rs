pub mod action;
pub mod common;
pub mod entities;
pub mod meta;
pub mod state;

pub use action::*;
pub use common::*;
pub use entities::*;
pub use meta::*;
pub use state::*;
