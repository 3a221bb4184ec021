pub mod trace;
pub mod auth;

pub use trace::*;
pub use auth::*;
