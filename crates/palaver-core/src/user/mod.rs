//! User domain module.
//!
//! - `model`: the `User` profile record
//! - `directory`: lookup and first-write-wins learning of profiles

mod directory;
mod model;

pub use directory::UserDirectory;
pub use model::User;
