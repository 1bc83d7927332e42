//! User directory trait.

use super::model::User;
use crate::error::Result;

/// Email-keyed profile lookup shared by the migrator and the replicator.
///
/// Profiles are populated by login and signup elsewhere; this core only
/// reads them and writes back names and pictures it learns along the way,
/// never overwriting a value that is already set.
pub trait UserDirectory: Send + Sync {
    /// The signed-in user, if the session names one.
    fn current_user(&self) -> Result<Option<User>>;

    fn by_email(&self, email: &str) -> Result<Option<User>>;

    /// Ensures a record for `email` exists and fills missing profile fields.
    ///
    /// Returns the stored user, or `None` when `email` is blank.
    fn learn(
        &self,
        email: &str,
        name: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<Option<User>>;
}
