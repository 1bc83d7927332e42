//! User profile domain model.

use crate::conversation::is_placeholder_name;
use serde::{Deserialize, Serialize};

/// A user, identified by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            name: email.clone(),
            email,
            profile_pic: None,
        }
    }

    /// Fills `name` and `profile_pic` only where they are still missing.
    ///
    /// A name equal to the email counts as missing. Blank values are ignored.
    /// Returns whether anything changed.
    pub fn fill_missing(&mut self, name: Option<&str>, profile_pic: Option<&str>) -> bool {
        let mut changed = false;
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            if is_placeholder_name(&self.name, &self.email) && name != self.name {
                self.name = name.to_string();
                changed = true;
            }
        }
        if let Some(pic) = profile_pic.map(str::trim).filter(|p| !p.is_empty()) {
            if self.profile_pic.as_deref().is_none_or(|p| p.trim().is_empty()) {
                self.profile_pic = Some(pic.to_string());
                changed = true;
            }
        }
        changed
    }

    /// The name to show for this user, never empty.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}
