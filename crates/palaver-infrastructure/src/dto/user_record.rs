//! User record DTO.

use palaver_core::user::User;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One element of the `users` array.
///
/// Fields owned by other parts of the client (passwords, embedded legacy
/// threads, role flags) are carried in `rest` so that rewriting a record
/// never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecordDto {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl UserRecordDto {
    /// Embedded legacy threads (`messages: [{with, chat}]`), if present.
    pub fn inline_threads(&self) -> Option<&Value> {
        self.rest.get("messages").filter(|v| v.is_array())
    }

    /// Writes the domain fields back, leaving `rest` untouched.
    pub fn apply(&mut self, user: &User) {
        self.email = user.email.clone();
        self.name = Some(user.name.clone());
        self.profile_pic = user.profile_pic.clone();
    }
}

impl From<&UserRecordDto> for User {
    fn from(dto: &UserRecordDto) -> Self {
        User {
            email: dto.email.clone(),
            name: dto.name.clone().unwrap_or_default(),
            profile_pic: dto.profile_pic.clone().filter(|p| !p.trim().is_empty()),
        }
    }
}

impl From<&User> for UserRecordDto {
    fn from(user: &User) -> Self {
        let mut dto = UserRecordDto::default();
        dto.apply(user);
        dto
    }
}
