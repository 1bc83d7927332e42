//! User directory backed by the `users` key and the session keys.

use crate::dto::UserRecordDto;
use crate::keys;
use crate::kv::{read_json, write_json};
use palaver_core::error::Result;
use palaver_core::storage::KeyValueStore;
use palaver_core::user::{User, UserDirectory};
use serde_json::Value;
use std::sync::Arc;

/// [`UserDirectory`] over the shared key-value substrate.
///
/// `users` is a JSON array de-duplicated by email; the first record for an
/// email is the one that counts. Records this crate cannot decode are kept
/// as they are.
#[derive(Clone)]
pub struct KvUserDirectory {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for KvUserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvUserDirectory")
            .field("kv", &"<dyn KeyValueStore>")
            .finish()
    }
}

impl KvUserDirectory {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Records `user` as the signed-in user and learns their profile.
    pub fn sign_in(&self, user: &User) -> Result<User> {
        let stored = self
            .learn(&user.email, Some(user.name.as_str()), user.profile_pic.as_deref())?
            .unwrap_or_else(|| user.clone());
        write_json(self.kv.as_ref(), keys::SESSION_PROFILE, &UserRecordDto::from(&stored))?;
        self.kv.set(keys::SESSION_LOGGED_IN_USER_ID, &stored.email)?;
        tracing::info!(email = %stored.email, "Signed in");
        Ok(stored)
    }

    fn session_record(&self, key: &str) -> Result<Option<User>> {
        let Some(raw) = read_json(self.kv.as_ref(), key)? else {
            return Ok(None);
        };
        Ok(serde_json::from_value::<UserRecordDto>(raw)
            .ok()
            .filter(|dto| !dto.email.trim().is_empty())
            .map(|dto| User::from(&dto)))
    }

    fn session_user_id(&self) -> Result<Option<String>> {
        let Some(raw) = self.kv.get(keys::SESSION_LOGGED_IN_USER_ID)? else {
            return Ok(None);
        };
        // Some writers stored the id JSON-encoded, others as a bare string.
        let id = serde_json::from_str::<String>(&raw).unwrap_or(raw);
        let id = id.trim();
        Ok((!id.is_empty()).then(|| id.to_string()))
    }
}

/// Reads `users` as raw records. Anything but an array reads as empty.
pub(crate) fn user_records(kv: &dyn KeyValueStore) -> Result<Vec<Value>> {
    match read_json(kv, keys::USERS)? {
        Some(Value::Array(records)) => Ok(records),
        Some(_) => {
            tracing::warn!("Ignoring `users` value that is not a list");
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}

fn position_of(records: &[Value], email: &str) -> Option<usize> {
    records
        .iter()
        .position(|r| r.get("email").and_then(Value::as_str) == Some(email))
}

/// Threads embedded in the user record for `email` (schema 2.0.0).
pub(crate) fn inline_threads(kv: &dyn KeyValueStore, email: &str) -> Result<Option<Value>> {
    let records = user_records(kv)?;
    let Some(index) = position_of(&records, email) else {
        return Ok(None);
    };
    Ok(serde_json::from_value::<UserRecordDto>(records[index].clone())
        .ok()
        .and_then(|dto| dto.inline_threads().cloned()))
}

impl UserDirectory for KvUserDirectory {
    fn current_user(&self) -> Result<Option<User>> {
        for key in [keys::SESSION_PROFILE, keys::SESSION_LOGGED_IN_USER] {
            if let Some(user) = self.session_record(key)? {
                return Ok(Some(user));
            }
        }
        match self.session_user_id()? {
            Some(id) => self.by_email(&id),
            None => Ok(None),
        }
    }

    fn by_email(&self, email: &str) -> Result<Option<User>> {
        let records = user_records(self.kv.as_ref())?;
        Ok(position_of(&records, email)
            .and_then(|i| serde_json::from_value::<UserRecordDto>(records[i].clone()).ok())
            .map(|dto| User::from(&dto)))
    }

    fn learn(
        &self,
        email: &str,
        name: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<Option<User>> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(None);
        }

        let mut records = user_records(self.kv.as_ref())?;
        let user = match position_of(&records, email) {
            Some(index) => {
                let mut dto = match serde_json::from_value::<UserRecordDto>(records[index].clone()) {
                    Ok(dto) => dto,
                    Err(e) => {
                        tracing::warn!(email, error = %e, "Leaving undecodable user record untouched");
                        return Ok(Some(User::new(email)));
                    }
                };
                let mut user = User::from(&dto);
                if !user.fill_missing(name, profile_pic) {
                    return Ok(Some(user));
                }
                dto.apply(&user);
                records[index] = serde_json::to_value(&dto)?;
                tracing::debug!(email, "Filled missing profile fields");
                user
            }
            None => {
                let mut user = User::new(email);
                user.fill_missing(name, profile_pic);
                records.push(serde_json::to_value(UserRecordDto::from(&user))?);
                tracing::debug!(email, "Created user record");
                user
            }
        };

        write_json(self.kv.as_ref(), keys::USERS, &records)?;
        Ok(Some(user))
    }
}
