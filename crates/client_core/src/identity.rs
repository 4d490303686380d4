//! Locally generated student identity.
//!
//! The username is created once per store and reused afterwards. Uniqueness is only
//! as good as the timestamp plus random suffix; the server does not enforce it.

use chrono::{DateTime, Utc};
use rand::Rng;
use shared::protocol::StudentIdentity;
use tracing::info;

use crate::store::{KeyValueStore, StoreError};

pub const USERNAME_KEY: &str = "username";
pub const AUTHENTICATED_KEY: &str = "isAuthenticated";
pub const ROLE_KEY: &str = "userRole";

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Fields derived from the username when building the identity sent on registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub email_domain: String,
    pub department: String,
}

impl Default for IdentityProfile {
    fn default() -> Self {
        Self {
            email_domain: "univ.edu".into(),
            department: "CSE".into(),
        }
    }
}

impl IdentityProfile {
    pub fn identity_for(&self, username: &str) -> StudentIdentity {
        StudentIdentity::from_username(username, &self.email_domain, &self.department)
    }
}

pub fn load_or_create_identity(
    store: &dyn KeyValueStore,
    profile: &IdentityProfile,
) -> Result<StudentIdentity, StoreError> {
    if let Some(username) = store
        .get_item(USERNAME_KEY)?
        .filter(|username| !username.trim().is_empty())
    {
        return Ok(profile.identity_for(&username));
    }

    let username = generate_username(Utc::now(), &mut rand::rng());
    store.set_item(USERNAME_KEY, &username)?;
    info!(username = %username, "generated new student identity");
    Ok(profile.identity_for(&username))
}

/// `student_<unix millis>_<9 base36 chars>`
pub fn generate_username<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("student_{}_{suffix}", now.timestamp_millis())
}

/// Logout. The username survives so the same identity is reused on the next session.
pub fn clear_session_flags(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.remove_item(AUTHENTICATED_KEY)?;
    store.remove_item(ROLE_KEY)?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
