//! User domain model.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Owner of submitted jobs, identified by the username from the README.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Extract first and last name from an address like `first.last@example.com`.
///
/// Returns two empty strings unless both name parts are present.
pub fn name_from_email(email: &str) -> (String, String) {
    let local_part = email.split('@').next().unwrap_or_default();
    let mut parts = local_part.split('.');

    match (parts.next(), parts.next()) {
        (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
            (first.to_string(), last.to_string())
        }
        _ => (String::new(), String::new()),
    }
}
