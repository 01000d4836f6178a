use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::id::EntityId;

/// The account the cache belongs to.
///
/// Note and label mutation (and the note sync pass) require an active
/// entitlement; the engine checks it proactively rather than waiting for a
/// remote rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: EntityId,
    pub email: String,
    pub full_name: String,
    /// Entitlement expiry, `None` for a base account.
    pub entitled_until: Option<NaiveDateTime>,
}

impl Account {
    pub fn new(id: EntityId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: String::new(),
            entitled_until: None,
        }
    }

    pub fn is_entitled(&self) -> bool {
        self.entitled_until
            .is_some_and(|until| chrono::Local::now().naive_local() < until)
    }
}
