//! User persistence collaborator.
//!
//! The core only needs id/username lookups and uniqueness on registration;
//! everything else about users belongs to whatever sits behind this trait.
//! The in-memory store is the single-process default; a relational
//! implementation would slot in behind the same seam.

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum StoreError {
    #[error("Username already taken")]
    UsernameTaken,
}

pub trait UserStore: Send + Sync {
    fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;
    fn find_by_username(&self, username: &str) -> Option<User>;
    fn find(&self, id: Uuid) -> Option<User>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    by_name: DashMap<String, User>,
    by_id: DashMap<Uuid, String>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        match self.by_name.entry(username.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::UsernameTaken),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.clone());
                self.by_id.insert(user.id, user.username.clone());
                Ok(user)
            }
        }
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        self.by_name.get(username).map(|u| u.clone())
    }

    fn find(&self, id: Uuid) -> Option<User> {
        let name = self.by_id.get(&id)?;
        self.find_by_username(name.value())
    }
}
