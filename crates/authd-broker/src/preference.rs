//! Per-user mode preference: the last mode a user successfully authenticated
//! with, used to break ties in mode ordering on their next session.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

#[derive(Default)]
pub struct PreferenceStore {
    last_successful: RwLock<BTreeMap<String, String>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, username: &str) -> Option<String> {
        self.last_successful.read().await.get(username).cloned()
    }

    pub async fn set(&self, username: &str, mode_id: String) {
        self.last_successful
            .write()
            .await
            .insert(username.to_string(), mode_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_has_no_preference() {
        let store = PreferenceStore::new();
        assert_eq!(store.get("user1").await, None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = PreferenceStore::new();
        store.set("user1", "pincode".to_string()).await;
        assert_eq!(store.get("user1").await.as_deref(), Some("pincode"));
    }

    #[tokio::test]
    async fn set_overwrites_the_previous_preference() {
        let store = PreferenceStore::new();
        store.set("user1", "pincode".to_string()).await;
        store.set("user1", "totp".to_string()).await;
        assert_eq!(store.get("user1").await.as_deref(), Some("totp"));
    }
}
