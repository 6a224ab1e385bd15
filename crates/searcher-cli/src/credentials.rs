use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::store::{StoreError, write_atomic};

/// Telegram bot settings used to decide whether and where to send notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramCredential {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default, rename = "state")]
    pub enabled: bool,
}

impl TelegramCredential {
    pub fn is_active(&self) -> bool {
        self.enabled && non_empty(self.token.as_deref()) && non_empty(self.chat_id.as_deref())
    }

    /// Key/value pairs in display order. The token is shown as stored.
    pub fn entries(&self) -> [(&'static str, String); 3] {
        [
            ("token", self.token.clone().unwrap_or_default()),
            ("chat_id", self.chat_id.clone().unwrap_or_default()),
            ("state", self.enabled.to_string()),
        ]
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

pub fn load_credential(path: &Path) -> Result<TelegramCredential, StoreError> {
    if !path.exists() {
        return Ok(TelegramCredential::default());
    }

    let payload = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_slice(&payload) {
        Ok(credential) => Ok(credential),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                %error,
                "ignoring unreadable telegram credentials"
            );
            Ok(TelegramCredential::default())
        }
    }
}

pub fn save_credential(path: &Path, credential: &TelegramCredential) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(credential).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    write_atomic(path, &payload).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "saved telegram credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> TelegramCredential {
        TelegramCredential {
            token: Some("123:abc".to_string()),
            chat_id: Some("42".to_string()),
            enabled: true,
        }
    }

    #[test]
    fn credential_load_returns_default_for_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");

        let credential =
            load_credential(&dir.path().join("telegram.credentials")).expect("load succeeds");
        assert_eq!(credential, TelegramCredential::default());
        assert!(!credential.is_active());
    }

    #[test]
    fn credential_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("telegram.credentials");

        save_credential(&path, &active()).expect("save succeeds");
        assert_eq!(load_credential(&path).expect("load succeeds"), active());
    }

    #[test]
    fn credential_persists_enabled_flag_as_state() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("telegram.credentials");

        save_credential(&path, &active()).expect("save succeeds");
        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).expect("read")).expect("json");

        assert_eq!(raw["token"], "123:abc");
        assert_eq!(raw["chat_id"], "42");
        assert_eq!(raw["state"], true);
    }

    #[test]
    fn credential_load_tolerates_garbage_content() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("telegram.credentials");
        fs::write(&path, "\u{0}\u{1}pickle").expect("fixture write");

        assert_eq!(
            load_credential(&path).expect("load succeeds"),
            TelegramCredential::default()
        );
    }

    #[test]
    fn credential_is_active_requires_token_chat_and_flag() {
        assert!(active().is_active());

        let mut disabled = active();
        disabled.enabled = false;
        assert!(!disabled.is_active());

        let mut blank_token = active();
        blank_token.token = Some("  ".to_string());
        assert!(!blank_token.is_active());

        let mut no_chat = active();
        no_chat.chat_id = None;
        assert!(!no_chat.is_active());
    }

    #[test]
    fn credential_entries_show_token_unredacted() {
        let entries = active().entries();

        assert_eq!(entries[0], ("token", "123:abc".to_string()));
        assert_eq!(entries[1], ("chat_id", "42".to_string()));
        assert_eq!(entries[2], ("state", "true".to_string()));
    }
}
