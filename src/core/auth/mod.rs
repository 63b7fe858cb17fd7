// ─── Identity ───
// The authenticated player record read at launch time. This crate never
// authenticates; it only asks an `IdentityProvider` who is active.

use md5::{Digest, Md5};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const AZURE_CLIENT_ID_FALLBACK: &str = "00000000402B5328";
const OFFLINE_ACCESS_TOKEN: &str = "offline_access_token";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Offline,
    Microsoft,
}

impl AccountKind {
    /// Value bound to `${user_type}`.
    pub fn user_type(self) -> &'static str {
        match self {
            AccountKind::Offline => "legacy",
            AccountKind::Microsoft => "msa",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    pub unique_id: String,
    pub credential_token: String,
    pub account_kind: AccountKind,
    pub xuid: String,
    pub client_id: String,
}

impl Identity {
    /// Offline identity with the name-derived UUID the game itself uses.
    pub fn offline(display_name: &str) -> Self {
        let display_name = display_name.trim().to_string();
        Self {
            unique_id: offline_uuid(&display_name),
            display_name,
            credential_token: OFFLINE_ACCESS_TOKEN.into(),
            account_kind: AccountKind::Offline,
            xuid: "0".into(),
            client_id: AZURE_CLIENT_ID_FALLBACK.into(),
        }
    }

    /// Fill blank fields so every launch placeholder has a value.
    pub fn sanitized(mut self) -> Self {
        if self.display_name.trim().is_empty() {
            self.display_name = "Player".into();
        }
        if self.unique_id.trim().is_empty() {
            self.unique_id = offline_uuid(&self.display_name);
        }
        if self.credential_token.trim().is_empty() {
            self.credential_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        if self.client_id.trim().is_empty() {
            self.client_id = AZURE_CLIENT_ID_FALLBACK.into();
        }
        self
    }

    pub fn user_type(&self) -> &'static str {
        self.account_kind.user_type()
    }
}

/// Name-based (version 3) UUID of `OfflinePlayer:<name>`.
pub fn offline_uuid(display_name: &str) -> String {
    let digest = Md5::digest(format!("OfflinePlayer:{}", display_name).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    bytes[6] = (bytes[6] & 0x0f) | 0x30;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes).hyphenated().to_string()
}

/// Supplier of whichever identity is currently active.
pub trait IdentityProvider: Send + Sync {
    fn get_current_identity(&self) -> Option<Identity>;
}

/// Holds one swappable identity in memory.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    current: RwLock<Option<Identity>>,
}

impl StaticIdentityProvider {
    pub fn new(identity: Option<Identity>) -> Self {
        Self {
            current: RwLock::new(identity),
        }
    }

    pub fn set(&self, identity: Option<Identity>) {
        *self.current.write() = identity;
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn get_current_identity(&self) -> Option<Identity> {
        self.current.read().clone()
    }
}
