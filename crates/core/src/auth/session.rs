//! Session state: the three identity tiers and their persisted form
//!
//! Every mutation is written through to the durable store with
//! `commit = true` before the in-memory copy changes, so a crash never leaves
//! the store behind the session. Unreadable blobs are removed on load.

use std::sync::Arc;

use intelligence_domain::constants::{
    KEY_APPLICATION_TOKEN, KEY_INTERNAL_USER_IDENTITY, KEY_INTERNAL_USER_TOKEN, KEY_USER_IDENTITY,
    KEY_USER_TOKEN,
};
use intelligence_domain::{AuthenticationToken, User};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::storage::DurableStore;

/// Identity tier owning a token slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Client-credentials token for the application itself.
    Application,
    /// SDK-provisioned service account.
    InternalUser,
    /// Real end user.
    User,
}

impl Tier {
    const fn storage_key(self) -> &'static str {
        match self {
            Self::Application => KEY_APPLICATION_TOKEN,
            Self::InternalUser => KEY_INTERNAL_USER_TOKEN,
            Self::User => KEY_USER_TOKEN,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Tiers {
    application_token: Option<AuthenticationToken>,
    internal_token: Option<AuthenticationToken>,
    user_token: Option<AuthenticationToken>,
    internal_user: Option<User>,
    user: Option<User>,
}

impl Tiers {
    const fn get(&self, tier: Tier) -> &Option<AuthenticationToken> {
        match tier {
            Tier::Application => &self.application_token,
            Tier::InternalUser => &self.internal_token,
            Tier::User => &self.user_token,
        }
    }

    fn slot(&mut self, tier: Tier) -> &mut Option<AuthenticationToken> {
        match tier {
            Tier::Application => &mut self.application_token,
            Tier::InternalUser => &mut self.internal_token,
            Tier::User => &mut self.user_token,
        }
    }
}

/// Tokens and identities for one SDK instance.
pub struct Session {
    store: Arc<dyn DurableStore>,
    tiers: RwLock<Tiers>,
}

impl Session {
    /// Restore the session from `store`.
    pub fn load(store: Arc<dyn DurableStore>) -> Self {
        let tiers = Tiers {
            application_token: load_entry(store.as_ref(), KEY_APPLICATION_TOKEN),
            internal_token: load_entry(store.as_ref(), KEY_INTERNAL_USER_TOKEN),
            user_token: load_entry(store.as_ref(), KEY_USER_TOKEN),
            internal_user: load_entry(store.as_ref(), KEY_INTERNAL_USER_IDENTITY),
            user: load_entry(store.as_ref(), KEY_USER_IDENTITY),
        };
        debug!(
            has_internal_user = tiers.internal_user.is_some(),
            has_user = tiers.user.is_some(),
            "Session loaded"
        );
        Self { store, tiers: RwLock::new(tiers) }
    }

    /// Token held by `tier`.
    pub fn token(&self, tier: Tier) -> Option<AuthenticationToken> {
        self.tiers.read().get(tier).clone()
    }

    /// Replace (or clear, with `None`) the token held by `tier`.
    pub fn set_token(&self, tier: Tier, token: Option<AuthenticationToken>) {
        let mut tiers = self.tiers.write();
        self.persist(tier.storage_key(), token.as_ref());
        *tiers.slot(tier) = token;
    }

    pub fn internal_user(&self) -> Option<User> {
        self.tiers.read().internal_user.clone()
    }

    pub fn set_internal_user(&self, user: Option<User>) {
        let mut tiers = self.tiers.write();
        self.persist(KEY_INTERNAL_USER_IDENTITY, user.as_ref());
        tiers.internal_user = user;
    }

    pub fn user(&self) -> Option<User> {
        self.tiers.read().user.clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        let mut tiers = self.tiers.write();
        self.persist(KEY_USER_IDENTITY, user.as_ref());
        tiers.user = user;
    }

    /// Forget the internal user and its token.
    pub fn clear_internal_user(&self) {
        self.set_internal_user(None);
        self.set_token(Tier::InternalUser, None);
    }

    /// Forget the real user and its token (logout).
    pub fn clear_user(&self) {
        self.set_user(None);
        self.set_token(Tier::User, None);
    }

    /// User token if present, else the internal user's token.
    pub fn current_token(&self) -> Option<AuthenticationToken> {
        let tiers = self.tiers.read();
        tiers.user_token.clone().or_else(|| tiers.internal_token.clone())
    }

    /// The real user's id if a user is signed in, else the internal user's.
    pub fn current_user_id(&self) -> Option<i64> {
        let tiers = self.tiers.read();
        match &tiers.user {
            Some(user) => user.id,
            None => tiers.internal_user.as_ref().and_then(|user| user.id),
        }
    }

    /// Whether a real user session exists.
    pub fn has_user_session(&self) -> bool {
        self.tiers.read().user_token.is_some()
    }

    fn persist<T: Serialize>(&self, key: &str, value: Option<&T>) {
        let outcome = match value {
            Some(value) => match serde_json::to_string(value) {
                Ok(json) => self.store.set(key, &json, true),
                Err(e) => {
                    warn!(key, error = %e, "Failed to serialize session entry");
                    return;
                }
            },
            None => self.store.remove(key, true),
        };
        if let Err(e) = outcome {
            warn!(key, error = %e, "Failed to persist session entry");
        }
    }
}

fn load_entry<T: DeserializeOwned>(store: &dyn DurableStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable session entry");
            if let Err(e) = store.remove(key, true) {
                warn!(key, error = %e, "Failed to remove unreadable session entry");
            }
            None
        }
    }
}
