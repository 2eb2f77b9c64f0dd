//! Concurrent token store.
//!
//! # Layout
//! - `records`: principal name → the principal's single live token
//! - `index`: SHA-256 of a token value → principal name
//!
//! The index is only a lookup hint. A token is valid only if the record it
//! points to still holds the same value (compared in constant time) and the
//! deadline has not passed, so a stale index entry can never validate.
//!
//! # Locking
//! Every mutation of a principal's record happens under that principal's
//! `records` entry lock. Lock order is always `records` then `index`; readers
//! release the `index` guard before touching `records`.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::security::Principal;
use crate::tokens::ReissuePolicy;

const TOKEN_BYTES: usize = 32;

type TokenDigest = [u8; 32];

/// A token handed to a client.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub valid_until: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"<redacted>")
            .field("valid_until", &self.valid_until)
            .finish()
    }
}

/// How `issue` satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Generated,
    /// Existing live token handed out again with its deadline untouched.
    Reused,
    /// Existing live token handed out again with a fresh deadline.
    Renewed,
}

struct TokenRecord {
    value: String,
    digest: TokenDigest,
    principal: Principal,
    valid_until: DateTime<Utc>,
}

impl TokenRecord {
    fn issued(&self) -> IssuedToken {
        IssuedToken {
            value: self.value.clone(),
            valid_until: self.valid_until,
        }
    }
}

pub struct TokenStore {
    records: DashMap<String, TokenRecord>,
    index: DashMap<TokenDigest, String>,
    ttl: Duration,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("live", &self.records.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            index: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a fresh token for `principal`, discarding any previous one.
    pub fn generate(&self, principal: &Principal) -> IssuedToken {
        self.generate_at(principal, Utc::now())
    }

    pub fn generate_at(&self, principal: &Principal, now: DateTime<Utc>) -> IssuedToken {
        let entry = self.records.entry(principal.name().to_string());
        self.install(entry, principal, now)
    }

    /// Hand out the principal's live token, or generate one if there is none.
    pub fn issue(&self, principal: &Principal, policy: ReissuePolicy) -> (IssuedToken, IssueKind) {
        self.issue_at(principal, policy, Utc::now())
    }

    pub fn issue_at(
        &self,
        principal: &Principal,
        policy: ReissuePolicy,
        now: DateTime<Utc>,
    ) -> (IssuedToken, IssueKind) {
        match self.records.entry(principal.name().to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().valid_until > now => {
                let record = occupied.get_mut();
                let kind = match policy {
                    ReissuePolicy::Preserve => IssueKind::Reused,
                    ReissuePolicy::Renew => {
                        record.valid_until = self.deadline(now);
                        IssueKind::Renewed
                    }
                };
                (record.issued(), kind)
            }
            entry => (self.install(entry, principal, now), IssueKind::Generated),
        }
    }

    /// Return the principal bound to `value` if the token is live.
    pub fn validate(&self, value: &str) -> Option<Principal> {
        self.validate_at(value, Utc::now())
    }

    pub fn validate_at(&self, value: &str, now: DateTime<Utc>) -> Option<Principal> {
        let digest = digest_of(value);
        let name = self.index.get(&digest).map(|r| r.value().clone())?;

        let (principal, expired) = {
            let record = self.records.get(&name)?;
            let same: bool = record.value.as_bytes().ct_eq(value.as_bytes()).into();
            if !same {
                return None;
            }
            (record.principal.clone(), record.valid_until <= now)
        };

        if expired {
            self.expire(&name, &digest, now);
            return None;
        }
        Some(principal)
    }

    /// Remove the principal's token. Returns false if there was none.
    pub fn invalidate(&self, principal_name: &str) -> bool {
        match self.records.remove(principal_name) {
            Some((_, record)) => {
                self.index.remove(&record.digest);
                true
            }
            None => false,
        }
    }

    /// Drop every token whose deadline has passed; returns how many.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut expired = Vec::new();
        self.records.retain(|_, record| {
            if record.valid_until <= now {
                expired.push(record.digest);
                false
            } else {
                true
            }
        });
        for digest in &expired {
            self.index.remove(digest);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace whatever the entry holds with a brand-new token.
    fn install(
        &self,
        entry: Entry<'_, String, TokenRecord>,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> IssuedToken {
        let value = new_token_value();
        let digest = digest_of(&value);
        let record = TokenRecord {
            value,
            digest,
            principal: principal.clone(),
            valid_until: self.deadline(now),
        };
        let issued = record.issued();

        // Still holding the entry lock: index and record change together.
        self.index.insert(digest, principal.name().to_string());
        match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(record);
                self.index.remove(&previous.digest);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record);
            }
        }
        issued
    }

    fn expire(&self, name: &str, digest: &TokenDigest, now: DateTime<Utc>) {
        let removed = self
            .records
            .remove_if(name, |_, record| &record.digest == digest && record.valid_until <= now);
        if removed.is_some() {
            self.index.remove(digest);
        }
    }

    fn deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    #[cfg(test)]
    fn index_len(&self) -> usize {
        self.index.len()
    }
}

fn new_token_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn digest_of(value: &str) -> TokenDigest {
    Sha256::digest(value.as_bytes()).into()
}
