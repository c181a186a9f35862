//! Session Store - per-user vault state
//!
//! The conversational layer keys state by user (chat id). The core only
//! needs to read and update it, so storage sits behind `SessionStore` and
//! callers inject whichever backend they run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::logic::error::{RiskError, RiskResult};
use crate::logic::ingest::ContractId;

/// A user's answer to a rescue prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueDecision {
    Approve,
    Refuse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSession {
    pub contract: ContractId,
    pub approvals: u32,
    pub refusals: u32,
    pub last_score: Option<f64>,
    pub last_alert: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl VaultSession {
    pub fn new(contract: ContractId) -> Self {
        Self {
            contract,
            approvals: 0,
            refusals: 0,
            last_score: None,
            last_alert: None,
            updated_at: Utc::now(),
        }
    }

    pub fn record(&mut self, decision: RescueDecision) {
        match decision {
            RescueDecision::Approve => self.approvals += 1,
            RescueDecision::Refuse => self.refusals += 1,
        }
        self.updated_at = Utc::now();
    }
}

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<VaultSession>;

    fn put(&self, key: &str, session: VaultSession);

    fn remove(&self, key: &str) -> Option<VaultSession>;

    /// Apply `f` to the session under `key` in one atomic step.
    ///
    /// `f` receives `None` when no session exists. Returning `Some` stores the
    /// result. Implementations must not let another update interleave.
    fn upsert(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<VaultSession>) -> Option<VaultSession>,
    ) -> Option<VaultSession>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point `key` at `contract`. Decision counters carry over.
    fn bind(&self, key: &str, contract: ContractId) -> VaultSession {
        let fresh = VaultSession::new(contract.clone());
        let mut contract = Some(contract);
        self.upsert(key, &mut |current| {
            let target = contract.take()?;
            Some(match current {
                Some(mut existing) => {
                    if existing.contract != target {
                        existing.contract = target;
                        existing.last_score = None;
                        existing.last_alert = None;
                    }
                    existing.updated_at = Utc::now();
                    existing
                }
                None => VaultSession::new(target),
            })
        })
        .unwrap_or(fresh)
    }

    /// Count an approve/refuse answer for the bound vault
    fn record_decision(&self, key: &str, decision: RescueDecision) -> RiskResult<VaultSession> {
        self.upsert(key, &mut |current| {
            current.map(|mut session| {
                session.record(decision);
                session
            })
        })
        .ok_or_else(|| RiskError::InvalidContract(format!("no vault bound for session '{}'", key)))
    }

    /// Remember the latest score and alert for the bound vault
    fn record_assessment(&self, key: &str, score: f64, alert: bool) -> Option<VaultSession> {
        self.upsert(key, &mut |current| {
            current.map(|mut session| {
                session.last_score = Some(score);
                session.last_alert = Some(alert);
                session.updated_at = Utc::now();
                session
            })
        })
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, VaultSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<VaultSession> {
        self.sessions.read().get(key).cloned()
    }

    fn put(&self, key: &str, session: VaultSession) {
        self.sessions.write().insert(key.to_string(), session);
    }

    fn remove(&self, key: &str) -> Option<VaultSession> {
        self.sessions.write().remove(key)
    }

    fn upsert(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<VaultSession>) -> Option<VaultSession>,
    ) -> Option<VaultSession> {
        let mut sessions = self.sessions.write();
        let updated = f(sessions.get(key).cloned())?;
        sessions.insert(key.to_string(), updated.clone());
        Some(updated)
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
