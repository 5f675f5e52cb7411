//! In-process TTL check table.
//!
//! # States
//! - Passing: node eligible for selection
//! - Failing: node excluded from selection until marked passing again
//!
//! # Design Decisions
//! - Checks must be registered before they can be updated, like agent TTL checks
//! - Unregistered checks read as passing so unknown nodes are never starved
//! - State changes logged for observability

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;

use crate::health::{HealthError, HealthReporter};

/// Check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passing,
    Failing,
}

/// Current state of a single check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub status: CheckStatus,
    /// Reason given with the last update.
    pub note: String,
    /// Unix timestamp (ms) of the last update.
    pub updated_at_ms: u64,
}

impl CheckRecord {
    fn new(status: CheckStatus, note: &str) -> Self {
        Self {
            status,
            note: note.to_string(),
            updated_at_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Thread-safe table of TTL checks.
#[derive(Debug, Default)]
pub struct HealthTable {
    checks: DashMap<String, CheckRecord>,
}

impl HealthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check as passing. Re-registering keeps the current state.
    pub fn register(&self, check_ref: &str) {
        self.checks
            .entry(check_ref.to_string())
            .or_insert_with(|| CheckRecord::new(CheckStatus::Passing, "registered"));
    }

    pub fn status(&self, check_ref: &str) -> Option<CheckStatus> {
        self.checks.get(check_ref).map(|record| record.status)
    }

    pub fn is_passing(&self, check_ref: &str) -> bool {
        self.status(check_ref) != Some(CheckStatus::Failing)
    }

    /// All checks, sorted by reference.
    pub fn entries(&self) -> Vec<(String, CheckRecord)> {
        let mut all: Vec<_> = self
            .checks
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    fn update(&self, check_ref: &str, status: CheckStatus, note: &str) -> Result<(), HealthError> {
        let mut record = self
            .checks
            .get_mut(check_ref)
            .ok_or_else(|| HealthError::UnknownCheck(check_ref.to_string()))?;

        if record.status != status {
            tracing::info!(check = %check_ref, from = ?record.status, to = ?status, note = %note, "Health check state change");
        }
        *record = CheckRecord::new(status, note);
        Ok(())
    }
}

#[async_trait]
impl HealthReporter for HealthTable {
    async fn mark_failing(&self, check_ref: &str, reason: &str) -> Result<(), HealthError> {
        self.update(check_ref, CheckStatus::Failing, reason)
    }

    async fn mark_passing(&self, check_ref: &str, reason: &str) -> Result<(), HealthError> {
        self.update(check_ref, CheckStatus::Passing, reason)
    }
}
