use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_DAILY_TARGET: u64 = 100;
pub const DEFAULT_FINAL_TARGET: u64 = 10_000;

/// Authoritative counters for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub daily_count: u64,
    pub total_count: u64,
    /// `YYYY-MM-DD` of the day `daily_count` belongs to, empty before first use.
    #[serde(default)]
    pub last_active_date: String,
    pub daily_target: u64,
    pub final_target: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            daily_count: 0,
            total_count: 0,
            last_active_date: String::new(),
            daily_target: DEFAULT_DAILY_TARGET,
            final_target: DEFAULT_FINAL_TARGET,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub password: String,
    #[serde(default)]
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeltaRequest {
    pub delta: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetsRequest {
    pub daily_target: u64,
    pub final_target: u64,
}
