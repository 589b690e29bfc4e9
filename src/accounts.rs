use crate::models::{Account, AppData, Counters, Session, TargetsRequest};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("user already exists")]
    UserExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not authenticated")]
    Unauthenticated,
    #[error("{0}")]
    InvalidInput(&'static str),
}

/// Resets the daily count when `today` differs from the recorded active date.
///
/// Every read path goes through here so both the fetch and the delta paths
/// agree on what "today" means. Returns whether the counters changed.
pub fn roll_over(counters: &mut Counters, today: NaiveDate) -> bool {
    let today = date_key(today);
    if counters.last_active_date == today {
        return false;
    }
    counters.daily_count = 0;
    counters.last_active_date = today;
    true
}

pub fn register(
    data: &mut AppData,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<String, AccountError> {
    let username = validate_username(username)?;
    if password.is_empty() {
        return Err(AccountError::InvalidInput("password must not be empty"));
    }
    if data.accounts.contains_key(username) {
        return Err(AccountError::UserExists);
    }

    data.accounts.insert(
        username.to_string(),
        Account {
            password: password.to_string(),
            counters: Counters::default(),
        },
    );
    Ok(open_session(data, username, now))
}

pub fn login(
    data: &mut AppData,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<String, AccountError> {
    let username = username.trim();
    let matches = data
        .accounts
        .get(username)
        .is_some_and(|account| account.password == password);
    if !matches {
        return Err(AccountError::InvalidCredentials);
    }
    Ok(open_session(data, username, now))
}

pub fn logout(data: &mut AppData, session: &str) -> bool {
    data.sessions.remove(session).is_some()
}

/// Returns the current counters after applying the daily rollover, along
/// with whether the rollover changed them and they need persisting.
pub fn fetch_counters(
    data: &mut AppData,
    session: &str,
    now: DateTime<Utc>,
) -> Result<(Counters, bool), AccountError> {
    let (counters, rolled_over) = current_counters(data, session, now)?;
    Ok((counters.clone(), rolled_over))
}

pub fn apply_delta(
    data: &mut AppData,
    session: &str,
    delta: u64,
    now: DateTime<Utc>,
) -> Result<Counters, AccountError> {
    if delta == 0 {
        return Err(AccountError::InvalidInput("delta must be positive"));
    }
    let (counters, _) = current_counters(data, session, now)?;
    counters.daily_count = counters.daily_count.saturating_add(delta);
    counters.total_count = counters.total_count.saturating_add(delta);
    Ok(counters.clone())
}

pub fn update_targets(
    data: &mut AppData,
    session: &str,
    targets: TargetsRequest,
    now: DateTime<Utc>,
) -> Result<Counters, AccountError> {
    if targets.daily_target == 0 || targets.final_target == 0 {
        return Err(AccountError::InvalidInput("targets must be positive"));
    }
    let (counters, _) = current_counters(data, session, now)?;
    counters.daily_target = targets.daily_target;
    counters.final_target = targets.final_target;
    Ok(counters.clone())
}

/// Drops sessions that expired before `now`. Returns how many were removed.
pub fn prune_sessions(data: &mut AppData, now: DateTime<Utc>) -> usize {
    let before = data.sessions.len();
    data.sessions.retain(|_, session| session.expires_at > now);
    before - data.sessions.len()
}

fn current_counters<'a>(
    data: &'a mut AppData,
    session: &str,
    now: DateTime<Utc>,
) -> Result<(&'a mut Counters, bool), AccountError> {
    let username = match data.sessions.get(session) {
        Some(entry) if entry.expires_at > now => entry.username.clone(),
        _ => return Err(AccountError::Unauthenticated),
    };
    let account = data
        .accounts
        .get_mut(&username)
        .ok_or(AccountError::Unauthenticated)?;
    let rolled_over = roll_over(&mut account.counters, now.date_naive());
    Ok((&mut account.counters, rolled_over))
}

fn open_session(data: &mut AppData, username: &str, now: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    data.sessions.insert(
        token.clone(),
        Session {
            username: username.to_string(),
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        },
    );
    token
}

fn validate_username(username: &str) -> Result<&str, AccountError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AccountError::InvalidInput("username must not be empty"));
    }
    Ok(username)
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
