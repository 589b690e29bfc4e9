use crate::accounts::AccountError;
use crate::errors::AppError;
use crate::models::AppData;
use crate::storage::persist_data;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

/// Account data shared by every handler. Built once in `main`; the mutex
/// serializes each read-rollover-write so deltas apply atomically per user.
#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, data: AppData) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Applies `change` and persists the result. Memory only moves forward
    /// once the snapshot is on disk, so a request that failed to persist
    /// leaves nothing behind for a retry to stack on.
    pub async fn commit<T>(
        &self,
        change: impl FnOnce(&mut AppData) -> Result<T, AccountError>,
    ) -> Result<T, AppError> {
        self.commit_if_changed(|data| change(data).map(|value| (value, true)))
            .await
    }

    /// Like [`commit`](Self::commit), but `change` reports whether it
    /// modified anything; untouched data is neither written nor swapped in.
    pub async fn commit_if_changed<T>(
        &self,
        change: impl FnOnce(&mut AppData) -> Result<(T, bool), AccountError>,
    ) -> Result<T, AppError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let (value, changed) = change(&mut next)?;
        if changed {
            persist_data(&self.data_path, &next).await?;
            *data = next;
        }
        Ok(value)
    }
}
