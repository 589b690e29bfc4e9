pub mod accounts;
pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod storage;
pub mod sync;
pub mod ui;

pub use app::router;
pub use config::{ClientConfig, ServerConfig};
pub use state::AppState;
pub use storage::load_data;
