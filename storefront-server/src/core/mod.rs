//! Server core: configuration, shared state and background tasks

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::ServerState;
pub use tasks::BackgroundTasks;
