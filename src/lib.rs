//! # plugdeck
//!
//! A terminal dashboard for a shared smart-plug backend.
//!
//! ## Features
//! - Plug table with power badge, active user count and Use/Leave controls
//! - Several users may use the same plug at once
//! - Fixed-delay polling with out-of-band refresh after every action
//! - Login/logout with a client-local token and cookie mirror
//! - Admin console: users, password reset, deletion and plug permissions
//!
//! ## Architecture
//! Actor-based with channels:
//! - UI Layer (Ratatui) - synchronous
//! - App Layer (State machine)
//! - Network Layer (Tokio runtime)

pub mod admin;
pub mod app;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod messages;
pub mod models;
pub mod network;
pub mod session;
pub mod storage;
pub mod ui;

// Re-export commonly used types
pub use models::{DeviceRecord, DeviceStatus, PlugAction, PlugStatus};
pub use dashboard::{render_table, DeviceBoard, DeviceRow, TableRow};
pub use error::{ApiError, ValidationError};
pub use session::{ClientSession, Credentials};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use messages::{UiEvent, NetworkCommand, NetworkResponse, RenderState};
pub use app::{AppState, AppActor};
pub use network::{ApiClient, NetworkActor};
