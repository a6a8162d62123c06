//! Network layer - backend API calls
//!
//! The Network actor receives API commands and sends back typed results.

pub mod actor;
pub mod client;

pub use actor::NetworkActor;
pub use client::ApiClient;
