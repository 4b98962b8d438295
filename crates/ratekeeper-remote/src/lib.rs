//! Redis-backed fixed-window rate-limit backend.
//!
//! [`RemoteBackend`] runs the fixed-window increment-and-check procedure as
//! a single atomic script against a Redis-shaped store, and consults a
//! configurable [`FallbackMode`] whenever the store call fails or times out.

mod backend;
mod config;
mod events;
mod script;

pub use backend::RemoteBackend;
pub use config::{FallbackMode, RemoteBackendConfig, RemoteBackendConfigBuilder};
pub use events::RemoteBackendEvent;
