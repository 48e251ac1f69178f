//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams domain bus events to clients
//! that subscribe by domain key, optionally narrowed by a property filter.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
