//! Hailer daemon library.
//!
//! One persistent connection per configured IRC network, a control-plane
//! gateway that accepts announce commands, and a supervisor that ties the
//! two together with a deterministic shutdown path. Exposed as a library
//! for use in tests and embedding.

pub mod chat;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod supervisor;
pub mod worker;
