//! Shared wire protocol for the hailer control plane.

pub mod command;
pub mod control;
