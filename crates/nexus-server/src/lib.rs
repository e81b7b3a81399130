//! # nexus-server
//!
//! HTTP server library for the nexus beacon-proximity attendance system.
//!
//! This library provides the API handlers and state management for nexus.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod api;
pub mod logging;
pub mod state;
