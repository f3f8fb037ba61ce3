//! Core business logic for TaskyFlow.
//!
//! The pure building blocks ([`thread`], [`fanout`], [`read_state`]) hold no
//! I/O and are driven by the repository-backed [`services`].

pub mod fanout;
pub mod read_state;
pub mod services;
pub mod thread;

pub use services::*;
