//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and directory calls into scheduling use-cases.
//! - Keep boundary layers (CLI, HTTP) decoupled from storage details.

pub mod scheduling_service;
