//! Clausecraft: Streaming Contract Generation
//!
//! Plans a contract from a prompt, then writes it section by section over an
//! LLM provider, streaming every chunk to the caller as it arrives. Jobs can be
//! cancelled at any checkpoint, retry transient provider failures, and finished
//! documents can be rewritten by follow-up edit jobs.

pub mod cancellation;
pub mod cli;
pub mod config;
pub mod drafting;
pub mod error;
pub mod generation;
pub mod job;
pub mod logging;
pub mod provider;
pub mod retry;
pub mod server;
