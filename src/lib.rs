//! Shared infrastructure of the Fantasy Legend client and server.
//!
//! Two independent services live here:
//! - [`log`]: leveled records dispatched to console, file and callback sinks,
//!   optionally through an async queue, with rotating and self-expiring log
//!   files.
//! - [`config`]: typed key/value settings layered over system, application and
//!   user scopes, loaded from and saved to named documents on disk, with change
//!   listeners, schemas and hot reload.
//!
//! The config manager reports through a [`log::Logger`]; the log core does not
//! depend on config.

/// Layered configuration store and its file formats.
pub mod config;
/// Logging facade, sinks and macros.
pub mod log;
