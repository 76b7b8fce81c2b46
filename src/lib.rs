//! Bookshelf application library
//!
//! Wires the books module into the kernel registry and exposes the entry
//! points shared by the server binary and the CLI.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{build_registry, migrate, openapi_document, serve};
