//! SHELF application library: the books module and application bootstrap.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{migrate, Application};
