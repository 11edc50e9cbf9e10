//! Shared infrastructure for the `tabmap` binary.

pub mod logging;
