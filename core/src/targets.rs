//! Tracing target names shared across the workspace so the in-app console
//! can filter per subsystem.

pub const UI: &str = "ui";
pub const STORE: &str = "store";
pub const AUTH: &str = "auth";
pub const WORKFLOW: &str = "workflow";
pub const CONFIG: &str = "config";
