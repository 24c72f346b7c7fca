// src/ui/widgets/mod.rs

pub mod devices; // The device table.
pub mod footer; // Key bindings for the current input mode.
pub mod input; // The single-line operator prompt.
pub mod log_view; // The activity log.
pub mod summary; // Scan progress and configured subnets.
