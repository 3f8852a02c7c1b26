//! Core business logic services.

mod reconciler;

pub use reconciler::{ReconcilerConfig, ReconcilerService, SkipReason};
