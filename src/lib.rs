pub mod config;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod index;
pub mod math;
pub mod message;
pub mod reconcile;
pub mod report;
pub mod scene;

pub use config::MirrorConfig;
pub use error::{MirrorError, Result};
pub use reconcile::{Issue, Outcome, Reconciler};
