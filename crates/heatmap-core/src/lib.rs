//! Core types, configuration, and error handling for review-heatmap.
//!
//! This crate provides the shared foundation used by all other heatmap crates:
//! - [`HeatmapError`]: unified error type using `thiserror`
//! - [`HeatmapConfig`]: configuration loaded from `.heatmap.toml`
//! - Change records as reported by the review service: [`Change`],
//!   [`PatchSet`], [`Approval`], [`PatchFile`], [`Account`], [`Dependency`],
//!   [`ChangeStatus`]

mod config;
mod error;
mod types;

pub use config::{GerritConfig, GitConfig, HeatmapConfig, TreeConfig};
pub use error::HeatmapError;
pub use types::{Account, Approval, Change, ChangeStatus, Dependency, PatchFile, PatchSet};

/// A convenience `Result` type for heatmap operations.
pub type Result<T> = std::result::Result<T, HeatmapError>;
