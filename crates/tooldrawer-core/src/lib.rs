//! Tooldrawer Core Library
//!
//! This crate provides the runtime half of Tooldrawer:
//! - Project configuration loading
//! - Compiled widget data model
//! - The persistent JSON tree and path helpers
//! - Value coercion and whole-tree validation
//! - The atomic op engine and the localization overlay engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Compiled   │────▶│  Op Engine  │────▶│  Validated  │
//! │  Controls   │     │ (per batch) │     │  Instance   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲
//!                     ┌──────┴──────┐
//!                     │  Overlays   │
//!                     │ (allowlist) │
//!                     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tooldrawer_core::{CompiledWidget, Node, OpsEngine};
//!
//! let widget: CompiledWidget = serde_json::from_str(&compiled_json)?;
//! let result = OpsEngine::new(&widget.controls).apply(&instance, &ops);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coerce;
pub mod config;
pub mod css;
pub mod error;
pub mod matcher;
pub mod normalization;
pub mod ops;
pub mod overlay;
pub mod paths;
pub mod stencil;
pub mod tree;
pub mod typography;
pub mod validate;
pub mod widget;

pub use coerce::{CoercionMode, ControlValue, coerce_value};
pub use config::{Config, ProjectConfig};
pub use error::{Error, Result};
pub use matcher::ControlMatcher;
pub use normalization::{NormalizationSpec, apply_normalization};
pub use ops::{OpError, OpsEngine, OpsResult, ValidationPolicy, WidgetOp, apply_widget_ops};
pub use overlay::{AllowlistEntry, LocalizationOp, apply_overlay_ops};
pub use tree::Node;
pub use validate::{DataViolation, validate_widget_data};
pub use widget::{CompiledControl, CompiledPanel, CompiledWidget, ControlKind, WidgetSpec};
