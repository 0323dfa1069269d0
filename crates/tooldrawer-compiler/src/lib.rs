//! Tooldrawer Widget Compiler
//!
//! This crate turns a widget definition (default data plus panel markup)
//! into the typed control schema the ops engine validates edits against,
//! along with the rendered editor panels and an asset manifest.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  Widget  │──▶│ Generated │──▶│  Panels  │──▶│ Controls │──▶│ Compiled │
//! │   JSON   │   │  Panels   │   │ (Parse)  │   │ (Infer)  │   │  Widget  │
//! └──────────┘   └───────────┘   └────┬─────┘   └──────────┘   └──────────┘
//!                                     │                              ▲
//!                                     └──▶ Render (stencil cache) ───┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tooldrawer_compiler::{CompileOptions, Compiler};
//!
//! let compiler = Compiler::with_stencil_dir(CompileOptions::default(), "stencils");
//! let compiled = compiler.compile_file("widgets/faq/spec.json")?;
//! println!("{} controls", compiled.controls.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assets;
pub mod compiler;
pub mod error;
pub mod infer;
pub mod ir;
pub mod modules;
pub mod parser;
pub mod render;
pub mod stencils;

pub use compiler::{CompileOptions, Compiler};
pub use error::{Error, Result};
pub use stencils::{FsStencilSource, MemoryStencilSource, StencilCache, StencilSource};
