//! Widget compiler
//!
//! Runs the whole pipeline for one widget definition: generated panels,
//! panel parsing, control inference, panel rendering, the defaults
//! self-check and the asset manifest.

use std::path::Path;
use std::sync::Arc;

use tooldrawer_core::normalization::NormalizationSpec;
use tooldrawer_core::widget::CompiledPanel;
use tooldrawer_core::{CompiledWidget, WidgetSpec, validate_widget_data};

use crate::assets::build_widget_assets;
use crate::error::{Error, Result};
use crate::infer::compile_controls;
use crate::ir::ComponentUsages;
use crate::modules::apply_generated_panels;
use crate::parser::{self, collect_class_hints, collect_field_types, panel_label, parse_panels};
use crate::render::PanelRenderer;
use crate::stencils::{FsStencilSource, StencilCache, StencilSource};

/// Options for the compiler
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Root URL of widget and component assets
    pub asset_base_url: String,

    /// Whether compiled controls must accept the widget's own defaults
    pub check_defaults: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            asset_base_url: "http://localhost:4000".to_string(),
            check_defaults: true,
        }
    }
}

/// Widget compiler
///
/// Cheap to clone; clones share one stencil cache.
#[derive(Debug, Clone)]
pub struct Compiler {
    options: CompileOptions,
    stencils: Arc<StencilCache>,
}

impl Compiler {
    /// Create a compiler over an existing stencil cache
    pub fn new(options: CompileOptions, stencils: Arc<StencilCache>) -> Self {
        Self { options, stencils }
    }

    /// Create a compiler with a fresh cache over `source`
    pub fn with_source(options: CompileOptions, source: impl StencilSource + 'static) -> Self {
        Self::new(options, Arc::new(StencilCache::new(source)))
    }

    /// Create a compiler reading stencils from a components directory
    pub fn with_stencil_dir(options: CompileOptions, dir: impl AsRef<Path>) -> Self {
        Self::with_source(options, FsStencilSource::new(dir))
    }

    /// Compiler options
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Shared stencil cache
    pub fn stencils(&self) -> &Arc<StencilCache> {
        &self.stencils
    }

    /// Compile a widget definition file
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledWidget> {
        let path = path.as_ref();
        tracing::info!("Compiling widget: {}", path.display());
        self.compile(&parser::parse_file(path)?)
    }

    /// Compile widget definition JSON
    pub fn compile_json(&self, json: &str) -> Result<CompiledWidget> {
        self.compile(&parser::parse_json(json)?)
    }

    /// Compile a parsed widget definition
    pub fn compile(&self, spec: &WidgetSpec) -> Result<CompiledWidget> {
        let normalization = spec
            .normalization
            .as_ref()
            .map(NormalizationSpec::parse)
            .transpose()?
            .flatten();

        let lines = apply_generated_panels(&spec.html, &spec.defaults);
        let sources = parse_panels(&lines.join("\n"))?;
        let controls = compile_controls(&sources, &spec.defaults)?;

        let renderer = PanelRenderer::new(&self.stencils);
        let mut usages = ComponentUsages::default();
        let mut panels = Vec::with_capacity(sources.len());
        for source in &sources {
            collect_field_types(&source.markup, &mut usages);
            collect_class_hints(&source.markup, &mut usages);
            panels.push(CompiledPanel {
                id: source.id.clone(),
                label: panel_label(&source.id),
                html: renderer.render_panel(source, &mut usages)?,
            });
        }

        if self.options.check_defaults
            && let Some(violation) = validate_widget_data(&spec.defaults, &controls).into_iter().next()
        {
            return Err(Error::InvalidDefaults {
                path: violation.path,
                message: violation.message,
            });
        }

        let assets = build_widget_assets(
            &self.options.asset_base_url,
            &spec.widgetname,
            &usages,
            self.stencils.source(),
        );

        tracing::info!(
            widget = %spec.widgetname,
            panels = panels.len(),
            controls = controls.len(),
            components = usages.required.len(),
            "compiled widget"
        );

        Ok(CompiledWidget {
            widgetname: spec.widgetname.clone(),
            display_name: spec.display_name.clone(),
            defaults: spec.defaults.clone(),
            panels,
            controls,
            presets: spec.presets.clone(),
            normalization,
            assets,
        })
    }
}
