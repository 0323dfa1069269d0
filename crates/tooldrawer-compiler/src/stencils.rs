//! Component stencil loading and caching
//!
//! Every field component (`toggle`, `textfield`, …) ships a stencil
//! (`<type>.html`), an optional spec with default render context
//! (`<type>.spec.json`) and optional stylesheet and script. A
//! [`StencilSource`] knows where those live; a [`StencilCache`] memoizes
//! parsed stencils per component for the lifetime of a compiler.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use tooldrawer_core::Node;
use tooldrawer_core::stencil::Stencil;

use crate::error::{Error, Result};

/// Static asset kinds a component may ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Stylesheet
    Css,
    /// Script
    Js,
}

impl AssetKind {
    /// File extension
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Css => "css",
            AssetKind::Js => "js",
        }
    }
}

/// Raw files of one component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StencilFiles {
    /// Stencil markup
    pub html: String,
    /// Spec JSON, if the component has one
    pub spec: Option<String>,
}

/// Where component stencils come from
pub trait StencilSource: Send + Sync + fmt::Debug {
    /// Load a component's files; `Ok(None)` when it has no stencil.
    fn load(&self, component: &str) -> Result<Option<StencilFiles>>;

    /// Human-readable location of a component, for error messages
    fn location(&self, component: &str) -> String;

    /// Whether the component ships an asset of `kind`
    fn has_asset(&self, component: &str, kind: AssetKind) -> bool;
}

fn is_component_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Stencils laid out as `<root>/<type>/<type>.{html,spec.json,css,js}`
#[derive(Debug, Clone)]
pub struct FsStencilSource {
    root: PathBuf,
}

impl FsStencilSource {
    /// Source rooted at a components directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn file(&self, component: &str, extension: &str) -> PathBuf {
        self.root
            .join(component)
            .join(format!("{component}.{extension}"))
    }
}

impl StencilSource for FsStencilSource {
    fn load(&self, component: &str) -> Result<Option<StencilFiles>> {
        if !is_component_name(component) {
            return Ok(None);
        }
        let html_path = self.file(component, "html");
        if !html_path.is_file() {
            return Ok(None);
        }
        let html = std::fs::read_to_string(&html_path)?;
        let spec_path = self.file(component, "spec.json");
        let spec = if spec_path.is_file() {
            Some(std::fs::read_to_string(&spec_path)?)
        } else {
            None
        };
        Ok(Some(StencilFiles { html, spec }))
    }

    fn location(&self, component: &str) -> String {
        self.file(component, "html").display().to_string()
    }

    fn has_asset(&self, component: &str, kind: AssetKind) -> bool {
        is_component_name(component) && self.file(component, kind.extension()).is_file()
    }
}

/// In-memory stencils, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryStencilSource {
    files: HashMap<String, StencilFiles>,
    assets: HashSet<(String, AssetKind)>,
}

impl MemoryStencilSource {
    /// Empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stencil
    pub fn with_stencil(mut self, component: &str, html: &str) -> Self {
        self.files.entry(component.to_string()).or_default().html = html.to_string();
        self
    }

    /// Add a component spec
    pub fn with_spec(mut self, component: &str, spec: &str) -> Self {
        self.files.entry(component.to_string()).or_default().spec = Some(spec.to_string());
        self
    }

    /// Declare a shipped asset
    pub fn with_asset(mut self, component: &str, kind: AssetKind) -> Self {
        self.assets.insert((component.to_string(), kind));
        self
    }
}

impl StencilSource for MemoryStencilSource {
    fn load(&self, component: &str) -> Result<Option<StencilFiles>> {
        Ok(self.files.get(component).cloned())
    }

    fn location(&self, component: &str) -> String {
        format!("memory:{component}")
    }

    fn has_asset(&self, component: &str, kind: AssetKind) -> bool {
        self.assets.contains(&(component.to_string(), kind))
    }
}

/// Default render context declared by a component spec
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefaults {
    /// Base context
    #[serde(default)]
    pub context: Option<Node>,
    /// Per-size overrides, keyed by size name
    #[serde(default)]
    pub size_context: BTreeMap<String, Node>,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentSpec {
    #[serde(default)]
    defaults: Vec<ComponentDefaults>,
}

/// A loaded, parsed component
#[derive(Debug, Clone)]
pub struct ComponentStencil {
    /// Component type
    pub component: String,
    /// Parsed stencil
    pub stencil: Stencil,
    /// First defaults entry of the component spec
    pub defaults: ComponentDefaults,
}

impl ComponentStencil {
    /// Parse a component from its files
    pub fn from_files(component: &str, files: StencilFiles) -> Result<Self> {
        let spec: ComponentSpec = match files.spec.as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(|e| Error::InvalidComponentSpec {
                component: component.to_string(),
                message: e.to_string(),
            })?,
            None => ComponentSpec::default(),
        };
        Ok(Self {
            component: component.to_string(),
            stencil: Stencil::parse(&files.html),
            defaults: spec.defaults.into_iter().next().unwrap_or_default(),
        })
    }
}

/// Memoizing stencil loader shared by every compile of a [`crate::Compiler`]
#[derive(Debug)]
pub struct StencilCache {
    source: Box<dyn StencilSource>,
    entries: RwLock<HashMap<String, Arc<ComponentStencil>>>,
}

impl StencilCache {
    /// Cache over `source`
    pub fn new(source: impl StencilSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying source
    pub fn source(&self) -> &dyn StencilSource {
        self.source.as_ref()
    }

    /// Load a component, from cache when possible. A component without a
    /// stencil is an error.
    pub fn get(&self, component: &str) -> Result<Arc<ComponentStencil>> {
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(component)
        {
            tracing::debug!(component, "stencil cache hit");
            return Ok(Arc::clone(hit));
        }

        let files = self
            .source
            .load(component)?
            .ok_or_else(|| Error::MissingStencil {
                component: component.to_string(),
                location: self.source.location(component),
            })?;
        let loaded = Arc::new(ComponentStencil::from_files(component, files)?);
        tracing::debug!(component, "loaded stencil");

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            entries.entry(component.to_string()).or_insert(loaded),
        ))
    }

    /// Drop one component; returns whether it was cached
    pub fn invalidate(&self, component: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(component)
            .is_some()
    }

    /// Drop every cached component
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached components
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
