//! Asset manifest

use tooldrawer_core::widget::{DieterAssets, WidgetAssets};

use crate::ir::ComponentUsages;
use crate::stencils::{AssetKind, StencilSource};

/// Build the asset manifest of `widgetname`.
///
/// Component stylesheets and scripts are listed for every used component
/// the stencil source ships them for, field types before class hints.
pub fn build_widget_assets(
    base_url: &str,
    widgetname: &str,
    usages: &ComponentUsages,
    source: &dyn StencilSource,
) -> WidgetAssets {
    let root = base_url.trim_end_matches('/');
    let dieter = format!("{root}/dieter");
    let widget = format!("{root}/widgets/{widgetname}");
    let components = usages.all();

    let urls = |kind: AssetKind| {
        components
            .iter()
            .filter(|component| source.has_asset(component, kind))
            .map(|component| {
                format!(
                    "{dieter}/components/{component}/{component}.{}",
                    kind.extension()
                )
            })
            .collect::<Vec<_>>()
    };

    let mut styles = vec![format!("{dieter}/tokens/tokens.css")];
    styles.extend(urls(AssetKind::Css));

    WidgetAssets {
        html_url: format!("{widget}/widget.html"),
        css_url: format!("{widget}/widget.css"),
        js_url: format!("{widget}/widget.client.js"),
        dieter: DieterAssets {
            styles,
            scripts: urls(AssetKind::Js),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencils::MemoryStencilSource;

    #[test]
    fn test_manifest_lists_shipped_assets_only() {
        let source = MemoryStencilSource::new()
            .with_asset("toggle", AssetKind::Css)
            .with_asset("toggle", AssetKind::Js)
            .with_asset("popover", AssetKind::Css);
        let mut usages = ComponentUsages::default();
        usages.require("toggle");
        usages.require("textfield");
        usages.hint("popover");

        let assets = build_widget_assets("https://cdn.example.com//", "faq", &usages, &source);
        assert_eq!(assets.html_url, "https://cdn.example.com/widgets/faq/widget.html");
        assert_eq!(assets.js_url, "https://cdn.example.com/widgets/faq/widget.client.js");
        assert_eq!(
            assets.dieter.styles,
            vec![
                "https://cdn.example.com/dieter/tokens/tokens.css",
                "https://cdn.example.com/dieter/components/toggle/toggle.css",
                "https://cdn.example.com/dieter/components/popover/popover.css",
            ]
        );
        assert_eq!(
            assets.dieter.scripts,
            vec!["https://cdn.example.com/dieter/components/toggle/toggle.js"]
        );
    }
}
