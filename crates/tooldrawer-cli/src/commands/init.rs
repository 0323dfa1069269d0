//! Initialize a new Tooldrawer project

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;
use tooldrawer_core::config::CONFIG_FILE_NAME;

/// Component stencils used by the starter widget: (type, html, css, js)
const STENCILS: [(&str, &str, Option<&str>, Option<&str>); 4] = [
    (
        "textfield",
        r#"<label class="diet-textfield diet-textfield--{{size}}"><span class="diet-textfield__label">{{label}}</span><input class="diet-textfield__field" type="text" placeholder="{{placeholder}}" data-path="{{path}}"/></label>"#,
        Some(".diet-textfield { display: grid; gap: 4px; }\n"),
        None,
    ),
    (
        "toggle",
        r#"<label class="diet-toggle" for="{{id}}"><input class="diet-toggle__input" type="checkbox" id="{{id}}"/><span class="diet-toggle__label">{{label}}</span></label>"#,
        Some(".diet-toggle { display: flex; align-items: center; }\n"),
        None,
    ),
    (
        "repeater",
        r#"<div class="diet-repeater" data-path="{{path}}" data-label-path="{{labelPath}}"><span class="diet-repeater__label">{{label}}</span><template>{{template}}</template></div>"#,
        Some(".diet-repeater { display: grid; }\n"),
        Some("document.querySelectorAll('.diet-repeater').forEach((el) => el.dataset.ready = 'true');\n"),
    ),
    (
        "dropdown-fill",
        r#"<div class="diet-dropdown-fill" data-path="{{path}}" data-allow-image="{{allowImage}}"><span class="diet-dropdown-fill__label">{{label}}</span></div>"#,
        Some(".diet-dropdown-fill { position: relative; }\n"),
        None,
    ),
];

const TEXTFIELD_SPEC: &str = r#"{
  "defaults": [
    {
      "context": { "size": "md", "placeholder": "" },
      "sizeContext": { "lg": { "placeholder": "Type here" } }
    }
  ]
}
"#;

/// Run the init command
pub fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)
            .with_context(|| format!("Failed to create {}", project_dir.display()))?;
    }

    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(CONFIG_FILE_NAME).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE_NAME
        );
    }

    tracing::info!("Creating new Tooldrawer project: {}", project_name);

    let config = format!(
        r#"# Tooldrawer Project Configuration
name: {project_name}
version: "0.1.0"

paths:
  widgets: widgets
  stencils: stencils
  output: .tooldrawer/compiled

assets:
  base_url: "http://localhost:4000"
"#
    );
    fs::write(project_dir.join(CONFIG_FILE_NAME), config)?;

    let widget_dir = project_dir.join("widgets/faq");
    fs::create_dir_all(&widget_dir)?;
    let spec = serde_json::to_string_pretty(&faq_widget())?;
    fs::write(widget_dir.join("spec.json"), spec + "\n")?;

    for (component, html, css, js) in STENCILS {
        let dir = project_dir.join("stencils").join(component);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{component}.html")), format!("{html}\n"))?;
        if let Some(css) = css {
            fs::write(dir.join(format!("{component}.css")), css)?;
        }
        if let Some(js) = js {
            fs::write(dir.join(format!("{component}.js")), js)?;
        }
    }
    fs::write(
        project_dir.join("stencils/textfield/textfield.spec.json"),
        TEXTFIELD_SPEC,
    )?;

    let gitignore = r#"# Tooldrawer compiled output
.tooldrawer/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  tooldrawer compile                         # Compile widgets");
    tracing::info!("  tooldrawer inspect --widget faq            # Show editable paths");

    Ok(())
}

/// Starter FAQ widget definition
fn faq_widget() -> serde_json::Value {
    json!({
        "widgetname": "faq",
        "displayName": "FAQ",
        "defaults": {
            "title": "Frequently asked questions",
            "showTitle": true,
            "background": "#ffffff",
            "faqs": [
                {
                    "id": "shipping",
                    "question": "Do you ship worldwide?",
                    "answer": "Yes, to most countries."
                },
                {
                    "id": "returns",
                    "question": "Can I return an order?",
                    "answer": "Within 30 days of delivery."
                }
            ]
        },
        "html": [
            "<bob-panel id='content'>",
            "  <tooldrawer-field type='textfield' path='title' label='Title' placeholder='Add a title' />",
            "  <tooldrawer-field type='toggle' path='showTitle' label='Show title' />",
            "  <tooldrawer-divider />",
            "  <tooldrawer-field type='repeater' path='faqs' label='Questions' index-token='__INDEX__' labelPath='faqs.__INDEX__.question' template='&lt;tooldrawer-field type=&quot;textfield&quot; path=&quot;faqs.__INDEX__.question&quot; label=&quot;Question&quot; /&gt;&lt;tooldrawer-field type=&quot;textfield&quot; path=&quot;faqs.__INDEX__.answer&quot; label=&quot;Answer&quot; /&gt;' />",
            "</bob-panel>",
            "<bob-panel id='layout'>",
            "  <tooldrawer-field-wgtappearance type='dropdown-fill' path='background' label='Background' />",
            "</bob-panel>"
        ],
        "normalization": {
            "idRules": [
                {"arrayPath": "faqs", "idKey": "id", "seedKey": "question", "fallbackPrefix": "faq"}
            ],
            "coerceRules": [
                {"path": "showTitle", "type": "boolean", "default": true}
            ]
        }
    })
}
