//! JavaScript evaluated inside the rendered page.

/// Scrolls to the bottom and reports the new document height.
pub const SCROLL_TO_BOTTOM: &str = r#"
    (() => {
        window.scrollTo(0, document.body.scrollHeight);
        return document.body.scrollHeight;
    })()
"#;

/// Current document height; the cheap "did anything load" signal.
pub const DOCUMENT_HEIGHT: &str = "document.body.scrollHeight";

fn js_string_list(values: &[String]) -> String {
    values
        .iter()
        .map(|s| format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Clicks the first button under `scope` whose caption contains one of `labels`.
///
/// Evaluates to `true` when a button was clicked.
pub fn load_more_script(labels: &[String], scope: &str) -> String {
    let labels = js_string_list(labels);
    let scope = js_string_list(&[scope.to_string()]);

    format!(
        r#"
        (() => {{
            const labels = [{labels}];
            const scopes = (() => {{
                try {{ return document.querySelectorAll({scope}); }} catch (e) {{ return []; }}
            }})();
            const roots = scopes.length > 0 ? Array.from(scopes) : [document];
            for (const root of roots) {{
                for (const button of root.querySelectorAll('button')) {{
                    const caption = (button.innerText || '').trim();
                    if (labels.some(label => caption.includes(label))) {{
                        button.click();
                        return true;
                    }}
                }}
            }}
            return false;
        }})()
        "#
    )
}
