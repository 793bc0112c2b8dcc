//! Standalone HTML document for webview embedding
//!
//! The same script the in-process host runs, wrapped in a `srcdoc` document
//! with a content-security policy that allows inline script and styles only.
//! The browser-side `__forge_host` swaps the root's content in one assignment
//! and posts the harness report to the parent frame.

use crate::constants::reserved;
use crate::constants::sandbox::{IFRAME_SANDBOX, ROOT_ID, SCRIPT_ORIGINS, STYLE_ORIGINS};
use crate::session::Theme;

/// Content-security policy of the sandbox document
pub fn content_security_policy() -> String {
    let mut script_src = vec!["'unsafe-inline'"];
    script_src.extend_from_slice(SCRIPT_ORIGINS);
    let mut style_src = vec!["'unsafe-inline'"];
    style_src.extend_from_slice(STYLE_ORIGINS);
    format!(
        "default-src 'none'; script-src {}; style-src {}; img-src data:",
        script_src.join(" "),
        style_src.join(" ")
    )
}

/// Browser side of the host bridge the harness reports through
fn browser_host() -> String {
    format!(
        r#"var {host} = {{
  mount: function (markup) {{ document.getElementById('{root}').innerHTML = markup; }},
  report: function (report) {{
    if (window.parent && window.parent !== window) window.parent.postMessage({{ source: 'crystal-forge', report: report }}, '*');
  }}
}};"#,
        host = reserved::HOST,
        root = ROOT_ID
    )
}

/// Wrap `script` into a complete HTML document
pub fn render_document(script: &str, theme: Theme) -> String {
    let script = escape_script(script);
    let mut html = String::with_capacity(script.len() + 1024);
    html.push_str("<!DOCTYPE html>\n");
    html.push_str(&format!("<html class=\"{}\">\n<head>\n", theme.as_str()));
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<meta http-equiv=\"Content-Security-Policy\" content=\"{}\">\n",
        content_security_policy()
    ));
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    for origin in SCRIPT_ORIGINS {
        html.push_str(&format!("<script src=\"{}\"></script>\n", origin));
    }
    html.push_str(&format!(
        "<style>html,body{{margin:0;padding:0;background:{bg};color:{fg};font-family:system-ui,sans-serif}}#{root}{{padding:16px}}.forge-icon{{display:inline-flex;align-items:center;justify-content:center;line-height:1}}</style>\n",
        bg = theme.background(),
        fg = theme.foreground(),
        root = ROOT_ID
    ));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<div id=\"{}\"></div>\n", ROOT_ID));
    html.push_str("<script>\n");
    html.push_str(&browser_host());
    html.push('\n');
    html.push_str(&script);
    html.push_str("</script>\n</body>\n</html>\n");
    html
}

/// An `<iframe>` element that runs `document` with scripts allowed and
/// nothing else: no same-origin access, forms, popups or top navigation
pub fn render_iframe(document: &str) -> String {
    let srcdoc = document
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<iframe sandbox=\"{}\" title=\"Component preview\" srcdoc=\"{}\"></iframe>",
        IFRAME_SANDBOX, srcdoc
    )
}

/// Keep a literal `</script` inside the program from closing the element
fn escape_script(script: &str) -> String {
    script.replace("</script", "<\\/script").replace("<!--", "<\\!--")
}
