//! Inert-ification using lol_html for streaming HTML rewriting
//!
//! Turns a raw captured document into a sandboxed, script-free artifact:
//! no executable script element, no event-handler attribute, no resolvable
//! hyperlink target, no submittable form. Visual fidelity is preserved;
//! caller-supplied extra styles are appended last so they win the cascade.

use chrono::Utc;
use lol_html::{element, rewrite_str, RewriteStrSettings};

/// Name of the provenance meta tag appended to `<head>`
pub const SNAPSHOT_MARKER: &str = "refine-page-snapshot";

/// Attribute holding the original hyperlink target after neutralization
pub const ORIGINAL_HREF_ATTR: &str = "data-original-href";

/// CSP forbidding script execution and framing. Inline styles stay allowed
/// since the artifact's own styles are inlined by construction.
const CSP_CONTENT: &str = "default-src 'none'; img-src * data: blob:; \
     media-src * data: blob:; font-src * data:; style-src 'unsafe-inline'; \
     script-src 'none'; frame-ancestors 'none'";

/// Injected stylesheet disabling pointer and keyboard affordances
const INERT_CSS: &str = "\
a, a:visited { cursor: default !important; }\n\
a, button, input, select, textarea, label, [role=\"button\"], [role=\"link\"] {\n\
  pointer-events: none !important;\n\
}\n\
input, textarea, select, button { opacity: inherit; }";

/// Configuration record for the inert-ification transform.
///
/// One transform serves both capture paths; the variants differ only in the
/// provenance label recorded in the snapshot marker, never in behavior.
#[derive(Debug, Clone)]
pub struct InertifyConfig {
    /// Which capture path produced the input, recorded in the marker tag
    pub source_label: &'static str,
    /// Move `href` to `data-original-href` and strip it
    pub neutralize_links: bool,
    /// Remove `action` and disable submission on forms
    pub neutralize_forms: bool,
    /// Mark form controls disabled and unfocusable
    pub disable_controls: bool,
}

impl InertifyConfig {
    /// For output of the single-page-archive engine
    pub fn for_page_archive() -> Self {
        Self {
            source_label: "page-archive",
            neutralize_links: true,
            neutralize_forms: true,
            disable_controls: true,
        }
    }

    /// For output of the manual DOM-walk serializer
    pub fn for_dom_walk() -> Self {
        Self {
            source_label: "dom-walk",
            neutralize_links: true,
            neutralize_forms: true,
            disable_controls: true,
        }
    }
}

/// Inert-ify a captured document.
///
/// Never fails: a rewrite error or a headless fragment degrades to a
/// best-effort safe document rather than failing the capture pipeline.
pub fn inertify(raw_html: &str, extra_styles: &[String], config: &InertifyConfig) -> String {
    let input = ensure_document_shell(strip_doctype(raw_html));

    match rewrite_document(&input, extra_styles, config) {
        Ok(rewritten) => format!("<!DOCTYPE html>\n{}", rewritten),
        Err(err) => {
            tracing::warn!("inert-ification rewrite failed, emitting fallback shell: {}", err);
            fallback_document(raw_html, config)
        }
    }
}

fn rewrite_document(
    input: &str,
    extra_styles: &[String],
    config: &InertifyConfig,
) -> Result<String, lol_html::errors::RewritingError> {
    let head_injection = build_head_injection(extra_styles, config);
    let neutralize_links = config.neutralize_links;
    let neutralize_forms = config.neutralize_forms;
    let disable_controls = config.disable_controls;

    rewrite_str(
        input,
        RewriteStrSettings {
            element_content_handlers: vec![
                // Scripts are removed outright, including fallback content
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("noscript", |el| {
                    el.remove();
                    Ok(())
                }),
                // Meta refresh is a navigation vector CSP does not cover
                element!("meta", |el| {
                    let is_refresh = el
                        .get_attribute("http-equiv")
                        .map(|value| value.trim().eq_ignore_ascii_case("refresh"))
                        .unwrap_or(false);
                    if is_refresh {
                        el.remove();
                    }
                    Ok(())
                }),
                // Hyperlinks keep their text but lose their target
                element!("a", move |el| {
                    if neutralize_links {
                        if let Some(href) = el.get_attribute("href") {
                            el.set_attribute(ORIGINAL_HREF_ATTR, &href)?;
                            el.remove_attribute("href");
                        }
                    }
                    Ok(())
                }),
                element!("area", move |el| {
                    if neutralize_links {
                        if let Some(href) = el.get_attribute("href") {
                            el.set_attribute(ORIGINAL_HREF_ATTR, &href)?;
                            el.remove_attribute("href");
                        }
                    }
                    Ok(())
                }),
                // Forms cannot submit anywhere
                element!("form", move |el| {
                    if neutralize_forms {
                        el.remove_attribute("action");
                        el.remove_attribute("method");
                        el.remove_attribute("target");
                    }
                    Ok(())
                }),
                element!("button", move |el| {
                    if disable_controls {
                        disable_control(el)?;
                    }
                    Ok(())
                }),
                element!("input", move |el| {
                    if disable_controls {
                        disable_control(el)?;
                    }
                    Ok(())
                }),
                element!("select", move |el| {
                    if disable_controls {
                        disable_control(el)?;
                    }
                    Ok(())
                }),
                element!("textarea", move |el| {
                    if disable_controls {
                        disable_control(el)?;
                    }
                    Ok(())
                }),
                // Inline event handlers come off every element
                element!("*", |el| {
                    let handler_attrs: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| name.starts_with("on"))
                        .collect();
                    for name in handler_attrs {
                        el.remove_attribute(&name);
                    }
                    // javascript: URLs are executable too
                    for attr in ["src", "xlink:href"] {
                        if let Some(value) = el.get_attribute(attr) {
                            if value.trim().to_lowercase().starts_with("javascript:") {
                                el.remove_attribute(attr);
                            }
                        }
                    }
                    Ok(())
                }),
                element!("head", move |el| {
                    el.prepend(&csp_meta(), lol_html::html_content::ContentType::Html);
                    el.append(&head_injection, lol_html::html_content::ContentType::Html);
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
}

fn disable_control(
    el: &mut lol_html::html_content::Element<'_, '_>,
) -> Result<(), lol_html::errors::AttributeNameError> {
    el.set_attribute("disabled", "")?;
    el.set_attribute("tabindex", "-1")?;
    el.remove_attribute("autofocus");
    Ok(())
}

/// The CSP meta tag inserted as the first child of `<head>`
fn csp_meta() -> String {
    format!(
        "<meta http-equiv=\"Content-Security-Policy\" content=\"{}\">",
        CSP_CONTENT
    )
}

/// Everything appended to `<head>`: provenance marker, inertness CSS,
/// then the caller-supplied extra styles last so they take precedence.
fn build_head_injection(extra_styles: &[String], config: &InertifyConfig) -> String {
    let marker_content = format!(
        "source={}; captured={}",
        config.source_label,
        Utc::now().to_rfc3339()
    );
    let mut injected = format!(
        "<meta name=\"{}\" content=\"{}\">\n<style>{}</style>",
        SNAPSHOT_MARKER,
        html_escape::encode_double_quoted_attribute(&marker_content),
        INERT_CSS
    );
    for css in extra_styles {
        injected.push_str("\n<style data-refine-extra>");
        injected.push_str(css);
        injected.push_str("</style>");
    }
    injected
}

/// Drop a leading doctype declaration; the output emits its own.
fn strip_doctype(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    if trimmed.len() >= 9 && trimmed[..9].eq_ignore_ascii_case("<!doctype") {
        match trimmed.find('>') {
            Some(end) => &trimmed[end + 1..],
            None => "",
        }
    } else {
        raw
    }
}

/// Guarantee the input has a `<head>` for the meta/style injection point.
/// Fragments without one get wrapped in a minimal document shell.
fn ensure_document_shell(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if find_open_tag(&lower, "head").is_some() {
        return raw.to_string();
    }
    if let Some(html_pos) = find_open_tag(&lower, "html") {
        if let Some(tag_len) = lower[html_pos..].find('>') {
            let insert_at = html_pos + tag_len + 1;
            return format!("{}<head></head>{}", &raw[..insert_at], &raw[insert_at..]);
        }
    }
    format!("<html><head></head><body>{}</body></html>", raw)
}

/// Find an opening tag by name, requiring a tag-name boundary after it so
/// `<head>` is not matched inside `<header>`.
fn find_open_tag(lower: &str, name: &str) -> Option<usize> {
    let needle = format!("<{}", name);
    let mut from = 0;
    while let Some(pos) = lower[from..].find(&needle) {
        let start = from + pos;
        let after = start + needle.len();
        match lower.as_bytes().get(after) {
            Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r') | None => return Some(start),
            _ => from = after,
        }
    }
    None
}

/// Last-resort output when rewriting itself fails: the source text survives
/// as escaped, non-executable content.
fn fallback_document(raw_html: &str, config: &InertifyConfig) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head>{}<meta name=\"{}\" content=\"source={}; degraded\"></head>\
         <body><pre>{}</pre></body></html>",
        csp_meta(),
        SNAPSHOT_MARKER,
        config.source_label,
        html_escape::encode_text(raw_html)
    )
}
