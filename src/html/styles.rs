//! Additional-style collection
//!
//! Script-managed style state (adopted style sheets, shadow-tree styles,
//! inline custom properties) is invisible to the capture driver's HTML
//! serialization. The capture driver reads it from the live document before
//! capture and ships it here as `PageStyleState`; collection turns it into
//! the extra style blocks the inert-ifier appends to `<head>`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Style state read from the live document strictly before capture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageStyleState {
    /// Sheets adopted onto the document via `adoptedStyleSheets`
    #[serde(rename = "adoptedSheets", default)]
    pub adopted_sheets: Vec<StyleSheetText>,
    /// Style state of every open shadow root, in document order
    #[serde(rename = "shadowRoots", default)]
    pub shadow_roots: Vec<ShadowRootStyles>,
    /// `style` attribute of the document root element
    #[serde(rename = "rootInlineStyle", skip_serializing_if = "Option::is_none")]
    pub root_inline_style: Option<String>,
    /// `style` attribute of the body element
    #[serde(rename = "bodyInlineStyle", skip_serializing_if = "Option::is_none")]
    pub body_inline_style: Option<String>,
}

/// One style sheet's CSS text. `css_text` is `None` when the sheet could not
/// be read (cross-origin restriction); such sheets are skipped, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSheetText {
    #[serde(rename = "cssText")]
    pub css_text: Option<String>,
}

impl StyleSheetText {
    pub fn readable(css: &str) -> Self {
        Self {
            css_text: Some(css.to_string()),
        }
    }

    pub fn unreadable() -> Self {
        Self { css_text: None }
    }
}

/// Styles inside one shadow subtree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowRootStyles {
    /// CSS text of `<style>` elements inside the shadow root
    #[serde(rename = "styleTexts", default)]
    pub style_texts: Vec<String>,
    /// Sheets adopted onto the shadow root
    #[serde(rename = "adoptedSheets", default)]
    pub adopted_sheets: Vec<StyleSheetText>,
    /// Nested shadow roots
    #[serde(default)]
    pub children: Vec<ShadowRootStyles>,
}

/// Collect extra style blocks in application order: document-adopted sheets,
/// then shadow subtrees depth-first, then inline custom properties.
/// Duplicate CSS text is emitted once per capture.
pub fn collect_extra_styles(state: &PageStyleState) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut collected: Vec<String> = Vec::new();

    for sheet in &state.adopted_sheets {
        push_sheet(sheet, &mut seen, &mut collected);
    }

    for root in &state.shadow_roots {
        collect_shadow(root, &mut seen, &mut collected);
    }

    if let Some(block) = custom_property_block(state) {
        if seen.insert(block.clone()) {
            collected.push(block);
        }
    }

    collected
}

fn push_sheet(sheet: &StyleSheetText, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    let Some(css) = &sheet.css_text else {
        // Unreadable (cross-origin) sheet; skip it
        return;
    };
    if css.trim().is_empty() {
        return;
    }
    if seen.insert(css.clone()) {
        out.push(css.clone());
    }
}

fn collect_shadow(root: &ShadowRootStyles, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    for css in &root.style_texts {
        if !css.trim().is_empty() && seen.insert(css.clone()) {
            out.push(css.clone());
        }
    }
    for sheet in &root.adopted_sheets {
        push_sheet(sheet, seen, out);
    }
    for child in &root.children {
        collect_shadow(child, seen, out);
    }
}

/// Inline `--custom-property` declarations from the root/body style
/// attributes, re-rooted so they stay visible to the whole snapshot.
fn custom_property_block(state: &PageStyleState) -> Option<String> {
    let mut declarations: Vec<String> = Vec::new();

    for inline in [&state.root_inline_style, &state.body_inline_style]
        .into_iter()
        .flatten()
    {
        for declaration in inline.split(';') {
            let declaration = declaration.trim();
            if declaration.starts_with("--") && declaration.contains(':') {
                declarations.push(declaration.to_string());
            }
        }
    }

    if declarations.is_empty() {
        return None;
    }
    Some(format!(":root {{ {}; }}", declarations.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state_collects_nothing() {
        assert!(collect_extra_styles(&PageStyleState::default()).is_empty());
    }

    #[test]
    fn test_adopted_sheets_in_order_deduplicated() {
        let state = PageStyleState {
            adopted_sheets: vec![
                StyleSheetText::readable("a { color: red; }"),
                StyleSheetText::readable("b { color: green; }"),
                StyleSheetText::readable("a { color: red; }"),
            ],
            ..Default::default()
        };

        let styles = collect_extra_styles(&state);
        assert_eq!(styles, vec!["a { color: red; }", "b { color: green; }"]);
    }

    #[test]
    fn test_unreadable_sheet_is_skipped() {
        let state = PageStyleState {
            adopted_sheets: vec![
                StyleSheetText::unreadable(),
                StyleSheetText::readable("p { margin: 0; }"),
            ],
            ..Default::default()
        };

        let styles = collect_extra_styles(&state);
        assert_eq!(styles, vec!["p { margin: 0; }"]);
    }

    #[test]
    fn test_shadow_trees_recurse_with_cross_shadow_dedup() {
        let state = PageStyleState {
            shadow_roots: vec![
                ShadowRootStyles {
                    style_texts: vec![".inner { display: flex; }".to_string()],
                    adopted_sheets: vec![StyleSheetText::readable(":host { all: initial; }")],
                    children: vec![ShadowRootStyles {
                        style_texts: vec![".nested { color: blue; }".to_string()],
                        ..Default::default()
                    }],
                },
                ShadowRootStyles {
                    // Same text as the first shadow root; emitted once
                    style_texts: vec![".inner { display: flex; }".to_string()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let styles = collect_extra_styles(&state);
        assert_eq!(
            styles,
            vec![
                ".inner { display: flex; }",
                ":host { all: initial; }",
                ".nested { color: blue; }",
            ]
        );
    }

    #[test]
    fn test_inline_custom_properties_become_root_block() {
        let state = PageStyleState {
            root_inline_style: Some("--theme: dark; color: black".to_string()),
            body_inline_style: Some("margin: 0; --accent: #f00".to_string()),
            ..Default::default()
        };

        let styles = collect_extra_styles(&state);
        assert_eq!(styles, vec![":root { --theme: dark; --accent: #f00; }"]);
    }

    #[test]
    fn test_document_sheets_come_before_shadow_and_inline() {
        let state = PageStyleState {
            adopted_sheets: vec![StyleSheetText::readable("doc {}")],
            shadow_roots: vec![ShadowRootStyles {
                style_texts: vec!["shadow {}".to_string()],
                ..Default::default()
            }],
            root_inline_style: Some("--x: 1".to_string()),
            ..Default::default()
        };

        let styles = collect_extra_styles(&state);
        assert_eq!(styles, vec!["doc {}", "shadow {}", ":root { --x: 1; }"]);
    }
}
