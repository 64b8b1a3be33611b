//! Internal annotation types
//!
//! Two shapes exist: text annotations anchor a contiguous text range, region
//! annotations anchor a rectangle expressed as percentages of the captured
//! page so it survives viewer reflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the annotation marks the target as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Content relevant to the user's question
    Relevant,
    /// Content answering the user's question
    Answer,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Relevant => "relevant",
            AnnotationKind::Answer => "answer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "relevant" => Some(AnnotationKind::Relevant),
            "answer" => Some(AnnotationKind::Answer),
            _ => None,
        }
    }
}

/// A contiguous text range plus the exact matched text, kept for robustness
/// against reflow of the viewed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[serde(rename = "startOffset")]
    pub start_offset: usize,
    #[serde(rename = "endOffset")]
    pub end_offset: usize,
    #[serde(rename = "selectedText")]
    pub selected_text: String,
    /// CSS-path-like locator produced by the annotator UI; opaque here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A rectangular page region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAnnotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub bounds: RegionBounds,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Rectangle as percentages (0-100) of page width/height, not pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Either annotation shape, for codec dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Text(TextAnnotation),
    Region(RegionAnnotation),
}

impl Annotation {
    pub fn id(&self) -> &str {
        match self {
            Annotation::Text(a) => &a.id,
            Annotation::Region(a) => &a.id,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Text(a) => a.kind,
            Annotation::Region(a) => a.kind,
        }
    }
}

impl TextAnnotation {
    pub fn new(kind: AnnotationKind, start: usize, end: usize, selected_text: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            start_offset: start,
            end_offset: end,
            selected_text: selected_text.to_string(),
            selector: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }
}

impl RegionAnnotation {
    pub fn new(kind: AnnotationKind, bounds: RegionBounds) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            bounds,
            created_at: now,
            updated_at: now,
        }
    }
}
