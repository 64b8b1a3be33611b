//! Snapshot types
//!
//! Field names follow the persisted-record wire shape (camelCase JSON), which
//! is shared by every storage backend and the archive manifest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotations::{RegionAnnotation, TextAnnotation};

/// A captured, inert web page plus everything the user attached to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier, generated at capture time; immutable
    pub id: String,
    /// Source URL at capture time
    pub url: String,
    /// Document title at capture time
    pub title: String,
    /// The full inert document. Opaque payload outside the inert-ifier.
    pub html: String,
    /// Viewport dimensions at capture time
    pub viewport: Viewport,
    /// Annotations attached to this snapshot, ordered by creation
    #[serde(default)]
    pub annotations: AnnotationSet,
    /// User questions attached to this snapshot
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Lifecycle tag; transitions happen under external workflow
    #[serde(default)]
    pub status: SnapshotStatus,
    /// User labels
    #[serde(default)]
    pub tags: Vec<String>,
    /// Fixed at creation
    #[serde(rename = "capturedAt")]
    pub captured_at: DateTime<Utc>,
    /// Bumped on every mutation
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Text and region annotations, each ordered by creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationSet {
    #[serde(default)]
    pub text: Vec<TextAnnotation>,
    #[serde(default)]
    pub region: Vec<RegionAnnotation>,
}

impl AnnotationSet {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.region.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len() + self.region.len()
    }
}

/// A question the user attached to a snapshot. Opaque to this core
/// beyond storage and counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn new(content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            answer: None,
            created_at: Utc::now(),
        }
    }
}

/// Snapshot lifecycle tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    #[default]
    Pending,
    Reviewed,
    Archived,
}

/// Lightweight snapshot record without the `html` payload, for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: String,
    pub url: String,
    pub title: String,
    pub viewport: Viewport,
    #[serde(default)]
    pub status: SnapshotStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "textAnnotationCount", default)]
    pub text_annotation_count: usize,
    #[serde(rename = "regionAnnotationCount", default)]
    pub region_annotation_count: usize,
    #[serde(rename = "questionCount", default)]
    pub question_count: usize,
    #[serde(rename = "capturedAt")]
    pub captured_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a snapshot for freshly captured inert HTML
    pub fn new(url: &str, title: &str, html: String, viewport: Viewport) -> Self {
        let now = Utc::now();
        Self {
            id: generate_snapshot_id(),
            url: url.to_string(),
            title: title.to_string(),
            html,
            viewport,
            annotations: AnnotationSet::default(),
            questions: Vec::new(),
            status: SnapshotStatus::Pending,
            tags: Vec::new(),
            captured_at: now,
            updated_at: now,
        }
    }

    /// Derive the list-view record
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
            viewport: self.viewport,
            status: self.status,
            tags: self.tags.clone(),
            text_annotation_count: self.annotations.text.len(),
            region_annotation_count: self.annotations.region.len(),
            question_count: self.questions.len(),
            captured_at: self.captured_at,
            updated_at: self.updated_at,
        }
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Generate a snapshot id: millisecond timestamp plus a random suffix.
/// Ids sort roughly by capture time and never collide in practice.
pub fn generate_snapshot_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &suffix[..8])
}
