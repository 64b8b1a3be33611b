//! W3C Web Annotation interchange codec
//!
//! Maps the internal annotation shapes to and from the W3C Web Annotation
//! JSON shape used on the wire, in archives and by the annotator UI.
//! The standard vocabulary cannot express everything the internal model
//! carries (text offsets, the DOM selector), so those ride in the
//! `x-refine-page` extension block alongside the shape discriminator.
//!
//! Reference: <https://www.w3.org/TR/annotation-model/>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Annotation, AnnotationKind, RegionAnnotation, RegionBounds, TextAnnotation};

/// JSON-LD context for the Web Annotation data model
pub const ANNOTATION_CONTEXT: &str = "http://www.w3.org/ns/anno.jsonld";

/// `conformsTo` value for media-fragment selectors
pub const MEDIA_FRAGS: &str = "http://www.w3.org/TR/media-frags/";

/// A W3C Web Annotation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAnnotation {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub body: WebAnnotationBody,
    pub target: WebAnnotationTarget,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(rename = "x-refine-page")]
    pub extension: RefinePageExtension,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAnnotationBody {
    #[serde(rename = "type")]
    pub body_type: String,
    pub purpose: String,
    /// The annotation kind: `relevant` or `answer`
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAnnotationTarget {
    /// The snapshot id the annotation belongs to
    pub source: String,
    pub selector: WebSelector,
}

/// Selector vocabulary used by this codec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebSelector {
    TextQuoteSelector {
        exact: String,
    },
    FragmentSelector {
        #[serde(rename = "conformsTo")]
        conforms_to: String,
        value: String,
    },
}

/// Extension block carrying what the standard vocabulary drops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinePageExtension {
    /// Shape discriminator: `text` or `region`
    #[serde(rename = "annotationType")]
    pub annotation_type: String,
    #[serde(rename = "startOffset", skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    #[serde(rename = "endOffset", skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Convert an internal annotation to its interchange form
pub fn to_interchange(annotation: &Annotation, snapshot_id: &str) -> WebAnnotation {
    match annotation {
        Annotation::Text(a) => WebAnnotation {
            context: ANNOTATION_CONTEXT.to_string(),
            id: a.id.clone(),
            record_type: "Annotation".to_string(),
            body: WebAnnotationBody {
                body_type: "TextualBody".to_string(),
                purpose: "tagging".to_string(),
                value: a.kind.as_str().to_string(),
            },
            target: WebAnnotationTarget {
                source: snapshot_id.to_string(),
                selector: WebSelector::TextQuoteSelector {
                    exact: a.selected_text.clone(),
                },
            },
            created: a.created_at,
            modified: a.updated_at,
            extension: RefinePageExtension {
                annotation_type: "text".to_string(),
                start_offset: Some(a.start_offset),
                end_offset: Some(a.end_offset),
                selector: a.selector.clone(),
            },
        },
        Annotation::Region(a) => WebAnnotation {
            context: ANNOTATION_CONTEXT.to_string(),
            id: a.id.clone(),
            record_type: "Annotation".to_string(),
            body: WebAnnotationBody {
                body_type: "TextualBody".to_string(),
                purpose: "tagging".to_string(),
                value: a.kind.as_str().to_string(),
            },
            target: WebAnnotationTarget {
                source: snapshot_id.to_string(),
                selector: WebSelector::FragmentSelector {
                    conforms_to: MEDIA_FRAGS.to_string(),
                    value: format_fragment(&a.bounds),
                },
            },
            created: a.created_at,
            modified: a.updated_at,
            extension: RefinePageExtension {
                annotation_type: "region".to_string(),
                start_offset: None,
                end_offset: None,
                selector: None,
            },
        },
    }
}

/// Convert an interchange record back to the internal shape.
///
/// Returns `None` for anything undecodable. A corrupt region selector must
/// not become a silently-wrong region, so fragment parsing is strict.
pub fn from_interchange(record: &WebAnnotation) -> Option<Annotation> {
    let kind = AnnotationKind::parse(&record.body.value)?;

    match record.extension.annotation_type.as_str() {
        "text" => {
            let exact = match &record.target.selector {
                WebSelector::TextQuoteSelector { exact } => exact.clone(),
                _ => return None,
            };
            Some(Annotation::Text(TextAnnotation {
                id: record.id.clone(),
                kind,
                start_offset: record.extension.start_offset.unwrap_or(0),
                end_offset: record.extension.end_offset.unwrap_or(0),
                selected_text: exact,
                selector: record.extension.selector.clone(),
                created_at: record.created,
                updated_at: record.modified,
            }))
        }
        "region" => {
            let value = match &record.target.selector {
                WebSelector::FragmentSelector { value, .. } => value,
                _ => return None,
            };
            let bounds = parse_fragment(value)?;
            Some(Annotation::Region(RegionAnnotation {
                id: record.id.clone(),
                kind,
                bounds,
                created_at: record.created,
                updated_at: record.modified,
            }))
        }
        _ => None,
    }
}

/// Render bounds as a media-fragment value: `xywh=percent:x,y,w,h`
fn format_fragment(bounds: &RegionBounds) -> String {
    format!(
        "xywh=percent:{},{},{},{}",
        bounds.x, bounds.y, bounds.width, bounds.height
    )
}

/// Parse a `xywh=percent:x,y,w,h` fragment value.
///
/// Wrong prefix, wrong arity or a non-finite/non-numeric component all
/// yield `None`.
fn parse_fragment(value: &str) -> Option<RegionBounds> {
    let rest = value.strip_prefix("xywh=percent:")?;
    let parts: Vec<&str> = rest.split(',').collect();
    if parts.len() != 4 {
        return None;
    }

    let mut numbers = [0f64; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        let parsed: f64 = part.trim().parse().ok()?;
        if !parsed.is_finite() {
            return None;
        }
        *slot = parsed;
    }

    Some(RegionBounds {
        x: numbers[0],
        y: numbers[1],
        width: numbers[2],
        height: numbers[3],
    })
}
