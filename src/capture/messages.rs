//! Message contract with the capture driver and the annotator UI
//!
//! Both collaborators live outside this crate and talk to it over
//! message passing. The contract is a small closed set of serde-tagged
//! shapes rather than ad hoc payloads.

use serde::{Deserialize, Serialize};

use crate::annotations::WebAnnotation;
use crate::html::PageStyleState;
use crate::snapshot::Viewport;

/// Request that triggers the capture pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub url: String,
    pub title: String,
    pub viewport: Viewport,
    /// Live style state, read before capture
    #[serde(rename = "styleState", default)]
    pub style_state: PageStyleState,
}

/// Response to a capture request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaptureResponse {
    Ok {
        #[serde(rename = "snapshotId")]
        snapshot_id: String,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Annotation mode of the annotator UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTool {
    Select,
    Relevant,
    Answer,
}

/// Inbound commands accepted by the annotator UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum AnnotatorCommand {
    /// Load an inert document into the annotator
    LoadDocument { html: String },
    /// Switch the annotation mode
    SetTool { tool: AnnotationTool },
    /// Display an existing annotation
    LoadAnnotation { annotation: WebAnnotation },
    /// Remove one annotation from display
    RemoveAnnotation { id: String },
    /// Remove every displayed annotation
    ClearAnnotations,
    /// Scroll the annotation into view
    ScrollTo { id: String },
}

/// Outbound events emitted by the annotator UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AnnotatorEvent {
    Created { annotation: WebAnnotation },
    Deleted { annotation: WebAnnotation },
    Clicked { annotation: WebAnnotation },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{to_interchange, Annotation, AnnotationKind, TextAnnotation};

    #[test]
    fn test_capture_response_wire_shape() {
        let ok = CaptureResponse::Ok {
            snapshot_id: "123-abc".to_string(),
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"snapshotId\":\"123-abc\""));

        let error: CaptureResponse = serde_json::from_str(
            r#"{"status":"error","code":"captureFailed","message":"both strategies failed"}"#,
        )
        .unwrap();
        assert!(matches!(error, CaptureResponse::Error { .. }));
    }

    #[test]
    fn test_command_tagging() {
        let command = AnnotatorCommand::SetTool {
            tool: AnnotationTool::Relevant,
        };
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(json, r#"{"command":"setTool","tool":"relevant"}"#);

        let parsed: AnnotatorCommand =
            serde_json::from_str(r#"{"command":"clearAnnotations"}"#).unwrap();
        assert!(matches!(parsed, AnnotatorCommand::ClearAnnotations));
    }

    #[test]
    fn test_event_carries_interchange_annotation() {
        let annotation = to_interchange(
            &Annotation::Text(TextAnnotation::new(AnnotationKind::Answer, 0, 4, "text")),
            "snap-1",
        );
        let event = AnnotatorEvent::Created { annotation };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"created\""));
        assert!(json.contains("\"@context\""));

        let parsed: AnnotatorEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            AnnotatorEvent::Created { annotation } => {
                assert_eq!(annotation.target.source, "snap-1");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
