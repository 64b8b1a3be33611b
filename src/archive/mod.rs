//! Portable snapshot bundle
//!
//! A ZIP container holding `index.json` (the manifest) plus one
//! `html/<id>.html` file per snapshot. Packing a set of snapshots and
//! unpacking the result round-trips every `{metadata, html}` pair; the
//! `htmlFile`/`viewerUrl` manifest fields are packing artifacts, not
//! semantic content.

use std::io::{Cursor, Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::snapshot::{AnnotationSet, Question, Snapshot, SnapshotStatus, Viewport};

/// Current archive format version
pub const ARCHIVE_VERSION: u32 = 1;

/// Manifest file name inside the container
const MANIFEST_NAME: &str = "index.json";

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The container has no `index.json`; nothing can be recovered
    #[error("archive has no manifest ({MANIFEST_NAME})")]
    MissingManifest,

    #[error("zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The archive manifest
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub version: u32,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    #[serde(rename = "extensionId", skip_serializing_if = "Option::is_none")]
    pub extension_id: Option<String>,
    pub snapshots: Vec<ArchiveIndexEntry>,
}

/// One manifest entry: snapshot metadata plus the packing artifacts
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveIndexEntry {
    #[serde(flatten)]
    pub metadata: SnapshotMetadata,
    /// Path of the html payload inside the container
    #[serde(rename = "htmlFile")]
    pub html_file: String,
    /// Optional externally-supplied viewer URL
    #[serde(rename = "viewerUrl", skip_serializing_if = "Option::is_none")]
    pub viewer_url: Option<String>,
}

/// Every snapshot field except the `html` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub id: String,
    pub url: String,
    pub title: String,
    pub viewport: Viewport,
    #[serde(default)]
    pub annotations: AnnotationSet,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub status: SnapshotStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "capturedAt")]
    pub captured_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl SnapshotMetadata {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            url: snapshot.url.clone(),
            title: snapshot.title.clone(),
            viewport: snapshot.viewport,
            annotations: snapshot.annotations.clone(),
            questions: snapshot.questions.clone(),
            status: snapshot.status,
            tags: snapshot.tags.clone(),
            captured_at: snapshot.captured_at,
            updated_at: snapshot.updated_at,
        }
    }

    /// Rejoin metadata with its html payload
    pub fn into_snapshot(self, html: String) -> Snapshot {
        Snapshot {
            id: self.id,
            url: self.url,
            title: self.title,
            html,
            viewport: self.viewport,
            annotations: self.annotations,
            questions: self.questions,
            status: self.status,
            tags: self.tags,
            captured_at: self.captured_at,
            updated_at: self.updated_at,
        }
    }
}

/// Packing options
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Base URL of a hosted viewer; when present every entry gets a
    /// `viewerUrl` pointing at its snapshot
    pub viewer_url_base: Option<String>,
    /// Identifier of the producing extension, recorded in the manifest
    pub extension_id: Option<String>,
}

/// Serialize snapshots into an archive container
pub fn pack(snapshots: &[Snapshot], options: &PackOptions) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        let html_file = format!("html/{}.html", snapshot.id);
        writer.start_file(html_file.as_str(), file_options)?;
        writer.write_all(snapshot.html.as_bytes())?;

        entries.push(ArchiveIndexEntry {
            metadata: SnapshotMetadata::from_snapshot(snapshot),
            html_file,
            viewer_url: options.viewer_url_base.as_ref().map(|base| {
                format!("{}?snapshot={}", base.trim_end_matches('/'), snapshot.id)
            }),
        });
    }

    let index = ArchiveIndex {
        version: ARCHIVE_VERSION,
        exported_at: Utc::now(),
        extension_id: options.extension_id.clone(),
        snapshots: entries,
    };

    writer.start_file(MANIFEST_NAME, file_options)?;
    writer.write_all(&serde_json::to_vec_pretty(&index)?)?;

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Read an archive container back into full snapshot records.
///
/// A manifest entry whose html file is absent is skipped; the archive is
/// permitted to be partial. A missing manifest is a structural failure.
pub fn unpack(bytes: &[u8]) -> Result<Vec<Snapshot>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let index: ArchiveIndex = {
        let mut manifest = match archive.by_name(MANIFEST_NAME) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(ArchiveError::MissingManifest),
            Err(err) => return Err(err.into()),
        };
        let mut raw = String::new();
        manifest.read_to_string(&mut raw)?;
        serde_json::from_str(&raw)?
    };

    let mut snapshots = Vec::with_capacity(index.snapshots.len());
    for entry in index.snapshots {
        let mut html = String::new();
        match archive.by_name(&entry.html_file) {
            Ok(mut file) => {
                file.read_to_string(&mut html)?;
            }
            Err(ZipError::FileNotFound) => {
                tracing::warn!(
                    "archive entry {} has no html file {}, skipping",
                    entry.metadata.id,
                    entry.html_file
                );
                continue;
            }
            Err(err) => return Err(err.into()),
        }
        snapshots.push(entry.metadata.into_snapshot(html));
    }

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationKind, TextAnnotation};

    fn sample(id: &str, html: &str) -> Snapshot {
        let mut snapshot = Snapshot::new(
            &format!("https://example.com/{}", id),
            id,
            html.to_string(),
            Viewport {
                width: 1280,
                height: 800,
            },
        );
        snapshot.id = id.to_string();
        snapshot
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let mut a = sample("a", "<p>A</p>");
        a.annotations
            .text
            .push(TextAnnotation::new(AnnotationKind::Relevant, 0, 1, "A"));
        a.tags.push("news".to_string());
        let b = sample("b", "<p>B</p>");

        let bytes = pack(&[a.clone(), b.clone()], &PackOptions::default()).unwrap();
        let restored = unpack(&bytes).unwrap();

        assert_eq!(restored.len(), 2);
        let restored_a = restored.iter().find(|s| s.id == "a").unwrap();
        let restored_b = restored.iter().find(|s| s.id == "b").unwrap();
        assert_eq!(restored_a.html, "<p>A</p>");
        assert_eq!(restored_b.html, "<p>B</p>");
        assert_eq!(restored_a.annotations.text, a.annotations.text);
        assert_eq!(restored_a.tags, a.tags);
        assert_eq!(restored_a.captured_at, a.captured_at);
    }

    #[test]
    fn test_manifest_shape() {
        let options = PackOptions {
            viewer_url_base: Some("https://viewer.example/view".to_string()),
            extension_id: Some("refine-page".to_string()),
        };
        let bytes = pack(&[sample("a", "<p>A</p>")], &options).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut raw = String::new();
        archive
            .by_name("index.json")
            .unwrap()
            .read_to_string(&mut raw)
            .unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(manifest["version"], 1);
        assert_eq!(manifest["extensionId"], "refine-page");
        let entry = &manifest["snapshots"][0];
        assert_eq!(entry["htmlFile"], "html/a.html");
        assert_eq!(entry["viewerUrl"], "https://viewer.example/view?snapshot=a");
        assert_eq!(entry["id"], "a");
        assert!(entry.get("html").is_none());
    }

    #[test]
    fn test_missing_manifest_is_structural_failure() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("html/a.html", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<p>A</p>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        match unpack(&bytes) {
            Err(ArchiveError::MissingManifest) => {}
            other => panic!("expected MissingManifest, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_entry_with_missing_html_is_skipped() {
        // Pack two snapshots, then rebuild the container without b's html
        let bytes = pack(
            &[sample("a", "<p>A</p>"), sample("b", "<p>B</p>")],
            &PackOptions::default(),
        )
        .unwrap();

        let mut source = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for name in ["index.json", "html/a.html"] {
            let mut contents = Vec::new();
            source.by_name(name).unwrap().read_to_end(&mut contents).unwrap();
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&contents).unwrap();
        }
        let partial = writer.finish().unwrap().into_inner();

        let restored = unpack(&partial).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id, "a");
    }

    #[test]
    fn test_empty_pack_round_trips() {
        let bytes = pack(&[], &PackOptions::default()).unwrap();
        assert!(unpack(&bytes).unwrap().is_empty());
    }
}
