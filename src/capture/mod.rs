//! Capture pipeline
//!
//! Drives a capture end to end: collect the live style state, obtain raw
//! HTML from the capture engine chain, inert-ify it, and build the
//! `Snapshot`. The archiving engines themselves are external collaborators
//! behind the `CaptureEngine` seam.

pub mod messages;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::html::{collect_extra_styles, inertify, InertifyConfig, PageStyleState};
use crate::snapshot::{Snapshot, Viewport};

/// What to capture
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    pub url: String,
    pub title: String,
    pub viewport: Viewport,
}

/// Which strategy produced the raw HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMethod {
    /// The single-page-archive engine
    PageArchive,
    /// The manual DOM-walk serializer
    DomWalk,
}

/// A capture strategy. Implementations wrap the third-party archiving
/// engine or the manual DOM-walk serializer.
#[async_trait]
pub trait CaptureEngine: Send + Sync {
    fn method(&self) -> CaptureMethod;

    /// Produce the raw (not yet inert) document for the target
    async fn capture(&self, target: &CaptureTarget) -> anyhow::Result<String>;
}

/// Raw capture output tagged with the strategy that produced it
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub raw_html: String,
    pub method: CaptureMethod,
}

/// Two-strategy chain: try the primary engine, fall back on failure.
pub struct CaptureChain {
    primary: Arc<dyn CaptureEngine>,
    fallback: Arc<dyn CaptureEngine>,
}

impl CaptureChain {
    pub fn new(primary: Arc<dyn CaptureEngine>, fallback: Arc<dyn CaptureEngine>) -> Self {
        Self { primary, fallback }
    }

    /// Run the chain. The fallback triggers only on primary failure; when
    /// both fail the capture fails as a whole.
    pub async fn run(&self, target: &CaptureTarget) -> Result<CaptureOutcome> {
        match self.primary.capture(target).await {
            Ok(raw_html) => Ok(CaptureOutcome {
                raw_html,
                method: self.primary.method(),
            }),
            Err(primary_err) => {
                tracing::warn!(
                    "primary capture engine failed for {}, falling back: {}",
                    target.url,
                    primary_err
                );
                match self.fallback.capture(target).await {
                    Ok(raw_html) => Ok(CaptureOutcome {
                        raw_html,
                        method: self.fallback.method(),
                    }),
                    Err(fallback_err) => Err(AppError::Capture(format!(
                        "both capture strategies failed: {}; {}",
                        primary_err, fallback_err
                    ))),
                }
            }
        }
    }
}

/// Capture a page into a pending snapshot.
///
/// `style_state` must have been read from the live document before the raw
/// HTML was captured; by this point the live state is gone.
pub async fn capture_snapshot(
    target: &CaptureTarget,
    chain: &CaptureChain,
    style_state: &PageStyleState,
) -> Result<Snapshot> {
    let extra_styles = collect_extra_styles(style_state);
    let outcome = chain.run(target).await?;

    let config = match outcome.method {
        CaptureMethod::PageArchive => InertifyConfig::for_page_archive(),
        CaptureMethod::DomWalk => InertifyConfig::for_dom_walk(),
    };
    let html = inertify(&outcome.raw_html, &extra_styles, &config);

    Ok(Snapshot::new(&target.url, &target.title, html, target.viewport))
}
