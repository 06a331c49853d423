//! # Report Input Model
//!
//! The resolved, read-only data the composers consume. Everything here is
//! produced by the data layer (already joined with requester, handler, and
//! assignee identities) and arrives as JSON in camelCase. The engine never
//! queries anything itself.
//!
//! Optional fields are `Option<T>` and absence is never an error: the
//! composers render [`NOT_SPECIFIED`] through [`display_or_fallback`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ExportError;
use crate::style;

/// Literal rendered in place of any absent optional value.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Return `value` when it has visible content, otherwise [`NOT_SPECIFIED`].
pub fn display_or_fallback(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => NOT_SPECIFIED,
    }
}

/// Deserialize an explicit `null` as the type's default. `#[serde(default)]`
/// alone only covers a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `Some(trimmed)` when the value has visible content.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ── Page geometry ──────────────────────────────────────────────

/// Page size and uniform margin in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    pub const DEFAULT_MARGIN: f64 = 40.0;

    /// Build a geometry, rejecting one whose margin leaves no content area.
    pub fn new(width: f64, height: f64, margin: f64) -> Result<Self, ExportError> {
        let geometry = Self {
            width,
            height,
            margin,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin: Self::DEFAULT_MARGIN,
        }
    }

    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: Self::DEFAULT_MARGIN,
        }
    }

    /// Check the positivity and margin invariants.
    pub fn validate(&self) -> Result<(), ExportError> {
        let finite = self.width.is_finite() && self.height.is_finite() && self.margin.is_finite();
        if !finite || self.width <= 0.0 || self.height <= 0.0 || self.margin <= 0.0 {
            return Err(ExportError::InvalidGeometry(format!(
                "dimensions must be positive (width {}, height {}, margin {})",
                self.width, self.height, self.margin
            )));
        }
        if self.margin >= self.width / 2.0 || self.margin >= self.height / 2.0 {
            return Err(ExportError::InvalidGeometry(format!(
                "margin {} must be less than half of {}x{}",
                self.margin, self.width, self.height
            )));
        }
        if self.margin < style::MIN_MARGIN {
            return Err(ExportError::InvalidGeometry(format!(
                "margin {} is below the {}pt needed for footers",
                self.margin,
                style::MIN_MARGIN
            )));
        }
        if self.usable_height() < style::MIN_USABLE_HEIGHT {
            return Err(ExportError::InvalidGeometry(format!(
                "usable height {} is below {}pt",
                self.usable_height(),
                style::MIN_USABLE_HEIGHT
            )));
        }
        Ok(())
    }

    /// Lowest y a flow block may reach.
    pub fn content_bottom(&self) -> f64 {
        self.height - self.margin
    }

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f64 {
        self.height - 2.0 * self.margin
    }
}

// ── Case records ───────────────────────────────────────────────

/// Person who filed the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Staff member responsible for routing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handler {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Person doing the work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One case record as the report engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: String,
    pub requester: Requester,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    /// When the requester would like the work done.
    #[serde(default)]
    pub preferred_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub handler: Option<Handler>,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    /// Attachment URLs in upload order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<String>,
    /// Number of handlers who shortlisted or engaged with the request.
    #[serde(default)]
    pub shortlist_count: Option<u32>,
}

impl RecordView {
    /// First 8 characters of the identifier, used in filenames.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// The handler block is drawn only when it names someone.
    pub fn handler_if_present(&self) -> Option<&Handler> {
        self.handler
            .as_ref()
            .filter(|h| present(h.name.as_deref()).is_some() || present(h.email.as_deref()).is_some())
    }

    pub fn assignee_if_present(&self) -> Option<&Assignee> {
        self.assignee.as_ref().filter(|a| {
            present(a.name.as_deref()).is_some()
                || present(a.mobile.as_deref()).is_some()
                || present(a.photo_url.as_deref()).is_some()
                || present(a.notes.as_deref()).is_some()
        })
    }
}

/// Format a timestamp for display in a report.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%b %d, %Y %H:%M UTC").to_string()
}

// ── Aggregate statistics ───────────────────────────────────────

/// One labelled count in a statistics panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub label: String,
    pub count: u64,
}

impl CountEntry {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Input for the platform statistics report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub total_requests: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_breakdown: Vec<CountEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category_breakdown: Vec<CountEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_handlers: Vec<CountEntry>,
    /// Human-readable reporting window, e.g. "Sep 1 - Sep 30, 2026".
    #[serde(default)]
    pub period_label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_for_absent_and_blank() {
        assert_eq!(display_or_fallback(None), NOT_SPECIFIED);
        assert_eq!(display_or_fallback(Some("   ")), NOT_SPECIFIED);
        assert_eq!(display_or_fallback(Some(" Plumbing ")), "Plumbing");
    }

    #[test]
    fn geometry_rejects_oversized_margin() {
        assert!(PageGeometry::new(200.0, 400.0, 100.0).is_err());
        assert!(PageGeometry::new(400.0, 200.0, 100.0).is_err());
        assert!(PageGeometry::new(400.0, 400.0, 0.0).is_err());
        assert!(PageGeometry::new(400.0, 400.0, 24.0).is_ok());
    }

    #[test]
    fn geometry_rejects_margin_too_small_for_footers() {
        assert!(PageGeometry::new(400.0, 400.0, 20.0).is_err());
        assert!(PageGeometry::new(400.0, 400.0, style::MIN_MARGIN).is_ok());
    }

    #[test]
    fn geometry_rejects_short_content_area() {
        // 100 - 2 * 24 = 52pt usable.
        assert!(PageGeometry::new(400.0, 100.0, 24.0).is_err());
        assert!(PageGeometry::new(400.0, 104.0, 24.0).is_ok());
    }

    #[test]
    fn short_id_truncates_to_eight_chars() {
        let json = r#"{
            "id": "3f9a2c71-5b4e-4d1a-9e0f-1234567890ab",
            "requester": { "name": "Ana" },
            "createdAt": "2026-10-01T09:30:00Z",
            "status": "pending"
        }"#;
        let record: RecordView = serde_json::from_str(json).unwrap();
        assert_eq!(record.short_id(), "3f9a2c71");
        assert!(record.attachments.is_empty());
        assert!(record.preferred_date.is_none());
        assert!(record.description.is_none());
    }

    #[test]
    fn empty_handler_is_treated_as_absent() {
        let json = r#"{
            "id": "abc",
            "requester": { "name": "Ana" },
            "createdAt": "2026-10-01T09:30:00Z",
            "status": "pending",
            "handler": { "name": "  " },
            "assignee": { "mobile": "+1 555 0100" }
        }"#;
        let record: RecordView = serde_json::from_str(json).unwrap();
        assert_eq!(record.short_id(), "abc");
        assert!(record.handler_if_present().is_none());
        assert!(record.assignee_if_present().is_some());
    }

    #[test]
    fn explicit_nulls_parse_as_absent() {
        let json = r#"{
            "id": "nulls",
            "requester": { "name": null, "email": null, "photoUrl": null },
            "category": null,
            "description": null,
            "additionalNotes": null,
            "preferredDate": null,
            "createdAt": "2026-10-01T09:30:00Z",
            "status": "pending",
            "handler": null,
            "assignee": null,
            "attachments": null,
            "shortlistCount": null
        }"#;
        let record: RecordView = serde_json::from_str(json).unwrap();
        assert!(record.requester.name.is_none());
        assert!(record.description.is_none());
        assert!(record.attachments.is_empty());
        assert_eq!(display_or_fallback(record.requester.name.as_deref()), NOT_SPECIFIED);
    }

    #[test]
    fn null_breakdowns_are_empty() {
        let stats: SummaryStatistics = serde_json::from_str(
            r#"{ "totalRequests": 3, "statusBreakdown": null, "topHandlers": null }"#,
        )
        .unwrap();
        assert!(stats.status_breakdown.is_empty());
        assert!(stats.category_breakdown.is_empty());
        assert!(stats.top_handlers.is_empty());
    }
}
