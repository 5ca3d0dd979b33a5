//! FUNDING.yml content reconciliation
//!
//! This module is the pure half of the reconciler: given the current content
//! of a funding file (or nothing) and the canonical URL for one request, it
//! produces the content the file should have.
//!
//! ## Rules
//!
//! - The `custom` field holds a list of sponsor links. A scalar is treated as
//!   a one-element list and `null` as an empty list.
//! - Entries matching one of the configured [`ObsoleteShape`]s are dropped,
//!   unless the entry is the canonical URL itself.
//! - The canonical URL ends up in the list exactly once. Everything else is
//!   kept in its original order.
//! - When nothing needs to change the input bytes are returned untouched, so
//!   callers can compare input and output to detect a no-op.
//!
//! ## Output format
//!
//! Top-level keys keep their order. The `custom` list is written in flow
//! style with single-quoted entries, which is the shape the sponsorship UI
//! documents:
//!
//! ```text
//! github: octocat
//! custom: ['https://example.org/fulfill?issue=42']
//! ```
//!
//! Comments in a rewritten file are not preserved.

use log::debug;
use regex::Regex;
use serde_yaml::{Mapping, Value as YamlValue};
use url::Url;

use crate::error::{Error, Result};

/// Name of the field holding arbitrary sponsor links.
pub const FUNDING_FIELD: &str = "custom";

/// Query parameter carrying the request id in canonical URLs.
pub const REQUEST_QUERY_PARAM: &str = "issue";

/// The single authoritative link for one approved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalUrl {
    request_id: u64,
    url: String,
}

impl CanonicalUrl {
    /// Builds `<base>?issue=<request_id>`. The base is validated but kept
    /// verbatim, without URL normalization.
    pub fn new(fulfillment_base_url: &str, request_id: u64) -> Result<Self> {
        let base = fulfillment_base_url.trim();
        Url::parse(base)?;
        let separator = if base.contains('?') { '&' } else { '?' };
        Ok(Self {
            request_id,
            url: format!(
                "{}{}{}={}",
                base, separator, REQUEST_QUERY_PARAM, request_id
            ),
        })
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// A historical URL format that a reconciled file must no longer carry.
///
/// New legacy formats are added here; [`reconcile`] only ever asks
/// [`ObsoleteShape::matches`].
#[derive(Debug, Clone)]
pub enum ObsoleteShape {
    /// A direct link to the request's issue in the tracker repository,
    /// e.g. `https://github.com/org/requests/issues/42`.
    TrackerIssue { pattern: Regex },
    /// A fulfillment link (`<base>?issue=<n>`) under the given base.
    FulfillmentQuery { base: String },
}

impl ObsoleteShape {
    /// Issue links under `tracker_url` (a repository URL).
    pub fn tracker_issue(tracker_url: &str) -> Result<Self> {
        let base = tracker_url.trim().trim_end_matches('/');
        let base = base.strip_suffix(".git").unwrap_or(base);
        let pattern = Regex::new(&format!(
            r"^(?i:{})/issues/\d+/?(?:[?#].*)?$",
            regex::escape(base)
        ))?;
        Ok(ObsoleteShape::TrackerIssue { pattern })
    }

    /// Fulfillment links under `base_url`, for any request id.
    pub fn fulfillment_query(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url.trim())?;
        Ok(ObsoleteShape::FulfillmentQuery {
            base: strip_query(url),
        })
    }

    /// Returns true if `entry` has this shape.
    pub fn matches(&self, entry: &str) -> bool {
        match self {
            ObsoleteShape::TrackerIssue { pattern } => pattern.is_match(entry.trim()),
            ObsoleteShape::FulfillmentQuery { base } => match Url::parse(entry.trim()) {
                Ok(url) => {
                    let has_request = url.query_pairs().any(|(k, _)| k == REQUEST_QUERY_PARAM);
                    has_request && strip_query(url) == *base
                }
                Err(_) => false,
            },
        }
    }
}

fn strip_query(mut url: Url) -> String {
    url.set_query(None);
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_string()
}

/// The set of obsolete shapes applied during reconciliation.
#[derive(Debug, Clone, Default)]
pub struct ContentPolicy {
    shapes: Vec<ObsoleteShape>,
}

impl ContentPolicy {
    pub fn new(shapes: Vec<ObsoleteShape>) -> Self {
        Self { shapes }
    }

    /// Policy for a deployment: tracker issue links, the current fulfillment
    /// base, and every legacy fulfillment base.
    pub fn for_deployment(
        tracker_url: &str,
        fulfillment_base_url: &str,
        legacy_fulfillment_base_urls: &[String],
    ) -> Result<Self> {
        let mut shapes = vec![
            ObsoleteShape::tracker_issue(tracker_url)?,
            ObsoleteShape::fulfillment_query(fulfillment_base_url)?,
        ];
        for legacy in legacy_fulfillment_base_urls {
            shapes.push(ObsoleteShape::fulfillment_query(legacy)?);
        }
        Ok(Self::new(shapes))
    }

    pub fn shapes(&self) -> &[ObsoleteShape] {
        &self.shapes
    }

    /// True if `entry` must be removed in favour of `canonical`.
    pub fn is_obsolete(&self, entry: &str, canonical: &CanonicalUrl) -> bool {
        entry != canonical.as_str() && self.shapes.iter().any(|shape| shape.matches(entry))
    }
}

/// A document holding only the canonical URL.
pub fn fresh_document(canonical: &CanonicalUrl) -> Vec<u8> {
    format!("{}: [{}]\n", FUNDING_FIELD, quote(canonical.as_str())).into_bytes()
}

/// Reconcile funding file content against the canonical URL.
///
/// # Errors
///
/// Returns `Error::MalformedInput` if the existing content is not UTF-8, not
/// YAML, not a mapping at the top level, or has a `custom` field that is
/// neither a scalar nor a list of scalars.
pub fn reconcile(
    existing: Option<&[u8]>,
    canonical: &CanonicalUrl,
    policy: &ContentPolicy,
) -> Result<Vec<u8>> {
    let Some(bytes) = existing else {
        return Ok(fresh_document(canonical));
    };

    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::malformed(format!("funding file is not UTF-8: {}", e)))?;
    let document: YamlValue = if is_blank(text) {
        YamlValue::Null
    } else {
        serde_yaml::from_str(text).map_err(|e| Error::MalformedInput {
            message: format!("funding file is not valid YAML: {}", e),
            hint: Some("Fix the syntax of FUNDING.yml in the target repository".to_string()),
        })?
    };

    let mut mapping = match document {
        YamlValue::Null => Mapping::new(),
        YamlValue::Mapping(mapping) => mapping,
        other => {
            return Err(Error::malformed(format!(
                "funding file must be a mapping at the top level, found {}",
                type_name(&other)
            )))
        }
    };

    let key = YamlValue::String(FUNDING_FIELD.to_string());
    let (entries, normalized) = match mapping.get(&key) {
        None | Some(YamlValue::Null) => (Vec::new(), true),
        Some(YamlValue::Sequence(seq)) => (seq.clone(), false),
        Some(scalar @ (YamlValue::String(_) | YamlValue::Number(_) | YamlValue::Bool(_))) => {
            (vec![scalar.clone()], true)
        }
        Some(other) => {
            return Err(Error::malformed(format!(
                "'{}' must be a string or a list of strings, found {}",
                FUNDING_FIELD,
                type_name(other)
            )))
        }
    };

    let (entries, changed) = reconcile_entries(entries, canonical, policy)?;
    if !changed && !normalized {
        debug!("funding links already reconciled for {}", canonical);
        return Ok(bytes.to_vec());
    }

    mapping.insert(key, YamlValue::Sequence(entries));
    render(&mapping)
}

/// Empty or comment-only documents.
fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Filter obsolete entries and ensure the canonical URL appears exactly once.
///
/// Returns the new entries and whether anything changed.
fn reconcile_entries(
    entries: Vec<YamlValue>,
    canonical: &CanonicalUrl,
    policy: &ContentPolicy,
) -> Result<(Vec<YamlValue>, bool)> {
    let mut kept = Vec::with_capacity(entries.len() + 1);
    let mut seen_canonical = false;
    let mut changed = false;

    for entry in entries {
        match &entry {
            YamlValue::String(link) if link == canonical.as_str() => {
                if seen_canonical {
                    changed = true;
                    continue;
                }
                seen_canonical = true;
            }
            YamlValue::String(link) if policy.is_obsolete(link, canonical) => {
                debug!("dropping obsolete funding link {}", link);
                changed = true;
                continue;
            }
            YamlValue::String(_) | YamlValue::Number(_) | YamlValue::Bool(_) | YamlValue::Null => {}
            other => {
                return Err(Error::malformed(format!(
                    "'{}' entries must be scalars, found {}",
                    FUNDING_FIELD,
                    type_name(other)
                )))
            }
        }
        kept.push(entry);
    }

    if !seen_canonical {
        kept.push(YamlValue::String(canonical.as_str().to_string()));
        changed = true;
    }

    Ok((kept, changed))
}

/// Render the mapping key by key so the funding list can use flow style.
fn render(mapping: &Mapping) -> Result<Vec<u8>> {
    let mut out = String::new();
    for (key, value) in mapping {
        if key.as_str() == Some(FUNDING_FIELD) {
            let items = value
                .as_sequence()
                .map(|seq| seq.iter().map(render_flow_item).collect::<Vec<_>>())
                .unwrap_or_default();
            out.push_str(&format!("{}: [{}]\n", FUNDING_FIELD, items.join(", ")));
        } else {
            let mut single = Mapping::new();
            single.insert(key.clone(), value.clone());
            out.push_str(&serde_yaml::to_string(&single)?);
        }
    }
    Ok(out.into_bytes())
}

fn render_flow_item(value: &YamlValue) -> String {
    match value {
        YamlValue::String(s) => quote(s),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        _ => "null".to_string(),
    }
}

/// Single-quote a scalar, falling back to a double-quoted scalar with
/// escapes when it holds characters a single-quoted scalar cannot carry.
fn quote(s: &str) -> String {
    if s.chars().all(|c| !c.is_control() && is_printable(c)) {
        return format!("'{}'", s.replace('\'', "''"));
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() || !is_printable(c) => {
                let code = c as u32;
                if code <= 0xFFFF {
                    out.push_str(&format!("\\u{:04X}", code));
                } else {
                    out.push_str(&format!("\\U{:08X}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// YAML's printable set, minus the line breaks and tab handled as controls.
fn is_printable(c: char) -> bool {
    matches!(
        c as u32,
        0x20..=0x7E | 0x85 | 0xA0..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

fn type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a list",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

/// Extract the funding links of a document, for display and assertions.
pub fn funding_links(content: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(content)
        .map_err(|e| Error::malformed(format!("funding file is not UTF-8: {}", e)))?;
    let document: YamlValue = serde_yaml::from_str(text)?;
    let links = match document.get(FUNDING_FIELD) {
        Some(YamlValue::Sequence(seq)) => seq
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(YamlValue::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    };
    Ok(links)
}
