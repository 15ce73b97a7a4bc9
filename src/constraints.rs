//! Caller-supplied constraints and their resolution into per-node
//! allowed-value predicates.
//!
//! Inputs arrive as explicit typed values (a [`BrowserSpec`], a [`Screen`]
//! range, plain value lists) and are resolved once, before sampling, into
//! allowed subsets of each node's catalog. Candidate subsets deliberately
//! keep the network's own conditional weights: a two-browser constraint is
//! sampled at the browsers' real-world relative frequencies, not uniformly.

use std::collections::HashMap;

use crate::error::{ForgeprintError, Result};

pub const SUPPORTED_BROWSERS: &[&str] = &["chrome", "firefox", "safari", "edge"];
pub const SUPPORTED_OPERATING_SYSTEMS: &[&str] =
    &["windows", "macos", "linux", "android", "ios"];
pub const SUPPORTED_DEVICES: &[&str] = &["desktop", "mobile"];

/// Upper bound on the Accept-Language locale list.
pub const MAX_LOCALES: usize = 10;

/// HTTP version the generated headers target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    V1,
    #[default]
    V2,
}

impl HttpVersion {
    pub(crate) fn as_model_str(self) -> &'static str {
        match self {
            HttpVersion::V1 => "1",
            HttpVersion::V2 => "2",
        }
    }
}

/// A browser family constraint with optional major-version bounds and an
/// optional HTTP version pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSpec {
    pub name: String,
    pub min_version: Option<u32>,
    pub max_version: Option<u32>,
    pub http_version: Option<HttpVersion>,
}

impl BrowserSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_version: None,
            max_version: None,
            http_version: None,
        }
    }

    pub fn min_version(mut self, version: u32) -> Self {
        self.min_version = Some(version);
        self
    }

    pub fn max_version(mut self, version: u32) -> Self {
        self.max_version = Some(version);
        self
    }

    pub fn http_version(mut self, version: HttpVersion) -> Self {
        self.http_version = Some(version);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !SUPPORTED_BROWSERS.contains(&self.name.as_str()) {
            return Err(ForgeprintError::Validation(format!(
                "unsupported browser '{}'",
                self.name
            )));
        }
        if let (Some(min), Some(max)) = (self.min_version, self.max_version) {
            if min > max {
                return Err(ForgeprintError::Validation(format!(
                    "browser min version ({min}) cannot exceed max version ({max})"
                )));
            }
        }
        Ok(())
    }

    /// Whether a concrete browser/HTTP catalog entry satisfies this spec.
    /// `fallback_http` applies when the spec itself does not pin a version.
    pub(crate) fn matches(&self, browser: &HttpBrowser, fallback_http: HttpVersion) -> bool {
        let http = self.http_version.unwrap_or(fallback_http);
        self.name == browser.name
            && browser.http_version == http.as_model_str()
            && self.min_version.map_or(true, |min| browser.major() >= min)
            && self.max_version.map_or(true, |max| browser.major() <= max)
    }
}

impl From<&str> for BrowserSpec {
    fn from(name: &str) -> Self {
        BrowserSpec::new(name)
    }
}

/// Structured form of a `name/version|httpVersion` catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpBrowser {
    pub name: String,
    pub version: Vec<u32>,
    pub complete: String,
    pub http_version: String,
}

impl HttpBrowser {
    pub fn parse(entry: &str) -> Result<Self> {
        let (browser, http_version) = entry.split_once('|').ok_or_else(|| {
            ForgeprintError::Validation(format!("malformed browser entry '{entry}'"))
        })?;
        let (name, version_string) = browser.split_once('/').ok_or_else(|| {
            ForgeprintError::Validation(format!("malformed browser entry '{entry}'"))
        })?;
        let version = version_string
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    ForgeprintError::Validation(format!("malformed browser entry '{entry}'"))
                })
            })
            .collect::<Result<Vec<u32>>>()?;
        Ok(Self {
            name: name.to_string(),
            version,
            complete: entry.to_string(),
            http_version: http_version.to_string(),
        })
    }

    pub fn major(&self) -> u32 {
        self.version.first().copied().unwrap_or(0)
    }

    pub fn is_http2(&self) -> bool {
        self.http_version == "2"
    }
}

/// Numeric bounds on the generated screen geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Screen {
    pub min_width: Option<i64>,
    pub max_width: Option<i64>,
    pub min_height: Option<i64>,
    pub max_height: Option<i64>,
}

impl Screen {
    pub fn is_set(&self) -> bool {
        self.min_width.is_some()
            || self.max_width.is_some()
            || self.min_height.is_some()
            || self.max_height.is_some()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let width_inverted = matches!(
            (self.min_width, self.max_width),
            (Some(min), Some(max)) if min > max
        );
        let height_inverted = matches!(
            (self.min_height, self.max_height),
            (Some(min), Some(max)) if min > max
        );
        if width_inverted || height_inverted {
            return Err(ForgeprintError::Validation(
                "invalid screen constraints: min values cannot be greater than max values"
                    .into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn admits(&self, width: i64, height: i64) -> bool {
        width >= self.min_width.unwrap_or(0)
            && width <= self.max_width.unwrap_or(i64::MAX)
            && height >= self.min_height.unwrap_or(0)
            && height <= self.max_height.unwrap_or(i64::MAX)
    }
}

/// Per-node allowed-value sets consumed by the sampler. A node with no
/// entry accepts any value from its catalog.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConstraintSet {
    allowed: HashMap<String, Vec<String>>,
}

impl ConstraintSet {
    pub fn allowed(&self, node: &str) -> Option<&[String]> {
        self.allowed.get(node).map(Vec::as_slice)
    }

    /// Pins a node to exactly one value.
    pub fn pin(&mut self, node: &str, value: &str) {
        self.allowed.insert(node.to_string(), vec![value.to_string()]);
    }

    /// Restricts a node to the given candidates, replacing any prior entry.
    pub fn allow(&mut self, node: &str, values: Vec<String>) {
        self.allowed.insert(node.to_string(), values);
    }

    /// Intersects a node's entry with the given candidates.
    pub fn intersect(&mut self, node: &str, values: &[String]) {
        match self.allowed.get_mut(node) {
            Some(existing) => existing.retain(|v| values.contains(v)),
            None => {
                self.allowed.insert(node.to_string(), values.to_vec());
            }
        }
    }
}

/// Validates a plain value list against a supported-value catalog.
pub(crate) fn validate_values(kind: &str, values: &[String], supported: &[&str]) -> Result<()> {
    for value in values {
        if !supported.contains(&value.as_str()) {
            return Err(ForgeprintError::Validation(format!(
                "unsupported {kind} '{value}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_spec_rejects_inverted_versions() {
        let spec = BrowserSpec::new("chrome").min_version(121).max_version(120);
        assert!(matches!(
            spec.validate(),
            Err(ForgeprintError::Validation(_))
        ));
    }

    #[test]
    fn browser_spec_rejects_unknown_family() {
        assert!(BrowserSpec::new("netscape").validate().is_err());
    }

    #[test]
    fn browser_spec_matches_version_range_and_http() {
        let entry = HttpBrowser::parse("chrome/121.0.6167.85|2").unwrap();
        assert_eq!(entry.major(), 121);
        assert!(entry.is_http2());

        let spec = BrowserSpec::new("chrome").min_version(120).max_version(121);
        assert!(spec.matches(&entry, HttpVersion::V2));
        assert!(!spec.matches(&entry, HttpVersion::V1));

        let pinned = BrowserSpec::new("chrome").http_version(HttpVersion::V1);
        assert!(!pinned.matches(&entry, HttpVersion::V2));
    }

    #[test]
    fn screen_bounds_validate_and_admit() {
        let screen = Screen {
            min_width: Some(100),
            max_width: Some(1280),
            min_height: Some(400),
            max_height: Some(720),
        };
        screen.validate().unwrap();
        assert!(screen.admits(1280, 720));
        assert!(!screen.admits(1366, 768));

        let inverted = Screen {
            min_width: Some(200),
            max_width: Some(100),
            ..Screen::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn constraint_set_intersection() {
        let mut set = ConstraintSet::default();
        set.allow("os", vec!["linux".into(), "macos".into()]);
        set.intersect("os", &["macos".into(), "windows".into()]);
        assert_eq!(set.allowed("os").unwrap(), ["macos"]);
    }
}
