//! HTTP header generation.
//!
//! Headers are sampled from the bundled header network so that presence,
//! values, and casing stay consistent with the rest of the identity: the
//! model carries one node per header and casing variant, and nodes emit the
//! missing-value sentinel wherever a real browser would not send the header
//! at all.

mod util;

pub use util::only_injectable_headers;

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use rand::Rng;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::constraints::{
    validate_values, BrowserSpec, ConstraintSet, HttpBrowser, HttpVersion, MAX_LOCALES,
    SUPPORTED_BROWSERS, SUPPORTED_DEVICES, SUPPORTED_OPERATING_SYSTEMS,
};
use crate::error::{ForgeprintError, Result};
use crate::model::{header_network, input_network, Network, MISSING_VALUE};
use crate::sampler::{self, Assignment};

static BROWSER_HELPER_JSON: &[u8] = include_bytes!("../../data/browser-helper.json");
static HEADERS_ORDER_JSON: &[u8] = include_bytes!("../../data/headers-order.json");

const BROWSER_HTTP_NODE: &str = "*BROWSER_HTTP";
const OPERATING_SYSTEM_NODE: &str = "*OPERATING_SYSTEM";
const DEVICE_NODE: &str = "*DEVICE";
const USER_AGENT_NODES: [&str; 2] = ["User-Agent", "user-agent"];

/// First-party navigation values, canonical HTTP/1.1 casing.
const SEC_FETCH_HTTP1: [(&str, &str); 4] = [
    ("Sec-Fetch-Site", "same-site"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-User", "?1"),
    ("Sec-Fetch-Dest", "document"),
];
const SEC_FETCH_HTTP2: [(&str, &str); 4] = [
    ("sec-fetch-site", "same-site"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-user", "?1"),
    ("sec-fetch-dest", "document"),
];

/// An ordered header collection. Iteration yields headers in the order a
/// real browser of the sampled family would send them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Exact-name lookup. Header names are emitted in the casing matching
    /// the generated HTTP version, so check both casings (or use
    /// [`Headers::user_agent`]) when the version is not known.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The `User-Agent` value, whichever casing it was emitted in.
    pub fn user_agent(&self) -> Option<&str> {
        util::user_agent(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces an existing header in place or appends a new one.
    pub(crate) fn set(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.push(name, value),
        }
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = std::vec::IntoIter<(&'a str, &'a str)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

/// Header generation constraints. Empty lists leave the attribute
/// unconstrained, so it is drawn from the model's own marginal frequencies.
#[derive(Debug, Clone)]
pub struct HeaderOptions {
    /// Browser families, optionally version-bounded. Empty means any
    /// supported family.
    pub browsers: Vec<BrowserSpec>,
    pub operating_systems: Vec<String>,
    pub devices: Vec<String>,
    /// Accept-Language locales in preference order, at most
    /// [`MAX_LOCALES`].
    pub locales: Vec<String>,
    pub http_version: HttpVersion,
    /// Literal User-Agent value(s) to pin generation to.
    pub user_agent: Vec<String>,
    /// Known values of request-dependent headers (referer etc.), merged
    /// into the generated collection.
    pub request_dependent_headers: Vec<(String, String)>,
    /// Fail instead of relaxing constraints that admit no sample.
    pub strict: bool,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            browsers: Vec::new(),
            operating_systems: Vec::new(),
            devices: Vec::new(),
            locales: vec!["en-US".to_string()],
            http_version: HttpVersion::default(),
            user_agent: Vec::new(),
            request_dependent_headers: Vec::new(),
            strict: false,
        }
    }
}

/// Generates HTTP header collections matching real-world traffic under the
/// configured constraints.
pub struct HeaderGenerator {
    options: HeaderOptions,
    input_network: &'static Network,
    header_network: &'static Network,
    unique_browsers: &'static [HttpBrowser],
    headers_order: &'static HashMap<String, Vec<String>>,
}

impl HeaderGenerator {
    pub fn new() -> Result<Self> {
        Self::with_options(HeaderOptions::default())
    }

    pub fn with_options(options: HeaderOptions) -> Result<Self> {
        validate_options(&options)?;
        Ok(Self {
            options,
            input_network: input_network()?,
            header_network: header_network()?,
            unique_browsers: unique_browsers()?,
            headers_order: headers_order()?,
        })
    }

    /// Generates one header collection with a fresh random source.
    pub fn generate(&self) -> Result<Headers> {
        self.generate_with_rng(&mut rand::thread_rng())
    }

    /// Generates one header collection, consuming randomness only from
    /// `rng`: a fixed random-source state yields an identical collection.
    pub fn generate_with_rng(&self, rng: &mut impl Rng) -> Result<Headers> {
        self.generate_sampled(&self.options, rng)
            .map(|(headers, _)| headers)
    }

    /// Generates with one-off options instead of the configured defaults.
    pub fn generate_with_options(
        &self,
        options: &HeaderOptions,
        rng: &mut impl Rng,
    ) -> Result<Headers> {
        validate_options(options)?;
        self.generate_sampled(options, rng).map(|(headers, _)| headers)
    }

    /// Full pipeline, also returning the raw header-network assignment for
    /// downstream fingerprint composition.
    pub(crate) fn generate_sampled(
        &self,
        options: &HeaderOptions,
        rng: &mut impl Rng,
    ) -> Result<(Headers, Assignment)> {
        let input_constraints = self.resolve_constraints(options)?;
        let input_sample =
            sampler::sample(self.input_network, &input_constraints, options.strict, rng)?;

        // Complete the header network with the input attributes pinned.
        let mut header_constraints = ConstraintSet::default();
        for node in self.input_network.nodes() {
            if let Some(value) = input_sample.get(node.name()) {
                header_constraints.pin(node.name(), value);
            }
        }
        if !options.user_agent.is_empty() {
            // The wrong-casing node legitimately emits the sentinel, so a
            // pinned user agent must keep it admissible.
            let mut allowed = options.user_agent.clone();
            allowed.push(MISSING_VALUE.to_string());
            for node in USER_AGENT_NODES {
                header_constraints.allow(node, allowed.clone());
            }
        }
        let sample =
            sampler::sample(self.header_network, &header_constraints, options.strict, rng)?;

        let browser = HttpBrowser::parse(sample.get(BROWSER_HTTP_NODE).ok_or_else(|| {
            ForgeprintError::ModelLoad {
                node: BROWSER_HTTP_NODE.into(),
                reason: "header model emitted no browser attribute".into(),
            }
        })?)?;

        let mut headers = Headers::default();
        for node in self.header_network.nodes() {
            let name = node.name();
            if name.starts_with('*') {
                continue;
            }
            let Some(value) = sample.get(name) else { continue };
            if value == MISSING_VALUE {
                continue;
            }
            if name.eq_ignore_ascii_case("connection") && value == "close" {
                continue;
            }
            headers.push(name, value);
        }

        let accept_language = accept_language_value(&options.locales);
        if browser.is_http2() {
            headers.push("accept-language", accept_language);
        } else {
            headers.push("Accept-Language", accept_language);
        }

        if sends_sec_fetch(&browser) {
            let attributes = if browser.is_http2() {
                &SEC_FETCH_HTTP2
            } else {
                &SEC_FETCH_HTTP1
            };
            for (name, value) in attributes {
                headers.push(*name, *value);
            }
        }

        for (name, value) in &options.request_dependent_headers {
            headers.set(name, value);
        }

        Ok((self.order_headers(headers), sample))
    }

    /// Resolves the caller options into per-node allowed sets over the
    /// input network, including values induced by a pinned user agent.
    fn resolve_constraints(&self, options: &HeaderOptions) -> Result<ConstraintSet> {
        let specs: Vec<BrowserSpec> = if options.browsers.is_empty() {
            SUPPORTED_BROWSERS.iter().map(|name| BrowserSpec::new(*name)).collect()
        } else {
            options.browsers.clone()
        };
        let browser_http: Vec<String> = self
            .unique_browsers
            .iter()
            .filter(|entry| specs.iter().any(|spec| spec.matches(entry, options.http_version)))
            .map(|entry| entry.complete.clone())
            .collect();

        let mut constraints = ConstraintSet::default();
        constraints.allow(BROWSER_HTTP_NODE, browser_http);
        if !options.operating_systems.is_empty() {
            constraints.allow(OPERATING_SYSTEM_NODE, options.operating_systems.clone());
        }
        if !options.devices.is_empty() {
            constraints.allow(DEVICE_NODE, options.devices.clone());
        }

        if !options.user_agent.is_empty() {
            let mut induced_browser_http: Vec<String> = Vec::new();
            let mut induced_os: Vec<String> = Vec::new();
            for node in USER_AGENT_NODES {
                let induced = self
                    .header_network
                    .induced_values(&[(node.to_string(), options.user_agent.clone())])?;
                for value in induced.get(BROWSER_HTTP_NODE).into_iter().flatten() {
                    if !induced_browser_http.contains(value) {
                        induced_browser_http.push(value.clone());
                    }
                }
                for value in induced.get(OPERATING_SYSTEM_NODE).into_iter().flatten() {
                    if !induced_os.contains(value) {
                        induced_os.push(value.clone());
                    }
                }
            }
            if !induced_browser_http.is_empty() {
                constraints.intersect(BROWSER_HTTP_NODE, &induced_browser_http);
            }
            if !induced_os.is_empty() {
                constraints.intersect(OPERATING_SYSTEM_NODE, &induced_os);
            }
        }
        Ok(constraints)
    }

    /// Reorders headers to the sampled browser family's wire order. Headers
    /// outside the known order (request-dependent ones) keep their relative
    /// position at the end.
    fn order_headers(&self, headers: Headers) -> Headers {
        let order = util::user_agent(&headers)
            .and_then(util::browser_family)
            .and_then(|family| self.headers_order.get(family));
        let Some(order) = order else { return headers };

        let mut ordered = Headers::default();
        for name in order {
            if let Some(value) = headers.get(name) {
                ordered.push(name.as_str(), value);
            }
        }
        for (name, value) in headers.iter() {
            if !order.iter().any(|o| o == name) {
                ordered.push(name, value);
            }
        }
        ordered
    }
}

fn validate_options(options: &HeaderOptions) -> Result<()> {
    for spec in &options.browsers {
        spec.validate()?;
    }
    validate_values(
        "operating system",
        &options.operating_systems,
        SUPPORTED_OPERATING_SYSTEMS,
    )?;
    validate_values("device", &options.devices, SUPPORTED_DEVICES)?;
    if options.locales.is_empty() {
        return Err(ForgeprintError::Validation(
            "at least one locale is required".into(),
        ));
    }
    if options.locales.len() > MAX_LOCALES {
        return Err(ForgeprintError::Validation(format!(
            "too many locales: {} given, at most {MAX_LOCALES} are supported",
            options.locales.len()
        )));
    }
    Ok(())
}

/// Accept-Language value with a strictly decreasing quality ladder: the
/// first locale is q=1.0 and every following one steps down by 0.1. A
/// single locale carries no quality value at all.
fn accept_language_value(locales: &[String]) -> String {
    if locales.len() == 1 {
        return locales[0].clone();
    }
    locales
        .iter()
        .enumerate()
        .map(|(index, locale)| format!("{locale};q={:.1}", 1.0 - index as f64 * 0.1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sec-Fetch metadata shipped from Chrome 76, Firefox 90, and Edge 79 on.
fn sends_sec_fetch(browser: &HttpBrowser) -> bool {
    match browser.name.as_str() {
        "chrome" => browser.major() >= 76,
        "firefox" => browser.major() >= 90,
        "edge" => browser.major() >= 79,
        _ => false,
    }
}

fn unique_browsers() -> Result<&'static [HttpBrowser]> {
    static CELL: OnceCell<Vec<HttpBrowser>> = OnceCell::new();
    CELL.get_or_try_init(|| {
        let raw: Vec<String> = serde_json::from_slice(BROWSER_HELPER_JSON)?;
        raw.iter()
            .filter(|entry| entry.as_str() != MISSING_VALUE)
            .map(|entry| HttpBrowser::parse(entry))
            .collect()
    })
    .map(Vec::as_slice)
}

fn headers_order() -> Result<&'static HashMap<String, Vec<String>>> {
    static CELL: OnceCell<HashMap<String, Vec<String>>> = OnceCell::new();
    CELL.get_or_try_init(|| Ok(serde_json::from_slice(HEADERS_ORDER_JSON)?))
}
