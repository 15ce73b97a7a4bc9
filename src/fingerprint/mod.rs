//! Full device/browser fingerprint composition.
//!
//! A fingerprint extends a header collection with the remaining
//! environment attributes (screen geometry, navigator properties, codec
//! support, graphics identity, fonts), all sampled from the bundled
//! fingerprint network so they stay mutually consistent with the chosen
//! User-Agent. The record's JSON shape matches what injection tooling
//! consumes, so field names serialize in camelCase.

use std::collections::HashMap;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::constraints::{ConstraintSet, Screen};
use crate::error::{ForgeprintError, Result};
use crate::headers::{HeaderGenerator, HeaderOptions, Headers};
use crate::model::{fingerprint_network, Network, MISSING_VALUE, STRINGIFIED_PREFIX};
use crate::sampler::{self, Assignment};

const USER_AGENT_NODE: &str = "userAgent";
const SCREEN_NODE: &str = "screen";

/// `window.screen` and window-dimension attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScreenFingerprint {
    pub avail_height: i64,
    pub avail_width: i64,
    pub avail_top: i64,
    pub avail_left: i64,
    pub color_depth: i64,
    pub height: i64,
    pub pixel_depth: i64,
    pub width: i64,
    pub device_pixel_ratio: f64,
    pub page_x_offset: i64,
    pub page_y_offset: i64,
    pub inner_height: i64,
    pub outer_height: i64,
    pub outer_width: i64,
    pub inner_width: i64,
    pub screen_x: i64,
    pub client_width: i64,
    pub client_height: i64,
    #[serde(rename = "hasHDR")]
    pub has_hdr: bool,
}

/// `navigator` attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorFingerprint {
    pub user_agent: String,
    /// Structured client hints; absent outside the Chromium family.
    pub user_agent_data: Option<Value>,
    pub do_not_track: Option<String>,
    pub app_code_name: String,
    pub app_name: String,
    pub app_version: String,
    /// Firefox-only.
    pub oscpu: Option<String>,
    pub webdriver: bool,
    pub language: String,
    pub languages: Vec<String>,
    pub platform: String,
    /// Absent in Safari, which never implemented the API.
    pub device_memory: Option<u64>,
    pub hardware_concurrency: u64,
    pub product: String,
    pub product_sub: String,
    pub vendor: String,
    pub vendor_sub: String,
    pub max_touch_points: i64,
    pub extra_properties: Value,
}

/// WebGL renderer identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoCard {
    pub renderer: String,
    pub vendor: String,
}

/// One complete synthetic browser identity: ordered headers plus the
/// device/environment attributes describing the same machine. The caller
/// owns the record outright; the generator keeps no reference to it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub screen: ScreenFingerprint,
    pub navigator: NavigatorFingerprint,
    pub headers: Headers,
    pub video_codecs: HashMap<String, String>,
    pub audio_codecs: HashMap<String, String>,
    pub plugins_data: Value,
    pub battery: Option<Value>,
    pub video_card: Option<VideoCard>,
    pub multimedia_devices: Vec<String>,
    pub fonts: Vec<String>,
    #[serde(rename = "mockWebRTC")]
    pub mock_webrtc: bool,
    pub slim: bool,
}

impl Fingerprint {
    /// Serializes the record in the camelCase shape injection tooling
    /// expects.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fingerprint generation constraints on top of [`HeaderOptions`].
#[derive(Debug, Clone, Default)]
pub struct FingerprintOptions {
    /// Numeric bounds on the sampled screen geometry.
    pub screen: Option<Screen>,
    /// Fail instead of relaxing constraints that admit no sample. Applies
    /// to the whole pipeline, headers included.
    pub strict: bool,
    /// Passed through to the injection layer; does not affect sampling.
    pub mock_webrtc: bool,
    /// Passed through to the injection layer; does not affect sampling.
    pub slim: bool,
    pub headers: HeaderOptions,
}

/// Generates complete, internally consistent browser fingerprints.
pub struct FingerprintGenerator {
    options: FingerprintOptions,
    header_generator: HeaderGenerator,
    network: &'static Network,
}

impl FingerprintGenerator {
    pub fn new() -> Result<Self> {
        Self::with_options(FingerprintOptions::default())
    }

    pub fn with_options(options: FingerprintOptions) -> Result<Self> {
        if let Some(screen) = &options.screen {
            screen.validate()?;
        }
        let header_generator = HeaderGenerator::with_options(options.headers.clone())?;
        Ok(Self {
            options,
            header_generator,
            network: fingerprint_network()?,
        })
    }

    /// Generates one fingerprint with a fresh random source.
    pub fn generate(&self) -> Result<Fingerprint> {
        self.generate_with_rng(&mut rand::thread_rng())
    }

    /// Generates one fingerprint, consuming randomness only from `rng`: a
    /// fixed random-source state yields an identical record.
    pub fn generate_with_rng(&self, rng: &mut impl Rng) -> Result<Fingerprint> {
        let options = &self.options;
        let strict = options.strict;

        // Resolve screen bounds into an allowed subset of the screen
        // catalog, and let the network induce which user agents can
        // plausibly come with such a screen.
        let mut screen_allowed: Option<Vec<String>> = None;
        let mut induced_user_agents: Option<Vec<String>> = None;
        if let Some(screen) = options.screen.filter(Screen::is_set) {
            screen.validate()?;
            let catalog = self
                .network
                .node(SCREEN_NODE)
                .ok_or_else(|| missing_node(SCREEN_NODE))?
                .possible_values();
            let allowed: Vec<String> = catalog
                .iter()
                .filter(|value| {
                    screen_dimensions(value)
                        .map_or(false, |(width, height)| screen.admits(width, height))
                })
                .cloned()
                .collect();
            if allowed.is_empty() {
                if strict {
                    return Err(ForgeprintError::StrictGeneration);
                }
                warn!("screen constraints admit no catalog value; ignoring them");
            } else {
                let induced = self
                    .network
                    .induced_values(&[(SCREEN_NODE.to_string(), allowed.clone())])?;
                induced_user_agents = induced.get(USER_AGENT_NODE).cloned();
                screen_allowed = Some(allowed);
            }
        }

        // Generate headers first; the fingerprint then completes around
        // the concrete User-Agent they carry.
        let mut header_options = options.headers.clone();
        header_options.strict = header_options.strict || strict;
        if header_options.user_agent.is_empty() {
            if let Some(candidates) = induced_user_agents {
                header_options.user_agent = candidates;
            }
        }
        let (headers, _) = self
            .header_generator
            .generate_sampled(&header_options, rng)?;
        let user_agent = headers
            .user_agent()
            .ok_or_else(|| missing_node("User-Agent"))?
            .to_string();

        let mut constraints = ConstraintSet::default();
        constraints.pin(USER_AGENT_NODE, &user_agent);
        if let Some(allowed) = screen_allowed {
            constraints.allow(SCREEN_NODE, allowed);
        }
        let sample = sampler::sample(self.network, &constraints, strict, rng)?;

        compose(&sample, headers, options)
    }
}

/// Assembles the typed record from a raw fingerprint-network assignment.
fn compose(
    sample: &Assignment,
    headers: Headers,
    options: &FingerprintOptions,
) -> Result<Fingerprint> {
    let languages = parse_languages(&headers);
    let language = languages
        .first()
        .cloned()
        .unwrap_or_else(|| "en-US".to_string());

    let navigator = NavigatorFingerprint {
        user_agent: required(sample, "userAgent")?.to_string(),
        user_agent_data: optional(sample, "userAgentData")
            .map(|value| unpack_stringified(value, "userAgentData"))
            .transpose()?,
        do_not_track: optional(sample, "doNotTrack").map(str::to_string),
        app_code_name: required(sample, "appCodeName")?.to_string(),
        app_name: required(sample, "appName")?.to_string(),
        app_version: required(sample, "appVersion")?.to_string(),
        oscpu: optional(sample, "oscpu").map(str::to_string),
        webdriver: required(sample, "webdriver")? == "true",
        language,
        languages,
        platform: required(sample, "platform")?.to_string(),
        device_memory: optional(sample, "deviceMemory")
            .map(|value| parse_number(value, "deviceMemory"))
            .transpose()?,
        hardware_concurrency: parse_number(required(sample, "hardwareConcurrency")?, "hardwareConcurrency")?,
        product: required(sample, "product")?.to_string(),
        product_sub: required(sample, "productSub")?.to_string(),
        vendor: required(sample, "vendor")?.to_string(),
        vendor_sub: required(sample, "vendorSub")?.to_string(),
        max_touch_points: parse_number(required(sample, "maxTouchPoints")?, "maxTouchPoints")?,
        extra_properties: optional(sample, "extraProperties")
            .map(|value| unpack_stringified(value, "extraProperties"))
            .transpose()?
            .unwrap_or_else(|| Value::Object(Default::default())),
    };

    Ok(Fingerprint {
        screen: unpack_stringified(required(sample, SCREEN_NODE)?, SCREEN_NODE)?,
        navigator,
        headers,
        video_codecs: unpack_stringified(required(sample, "videoCodecs")?, "videoCodecs")?,
        audio_codecs: unpack_stringified(required(sample, "audioCodecs")?, "audioCodecs")?,
        plugins_data: unpack_stringified(required(sample, "pluginsData")?, "pluginsData")?,
        battery: optional(sample, "battery")
            .map(|value| unpack_stringified(value, "battery"))
            .transpose()?,
        video_card: optional(sample, "videoCard")
            .map(|value| unpack_stringified(value, "videoCard"))
            .transpose()?,
        multimedia_devices: unpack_stringified(
            required(sample, "multimediaDevices")?,
            "multimediaDevices",
        )?,
        fonts: unpack_stringified(required(sample, "fonts")?, "fonts")?,
        mock_webrtc: options.mock_webrtc,
        slim: options.slim,
    })
}

/// Locales accepted by the generated headers, in preference order.
fn parse_languages(headers: &Headers) -> Vec<String> {
    let value = headers
        .get("Accept-Language")
        .or_else(|| headers.get("accept-language"))
        .unwrap_or("");
    value
        .split(',')
        .map(|entry| entry.split(';').next().unwrap_or("").trim().to_string())
        .filter(|locale| !locale.is_empty())
        .collect()
}

fn required<'a>(sample: &'a Assignment, node: &str) -> Result<&'a str> {
    match sample.get(node) {
        Some(value) if value != MISSING_VALUE => Ok(value),
        _ => Err(missing_node(node)),
    }
}

fn optional<'a>(sample: &'a Assignment, node: &str) -> Option<&'a str> {
    sample.get(node).filter(|value| *value != MISSING_VALUE)
}

fn unpack_stringified<T: DeserializeOwned>(value: &str, node: &str) -> Result<T> {
    let json = value
        .strip_prefix(STRINGIFIED_PREFIX)
        .ok_or_else(|| ForgeprintError::ModelLoad {
            node: node.to_string(),
            reason: "expected a packed JSON value".into(),
        })?;
    serde_json::from_str(json).map_err(|err| ForgeprintError::ModelLoad {
        node: node.to_string(),
        reason: err.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(value: &str, node: &str) -> Result<T> {
    value.parse().map_err(|_| ForgeprintError::ModelLoad {
        node: node.to_string(),
        reason: format!("expected a numeric value, got '{value}'"),
    })
}

fn missing_node(node: &str) -> ForgeprintError {
    ForgeprintError::ModelLoad {
        node: node.to_string(),
        reason: "attribute missing from the fingerprint model".into(),
    }
}

/// Width/height packed inside a screen catalog value.
fn screen_dimensions(value: &str) -> Option<(i64, i64)> {
    let json = value.strip_prefix(STRINGIFIED_PREFIX)?;
    let parsed: Value = serde_json::from_str(json).ok()?;
    Some((
        parsed.get("width")?.as_i64()?,
        parsed.get("height")?.as_i64()?,
    ))
}
