//! Statistically consistent browser identities.
//!
//! forgeprint samples HTTP header collections and full device/browser
//! fingerprints from a pretrained Bayesian network, so the generated
//! attributes carry real-world joint correlations (a macOS User-Agent comes
//! with Retina screen geometry and an Apple GPU, a Firefox identity never
//! carries client-hint headers) instead of independent per-field
//! randomness.
//!
//! # Examples
//!
//! ```no_run
//! use forgeprint::{BrowserSpec, HeaderGenerator, HeaderOptions, HttpVersion};
//!
//! let generator = HeaderGenerator::with_options(HeaderOptions {
//!     browsers: vec![BrowserSpec::new("firefox").min_version(121)],
//!     http_version: HttpVersion::V1,
//!     ..HeaderOptions::default()
//! })?;
//! let headers = generator.generate()?;
//! assert!(headers.get("User-Agent").unwrap().contains("Firefox"));
//! # Ok::<(), forgeprint::ForgeprintError>(())
//! ```
//!
//! ```no_run
//! use forgeprint::{FingerprintGenerator, FingerprintOptions, Screen};
//!
//! let generator = FingerprintGenerator::with_options(FingerprintOptions {
//!     screen: Some(Screen { min_width: Some(1280), ..Screen::default() }),
//!     ..FingerprintOptions::default()
//! })?;
//! let fingerprint = generator.generate()?;
//! assert!(fingerprint.screen.width >= 1280);
//! # Ok::<(), forgeprint::ForgeprintError>(())
//! ```
//!
//! Generation is deterministic for a fixed random source: see
//! [`HeaderGenerator::generate_with_rng`] and
//! [`FingerprintGenerator::generate_with_rng`].

pub mod constraints;
pub mod error;
pub mod fingerprint;
pub mod headers;
pub mod model;
mod sampler;

pub use constraints::{
    BrowserSpec, HttpVersion, Screen, MAX_LOCALES, SUPPORTED_BROWSERS, SUPPORTED_DEVICES,
    SUPPORTED_OPERATING_SYSTEMS,
};
pub use error::{ForgeprintError, Result};
pub use fingerprint::{
    Fingerprint, FingerprintGenerator, FingerprintOptions, NavigatorFingerprint,
    ScreenFingerprint, VideoCard,
};
pub use headers::{only_injectable_headers, HeaderGenerator, HeaderOptions, Headers};
pub use model::Network;
pub use sampler::Assignment;
