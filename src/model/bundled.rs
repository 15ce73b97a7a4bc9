//! Pretrained model artifacts shipped with the crate.
//!
//! Each network is parsed at most once per process; the first caller
//! performs the load and every later caller shares the same immutable
//! instance. A refreshed artifact obtained through an external
//! distribution channel can always be loaded explicitly with
//! [`Network::from_path`](super::Network::from_path) instead.

use once_cell::sync::OnceCell;

use super::Network;
use crate::error::Result;

static INPUT_NETWORK_JSON: &[u8] = include_bytes!("../../data/input-network.json");
static HEADER_NETWORK_JSON: &[u8] = include_bytes!("../../data/header-network.json");
static FINGERPRINT_NETWORK_JSON: &[u8] = include_bytes!("../../data/fingerprint-network.json");

/// The browser/OS/device input network used to seed header generation.
pub fn input_network() -> Result<&'static Network> {
    static CELL: OnceCell<Network> = OnceCell::new();
    CELL.get_or_try_init(|| Network::from_slice(INPUT_NETWORK_JSON))
}

/// The full header network.
pub fn header_network() -> Result<&'static Network> {
    static CELL: OnceCell<Network> = OnceCell::new();
    CELL.get_or_try_init(|| Network::from_slice(HEADER_NETWORK_JSON))
}

/// The device/environment fingerprint network.
pub fn fingerprint_network() -> Result<&'static Network> {
    static CELL: OnceCell<Network> = OnceCell::new();
    CELL.get_or_try_init(|| Network::from_slice(FINGERPRINT_NETWORK_JSON))
}
