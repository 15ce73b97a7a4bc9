//! Prints one full fingerprint record as JSON.
//!
//! Run with: cargo run --example generate_fingerprint

use forgeprint::{FingerprintGenerator, FingerprintOptions, Screen};

fn main() -> forgeprint::Result<()> {
    let generator = FingerprintGenerator::with_options(FingerprintOptions {
        screen: Some(Screen {
            min_width: Some(1280),
            ..Screen::default()
        }),
        ..FingerprintOptions::default()
    })?;
    let fingerprint = generator.generate()?;
    println!("{}", fingerprint.to_json()?);
    Ok(())
}
