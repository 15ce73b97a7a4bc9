//! Prints a few generated header collections.
//!
//! Run with: cargo run --example generate_headers

use forgeprint::{HeaderGenerator, HeaderOptions, HttpVersion};

fn main() -> forgeprint::Result<()> {
    let generator = HeaderGenerator::new()?;
    println!("--- unconstrained (HTTP/2) ---");
    for (name, value) in generator.generate()?.iter() {
        println!("{name}: {value}");
    }

    let firefox = HeaderGenerator::with_options(HeaderOptions {
        browsers: vec!["firefox".into()],
        http_version: HttpVersion::V1,
        locales: vec!["en-GB".into(), "en".into()],
        ..HeaderOptions::default()
    })?;
    println!("\n--- firefox over HTTP/1.1 ---");
    for (name, value) in firefox.generate()?.iter() {
        println!("{name}: {value}");
    }
    Ok(())
}
