//! `topomap version`

use crate::layout::LayoutEngine;

/// Print name, version and the available layout engines
pub fn display_version() {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("  {}", env!("CARGO_PKG_DESCRIPTION"));
    println!(
        "  Layout engines: {} (default), {}",
        LayoutEngine::Layered,
        LayoutEngine::Radial
    );
    println!("  License: {}", env!("CARGO_PKG_LICENSE"));
}
