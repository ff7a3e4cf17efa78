//! Version information display
//!
//! Prints the package version and the default widget preset in human or
//! JSON format.

use serde_json::json;

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::config::schema::Variant;

/// Print version information.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    let variant = Variant::default().as_str();

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version} (default variant: {variant})");
        }
        OutputFormat::Json => {
            let info = json!({
                "name": name,
                "version": version,
                "default_variant": variant,
            });
            println!("{info}");
        }
    }
}
