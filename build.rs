use std::fs;
use std::time::UNIX_EPOCH;

const GAS_SCRIPT: &str = "gas/PoliceAppSync.gs";

fn main() {
    // Modification time of the bundled Apps Script, shown on the settings page
    if let Ok(metadata) = fs::metadata(GAS_SCRIPT) {
        if let Ok(modified) = metadata.modified() {
            if let Ok(duration) = modified.duration_since(UNIX_EPOCH) {
                println!("cargo:rustc-env=GAS_SCRIPT_MODIFIED={}", duration.as_secs());
            }
        }
    } else {
        println!("cargo:warning=Could not read {}", GAS_SCRIPT);
    }

    println!("cargo:rerun-if-changed={}", GAS_SCRIPT);
}
