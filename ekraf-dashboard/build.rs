//! Build script for ekraf-dashboard.
//!
//! Copies the demo fixture CSVs into OUT_DIR so they can be embedded via
//! `include_str!`. A missing or malformed fixture becomes an empty
//! placeholder and demo mode starts with that table empty.

use std::env;
use std::fs;
use std::path::Path;

const FIXTURES: [&str; 3] = [
    "investment_records.csv",
    "patent_registrations.csv",
    "pdki_filings.csv",
];

/// A fixture is usable when its header row parses and every record has the
/// header's width.
fn well_formed(path: &Path) -> Result<(), String> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| e.to_string())?;
    let width = rdr.headers().map_err(|e| e.to_string())?.len();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != width {
            return Err(format!("row {} has {} fields, expected {}", line + 2, record.len(), width));
        }
    }
    Ok(())
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();

    for name in FIXTURES {
        let src_path = format!("../fixtures/{}", name);
        let src = Path::new(&src_path);
        let dest = Path::new(&out_dir).join(name);
        let usable = match well_formed(src) {
            Ok(()) => true,
            Err(e) => {
                println!("cargo:warning=Fixture {} unusable ({}), using empty placeholder", src_path, e);
                false
            }
        };
        if usable {
            fs::copy(src, &dest).unwrap_or_else(|e| {
                panic!("Failed to copy {} to {}: {}", src_path, dest.display(), e);
            });
        } else {
            fs::write(&dest, "").unwrap();
        }
        println!("cargo:rerun-if-changed={}", src_path);
    }

    println!("cargo:rerun-if-env-changed=EKRAF_BACKEND_URL");
    println!("cargo:rerun-if-env-changed=EKRAF_ANON_KEY");
    println!("cargo:rerun-if-changed=build.rs");
}
