use dotenv::dotenv;
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use toml::Value;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Writes `APP_METADATA_*` constants into `$OUT_DIR/app_metadata.rs`.
struct AppMetadata {
    file: File,
}

impl AppMetadata {
    fn create() -> io::Result<Self> {
        let out_dir = env::var("OUT_DIR").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        let file = File::create(Path::new(&out_dir).join("app_metadata.rs"))?;
        Ok(Self { file })
    }

    fn write_str(&mut self, key: &str, value: &str) -> io::Result<()> {
        writeln!(self.file, "#[allow(unused)]\npub const APP_METADATA_{}: &str = {:?};", key.to_uppercase(), value)
    }

    fn write_bytes(&mut self, key: &str, value: &[u8]) -> io::Result<()> {
        let bytes = value.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(", ");
        writeln!(
            self.file,
            "#[allow(unused)]\npub const APP_METADATA_{}: &[u8; {}] = &[{}];",
            key.to_uppercase(),
            value.len(),
            bytes
        )
    }
}

/// Pads or truncates `seed` to exactly `len` bytes.
fn fit(mut seed: String, len: usize) -> Vec<u8> {
    seed.truncate(len);
    while seed.len() < len {
        seed.push('!');
    }
    seed.into_bytes()
}

/// Key material for sealing tokens at rest.
///
/// `ENCRYPTION_KEY` (32 bytes) and `ENCRYPTION_IV` (16 bytes) come from the
/// environment or a `.env` file; without them a per-package default is derived.
fn sealing_key(package: &str) -> (Vec<u8>, Vec<u8>) {
    match (env::var("ENCRYPTION_KEY"), env::var("ENCRYPTION_IV")) {
        (Ok(key), Ok(iv)) => {
            if key.len() != KEY_LEN {
                panic!("ENCRYPTION_KEY must be exactly {} bytes long, got {} bytes", KEY_LEN, key.len());
            }
            if iv.len() != IV_LEN {
                panic!("ENCRYPTION_IV must be exactly {} bytes long, got {} bytes", IV_LEN, iv.len());
            }
            (key.into_bytes(), iv.into_bytes())
        }
        _ => {
            println!("cargo:warning=ENCRYPTION_KEY or ENCRYPTION_IV not set, stored tokens use the default key.");
            (
                fit(format!("{}_token_sealing_key_default", package), KEY_LEN),
                fit(format!("{}_iv_default", package), IV_LEN),
            )
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenv();
    println!("cargo:rerun-if-env-changed=ENCRYPTION_KEY");
    println!("cargo:rerun-if-env-changed=ENCRYPTION_IV");
    println!("cargo:rerun-if-changed=Cargo.toml");

    let package = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "dwellsync".to_string());
    let mut metadata = AppMetadata::create()?;
    metadata.write_str("NAME", &package)?;
    metadata.write_str("VERSION", &env::var("CARGO_PKG_VERSION").unwrap_or_default())?;

    let manifest = std::fs::read_to_string("Cargo.toml")?;
    let manifest: Value = toml::from_str(&manifest).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if let Some(table) = manifest.get("package").and_then(|p| p.get("metadata")).and_then(|m| m.as_table()) {
        for (key, value) in table {
            if let Some(value) = value.as_str() {
                metadata.write_str(key, value)?;
            }
        }
    }

    let (key, iv) = sealing_key(&package);
    metadata.write_bytes("ENCRYPTION_KEY", &key)?;
    metadata.write_bytes("ENCRYPTION_IV", &iv)?;

    Ok(())
}
