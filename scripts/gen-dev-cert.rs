//! Dev certificate generator for the bumper server
//!
//! Run from the repository root with `cargo run --manifest-path scripts/Cargo.toml`.
//! Writes a self-signed localhost certificate to `certs/`, where the server
//! looks when `TLS_CERT_PATH`/`TLS_KEY_PATH` are unset.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use ring::digest::{digest, SHA256};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

const CERT_DIR: &str = "certs";
const CERT_FILE: &str = "certs/cert.pem";
const KEY_FILE: &str = "certs/key.pem";

// Browsers only accept pinned certificate hashes for certs valid at most 14 days
const VALIDITY: Duration = Duration::from_secs(14 * 24 * 60 * 60);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let force = std::env::args().any(|arg| arg == "--force");

    if !force && Path::new(CERT_FILE).exists() && Path::new(KEY_FILE).exists() {
        println!("Certificates already exist in {}/ (pass --force to regenerate)", CERT_DIR);
        print_hash()?;
        return Ok(());
    }

    println!("Generating localhost certificate for the bumper arena...");
    fs::create_dir_all(CERT_DIR)?;

    let mut params = CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])?;
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, "Bumper Arena Dev");

    let now = SystemTime::now();
    params.not_before = now.into();
    params.not_after = (now + VALIDITY).into();

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    fs::write(CERT_FILE, cert.pem())?;
    fs::write(KEY_FILE, key_pair.serialize_pem())?;
    println!("Wrote {} and {}", CERT_FILE, KEY_FILE);

    print_hash()
}

/// Print the base64 SHA-256 of the certificate, the value clients pin
fn print_hash() -> Result<(), Box<dyn std::error::Error>> {
    let cert_pem = fs::read_to_string(CERT_FILE)?;
    let der = pem::parse(&cert_pem)?;
    let hash = STANDARD.encode(digest(&SHA256, der.contents()).as_ref());

    println!();
    println!("Certificate hash (serverCertificateHashes):");
    println!("  {}", hash);
    Ok(())
}
