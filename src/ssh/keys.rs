use anyhow::{Context, Result};
use russh::keys::{Algorithm, PrivateKey};
use std::path::Path;
use tracing::{info, warn};

/// Load the host key at `path`, or create one when allowed.
///
/// With `generate` off a missing key is a startup error. A present key that
/// cannot be decoded is always an error, never silently replaced.
pub fn load_or_generate_host_key(
    path: &Path,
    passphrase: Option<&str>,
    generate: bool,
) -> Result<PrivateKey> {
    if path.exists() {
        return load_host_key(path, passphrase);
    }
    if !generate {
        anyhow::bail!(
            "host key not found at {} (set server.generate_host_key = true to create one)",
            path.display()
        );
    }
    if passphrase.is_some() {
        warn!(
            path = %path.display(),
            "Key passphrase is set but the generated host key is stored unencrypted"
        );
    }
    let key = generate_host_key()?;
    save_host_key(&key, path)?;
    info!(path = %path.display(), "Generated new Ed25519 host key");
    Ok(key)
}

/// Decode an OpenSSH or PKCS#8 private key, decrypting it with `passphrase` if given.
pub fn load_host_key(path: &Path, passphrase: Option<&str>) -> Result<PrivateKey> {
    let key_text = std::fs::read_to_string(path)
        .with_context(|| format!("reading host key: {}", path.display()))?;
    russh::keys::decode_secret_key(&key_text, passphrase)
        .map_err(|e| anyhow::anyhow!("decoding host key {}: {}", path.display(), e))
}

pub fn generate_host_key() -> Result<PrivateKey> {
    PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ed25519)
        .map_err(|e| anyhow::anyhow!("Ed25519 key generation failed: {}", e))
}

pub fn save_host_key(key: &PrivateKey, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory: {}", parent.display()))?;
        }
    }

    let mut buf = Vec::new();
    russh::keys::encode_pkcs8_pem(key, &mut buf)
        .map_err(|e| anyhow::anyhow!("encoding host key: {}", e))?;

    // Create with 0600 directly so the key is never world-readable.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("creating host key file: {}", path.display()))?;
        file.write_all(&buf)
            .with_context(|| format!("writing host key: {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, &buf)
            .with_context(|| format!("writing host key: {}", path.display()))?;
    }

    Ok(())
}
