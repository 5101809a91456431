//! Keypair files.

use std::path::Path;

use anyhow::{bail, Context, Result};
use sol_tx::Keypair;
use zeroize::Zeroizing;

/// Loads a keypair stored either as raw 64 bytes or as the JSON byte array
/// written by `solana-keygen`.
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let contents = Zeroizing::new(
        std::fs::read(path)
            .with_context(|| format!("failed to read keypair file: {}", path.display()))?,
    );

    let bytes = if contents.len() == 64 {
        contents
    } else {
        let parsed: Vec<u8> =
            serde_json::from_slice(&contents).context("failed to parse keypair JSON")?;
        Zeroizing::new(parsed)
    };

    if bytes.len() != 64 {
        bail!("invalid keypair length: expected 64 bytes, got {}", bytes.len());
    }
    if bytes.iter().all(|&b| b == 0) {
        bail!("invalid keypair: all-zero key rejected");
    }
    Keypair::from_bytes(&bytes).context("invalid keypair bytes")
}
