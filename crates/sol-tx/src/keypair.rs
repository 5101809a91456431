//! Key-holding identities and the [`Signer`] abstraction.
//!
//! Signing is local and network-free. The only way it can fail is when an
//! identity has no key material (see [`NullSigner`]); malformed input is a
//! composition bug and is never reported as a signing error.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::Signer as _;
use rand_core::OsRng;
use zeroize::{Zeroize, Zeroizing};

use crate::address::Address;
use crate::error::TxError;

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Check this signature against `message` for the key behind `signer`.
    pub fn verify(&self, signer: &Address, message: &[u8]) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&self.0);
        key.verify_strict(message, &signature).is_ok()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TxError::Serialization(format!("signature base58 decode failed: {e}")))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            TxError::Serialization(format!("expected 64 signature bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

/// Anything that can sign a transaction message on behalf of an address.
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, TxError>;
}

/// An Ed25519 key pair plus its derived address.
///
/// The secret half is zeroed on drop and never shows up in `Debug` output.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a fresh key pair from the operating system RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a key pair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut copy = *seed;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&copy);
        copy.zeroize();
        Self { signing_key }
    }

    /// Build a key pair from the 64-byte `secret || public` layout used by
    /// Solana keypair files. The public half must match the secret half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let mut arr: [u8; 64] = bytes.try_into().map_err(|_| {
            TxError::InvalidKeypair(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        let result = ed25519_dalek::SigningKey::from_keypair_bytes(&arr)
            .map_err(|e| TxError::InvalidKeypair(format!("public key mismatch: {e}")));
        arr.zeroize();
        Ok(Self {
            signing_key: result?,
        })
    }

    /// The 64-byte `secret || public` encoding, zeroed when dropped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl Signer for Keypair {
    fn address(&self) -> Address {
        Keypair::address(self)
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, TxError> {
        Ok(self.sign_message(message))
    }
}

/// An identity whose key material is not available in this process.
///
/// Useful to describe a required signer while assembling a message; any
/// attempt to sign with it fails with [`TxError::Signing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullSigner {
    address: Address,
}

impl NullSigner {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl Signer for NullSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn try_sign_message(&self, _message: &[u8]) -> Result<Signature, TxError> {
        Err(TxError::Signing(format!(
            "no key material available for {}",
            self.address
        )))
    }
}
