//! Signed transactions and their wire format.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message                 (see `message`)
//! ```

use crate::address::Address;
use crate::error::TxError;
use crate::keypair::{Signature, Signer};
use crate::message::Message;
use crate::wire::{push_len, Reader};

/// A message plus one verified signature per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    signatures: Vec<Signature>,
    message: Message,
}

impl Transaction {
    /// Sign `message` with every required signer found in `signers`.
    ///
    /// Fails with [`TxError::IncompleteSignature`] if any required signer is
    /// absent, and with [`TxError::Signing`] if a signer has no key
    /// material. Signers the message does not require are ignored.
    pub fn sign(message: Message, signers: &[&dyn Signer]) -> Result<Self, TxError> {
        let missing: Vec<Address> = message
            .required_signers()
            .iter()
            .filter(|required| !signers.iter().any(|s| s.address() == **required))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(TxError::IncompleteSignature { missing });
        }

        let message_bytes = message.serialize()?;
        let mut signatures = Vec::with_capacity(message.required_signers().len());
        for required in message.required_signers() {
            let signer = signers
                .iter()
                .find(|s| s.address() == *required)
                .ok_or_else(|| TxError::IncompleteSignature {
                    missing: vec![*required],
                })?;
            signatures.push(signer.try_sign_message(&message_bytes)?);
        }

        let tx = Self {
            signatures,
            message,
        };
        tx.verify_bytes(&message_bytes)?;
        Ok(tx)
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// The fee payer's signature, which identifies the transaction.
    pub fn signature(&self) -> &Signature {
        &self.signatures[0]
    }

    /// Check that there is one valid signature per required signer.
    pub fn verify(&self) -> Result<(), TxError> {
        self.verify_bytes(&self.message.serialize()?)
    }

    fn verify_bytes(&self, message_bytes: &[u8]) -> Result<(), TxError> {
        let required = self.message.required_signers();
        if self.signatures.len() != required.len() {
            return Err(TxError::IncompleteSignature {
                missing: required[self.signatures.len().min(required.len())..].to_vec(),
            });
        }
        for (signature, signer) in self.signatures.iter().zip(required) {
            if !signature.verify(signer, message_bytes) {
                return Err(TxError::InvalidSignature(*signer));
            }
        }
        Ok(())
    }

    /// Serialize into the wire format accepted by `sendTransaction`.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, TxError> {
        let message_bytes = self.message.serialize()?;
        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message_bytes.len());
        push_len(&mut wire, self.signatures.len(), "signatures")?;
        for signature in &self.signatures {
            wire.extend_from_slice(signature.as_bytes());
        }
        wire.extend_from_slice(&message_bytes);
        Ok(wire)
    }

    /// Parse a wire-format transaction. Signatures are not verified; call
    /// [`Transaction::verify`] for that.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let mut reader = Reader::new(bytes);

        let num_signatures = reader.read_compact_u16()? as usize;
        if num_signatures == 0 {
            return Err(TxError::Serialization(
                "transaction has zero signatures".into(),
            ));
        }
        let mut signatures = Vec::with_capacity(num_signatures);
        for _ in 0..num_signatures {
            signatures.push(Signature::new(reader.read_array::<64>()?));
        }

        let message = Message::read(&mut reader)?;
        if !reader.is_empty() {
            return Err(TxError::Serialization(format!(
                "{} trailing bytes after message",
                bytes.len() - reader.position()
            )));
        }
        if signatures.len() != message.required_signers().len() {
            return Err(TxError::Serialization(format!(
                "{} signatures for {} required signers",
                signatures.len(),
                message.required_signers().len()
            )));
        }

        Ok(Self {
            signatures,
            message,
        })
    }
}
