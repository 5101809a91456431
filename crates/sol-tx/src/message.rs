//! Transaction messages: the bytes every signer signs.
//!
//! ```text
//! Message:
//!   version prefix          u8 (0x80 | version), v0 only
//!   num_required_sigs       u8
//!   num_readonly_signed     u8
//!   num_readonly_unsigned   u8
//!   num_accounts            compact-u16
//!   account_keys            32 bytes * num_accounts
//!   recent_blockhash        32 bytes
//!   num_instructions        compact-u16
//!   instructions[]          (see below)
//!   num_lookup_tables       compact-u16, v0 only (always 0 here)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::error::TxError;
use crate::instruction::{AccountMeta, Instruction};
use crate::wire::{push_len, Reader};

const VERSION_PREFIX_MASK: u8 = 0x80;

/// A recent blockhash anchoring a transaction's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

impl FromStr for Blockhash {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TxError::Serialization(format!("blockhash base58 decode failed: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            TxError::Serialization(format!("expected 32 blockhash bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

/// A blockhash together with the last block height at which a transaction
/// referencing it is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeToken {
    pub blockhash: Blockhash,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageVersion {
    Legacy,
    /// Versioned message without address lookup tables.
    #[default]
    V0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
}

/// An instruction whose account references are indices into the message's
/// `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled, immutable transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    version: MessageVersion,
    header: MessageHeader,
    /// Canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    account_keys: Vec<Address>,
    recent_blockhash: Blockhash,
    instructions: Vec<CompiledInstruction>,
}

impl Message {
    pub fn version(&self) -> MessageVersion {
        self.version
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn account_keys(&self) -> &[Address] {
        &self.account_keys
    }

    pub fn recent_blockhash(&self) -> &Blockhash {
        &self.recent_blockhash
    }

    pub fn instructions(&self) -> &[CompiledInstruction] {
        &self.instructions
    }

    pub fn fee_payer(&self) -> &Address {
        &self.account_keys[0]
    }

    /// Addresses that must sign, in signature-slot order.
    pub fn required_signers(&self) -> &[Address] {
        &self.account_keys[..self.header.num_required_signatures as usize]
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let signers = self.header.num_required_signatures as usize;
        if index < signers {
            index < signers - self.header.num_readonly_signed as usize
        } else {
            index < self.account_keys.len() - self.header.num_readonly_unsigned as usize
        }
    }

    /// Rebuild the instruction list, with permission bits taken from the
    /// header.
    pub fn decompile(&self) -> Vec<Instruction> {
        self.instructions
            .iter()
            .map(|ix| Instruction {
                program_id: self.account_keys[ix.program_id_index as usize],
                accounts: ix
                    .account_indices
                    .iter()
                    .map(|&i| AccountMeta {
                        address: self.account_keys[i as usize],
                        is_signer: self.is_signer(i as usize),
                        is_writable: self.is_writable(i as usize),
                    })
                    .collect(),
                data: ix.data.clone(),
            })
            .collect()
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, TxError> {
        let mut buf = Vec::with_capacity(256);

        if self.version == MessageVersion::V0 {
            buf.push(VERSION_PREFIX_MASK);
        }

        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed);
        buf.push(self.header.num_readonly_unsigned);

        push_len(&mut buf, self.account_keys.len(), "account keys")?;
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        push_len(&mut buf, self.instructions.len(), "instructions")?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            push_len(&mut buf, ix.account_indices.len(), "instruction accounts")?;
            buf.extend_from_slice(&ix.account_indices);
            push_len(&mut buf, ix.data.len(), "instruction data bytes")?;
            buf.extend_from_slice(&ix.data);
        }

        if self.version == MessageVersion::V0 {
            // No address lookup tables.
            push_len(&mut buf, 0, "lookup tables")?;
        }

        Ok(buf)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, TxError> {
        let version = match reader.peek_u8() {
            Some(prefix) if prefix & VERSION_PREFIX_MASK != 0 => {
                reader.read_u8()?;
                let version = prefix & !VERSION_PREFIX_MASK;
                if version != 0 {
                    return Err(TxError::Serialization(format!(
                        "unsupported message version {version}"
                    )));
                }
                MessageVersion::V0
            }
            _ => MessageVersion::Legacy,
        };

        let header = MessageHeader {
            num_required_signatures: reader.read_u8()?,
            num_readonly_signed: reader.read_u8()?,
            num_readonly_unsigned: reader.read_u8()?,
        };

        let num_accounts = reader.read_compact_u16()? as usize;
        let mut account_keys = Vec::with_capacity(num_accounts);
        for _ in 0..num_accounts {
            account_keys.push(Address::new(reader.read_array::<32>()?));
        }

        let recent_blockhash = Blockhash::new(reader.read_array::<32>()?);

        let num_instructions = reader.read_compact_u16()? as usize;
        let mut instructions = Vec::with_capacity(num_instructions);
        for _ in 0..num_instructions {
            let program_id_index = reader.read_u8()?;
            let n = reader.read_compact_u16()? as usize;
            let account_indices = reader.read_bytes(n)?.to_vec();
            let n = reader.read_compact_u16()? as usize;
            let data = reader.read_bytes(n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        if version == MessageVersion::V0 && reader.read_compact_u16()? != 0 {
            return Err(TxError::Serialization(
                "address lookup tables are not supported".into(),
            ));
        }

        let message = Self {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions,
        };
        message.sanitize()?;
        Ok(message)
    }

    /// Structural checks on a decoded message: header counts and every
    /// index must fit the account list.
    fn sanitize(&self) -> Result<(), TxError> {
        let keys = self.account_keys.len();
        let h = &self.header;
        if h.num_required_signatures == 0
            || h.num_required_signatures as usize > keys
            || h.num_readonly_signed >= h.num_required_signatures
            || h.num_readonly_unsigned as usize > keys - h.num_required_signatures as usize
        {
            return Err(TxError::Serialization(format!(
                "message header {h:?} inconsistent with {keys} account keys"
            )));
        }
        let in_range = |i: &u8| (*i as usize) < keys;
        for ix in &self.instructions {
            if !in_range(&ix.program_id_index) || !ix.account_indices.iter().all(in_range) {
                return Err(TxError::Serialization(
                    "instruction references an account outside the message".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Append-only builder for a [`Message`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    fee_payer: Address,
    blockhash: Option<Blockhash>,
    version: MessageVersion,
    instructions: Vec<Instruction>,
}

impl MessageBuilder {
    pub fn new(fee_payer: Address) -> Self {
        Self {
            fee_payer,
            blockhash: None,
            version: MessageVersion::default(),
            instructions: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: MessageVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_lifetime(mut self, lifetime: &LifetimeToken) -> Self {
        self.blockhash = Some(lifetime.blockhash);
        self
    }

    pub fn with_blockhash(mut self, blockhash: Blockhash) -> Self {
        self.blockhash = Some(blockhash);
        self
    }

    pub fn append_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn append_instructions(mut self, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    /// Compile into a message. The fee payer is always the first account and
    /// a writable signer, whether or not any instruction mentions it.
    pub fn compile(self) -> Result<Message, TxError> {
        let recent_blockhash = self.blockhash.ok_or_else(|| {
            TxError::TransactionBuild("message has no lifetime (blockhash) set".into())
        })?;

        struct AccountEntry {
            address: Address,
            is_signer: bool,
            is_writable: bool,
        }

        // Instruction account lists are tiny, a Vec is enough.
        let mut entries: Vec<AccountEntry> = Vec::new();
        let mut upsert = |address: Address, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    address,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        upsert(self.fee_payer, true, true);
        for ix in &self.instructions {
            for meta in &ix.accounts {
                upsert(meta.address, meta.is_signer, meta.is_writable);
            }
            // Program ids are read-only non-signers.
            upsert(ix.program_id, false, false);
        }

        // Stable sort keeps insertion order inside a class, so the fee payer
        // stays at index 0.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > u8::MAX as usize {
            return Err(TxError::TransactionBuild(format!(
                "{} accounts referenced, at most {} fit in a message",
                entries.len(),
                u8::MAX
            )));
        }

        let count = |f: fn(&AccountEntry) -> bool| entries.iter().filter(|e| f(e)).count() as u8;
        let header = MessageHeader {
            num_required_signatures: count(|e| e.is_signer),
            num_readonly_signed: count(|e| e.is_signer && !e.is_writable),
            num_readonly_unsigned: count(|e| !e.is_signer && !e.is_writable),
        };

        let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();
        let index_of = |address: &Address| -> Result<u8, TxError> {
            account_keys
                .iter()
                .position(|k| k == address)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    TxError::TransactionBuild(format!("{address} missing from account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(self.instructions.len());
        for ix in &self.instructions {
            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices: ix
                    .accounts
                    .iter()
                    .map(|meta| index_of(&meta.address))
                    .collect::<Result<_, _>>()?,
                data: ix.data.clone(),
            });
        }

        Ok(Message {
            version: self.version,
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }
}
