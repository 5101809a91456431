//! System Program instructions: account creation and native transfers.
//!
//! Instruction data is a little-endian `u32` variant index followed by the
//! variant's fields, all little-endian.

use crate::address::{Address, SYSTEM_PROGRAM_ID};
use crate::amount::ensure_positive;
use crate::error::TxError;
use crate::instruction::{AccountMeta, Instruction};

/// Largest account data size the runtime accepts (10 MiB).
pub const MAX_PERMITTED_DATA_LENGTH: u64 = 10 * 1024 * 1024;

const CREATE_ACCOUNT_IX_INDEX: u32 = 0;
const TRANSFER_IX_INDEX: u32 = 2;

/// Build a `CreateAccount` instruction.
///
/// Both `payer` and `new_account` must sign: the payer funds the account and
/// the new account proves it owns the address being allocated.
pub fn create_account(
    payer: &Address,
    new_account: &Address,
    lamports: u64,
    space: u64,
    owner: &Address,
) -> Instruction {
    // u32 index + u64 lamports + u64 space + 32-byte owner = 52 bytes.
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&CREATE_ACCOUNT_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_bytes());

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*new_account, true),
        ],
        data,
    }
}

/// Build a `CreateAccount` instruction whose balance is checked against the
/// rent-exemption threshold for `space` bytes.
///
/// `lamports = None` funds the account with exactly `rent_threshold`.
pub fn create_account_checked(
    payer: &Address,
    new_account: &Address,
    lamports: Option<u64>,
    space: u64,
    owner: &Address,
    rent_threshold: u64,
) -> Result<Instruction, TxError> {
    if space > MAX_PERMITTED_DATA_LENGTH {
        return Err(TxError::InvalidSize(format!(
            "{space} bytes exceeds the {MAX_PERMITTED_DATA_LENGTH} byte account limit"
        )));
    }

    let lamports = lamports.unwrap_or(rent_threshold);
    if lamports < rent_threshold {
        return Err(TxError::InvalidAmount(format!(
            "{lamports} lamports is below the rent-exempt minimum of {rent_threshold} for {space} bytes"
        )));
    }

    Ok(create_account(payer, new_account, lamports, space, owner))
}

/// Build a `Transfer` instruction moving `lamports` from `from` to `to`.
pub fn transfer(from: &Address, to: &Address, lamports: u64) -> Result<Instruction, TxError> {
    let lamports = ensure_positive(lamports)?;

    // u32 index + u64 lamports = 12 bytes.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Ok(Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    })
}

/// A decoded System Program instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemInstruction {
    CreateAccount {
        lamports: u64,
        space: u64,
        owner: Address,
    },
    Transfer {
        lamports: u64,
    },
}

impl SystemInstruction {
    /// Decode the data of a System Program instruction. Variants this crate
    /// does not build are reported as serialization errors.
    pub fn decode(data: &[u8]) -> Result<Self, TxError> {
        let (index, rest) = data
            .split_first_chunk::<4>()
            .ok_or_else(|| TxError::Serialization("system instruction too short".into()))?;

        match u32::from_le_bytes(*index) {
            CREATE_ACCOUNT_IX_INDEX => {
                if rest.len() != 48 {
                    return Err(TxError::Serialization(format!(
                        "CreateAccount expects 48 bytes of fields, got {}",
                        rest.len()
                    )));
                }
                Ok(Self::CreateAccount {
                    lamports: read_u64(&rest[..8]),
                    space: read_u64(&rest[8..16]),
                    owner: Address::try_from_slice(&rest[16..48])?,
                })
            }
            TRANSFER_IX_INDEX => {
                if rest.len() != 8 {
                    return Err(TxError::Serialization(format!(
                        "Transfer expects 8 bytes of fields, got {}",
                        rest.len()
                    )));
                }
                Ok(Self::Transfer {
                    lamports: read_u64(rest),
                })
            }
            other => Err(TxError::Serialization(format!(
                "unsupported system instruction {other}"
            ))),
        }
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
