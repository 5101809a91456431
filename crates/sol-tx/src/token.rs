//! SPL Token mint instructions.
//!
//! Implements `InitializeMint` without pulling in the `spl-token` crate, plus
//! the create-account + initialize pair that provisions a working mint.

use crate::address::{Address, SYSVAR_RENT_ID, TOKEN_PROGRAM_ID};
use crate::error::TxError;
use crate::instruction::{AccountMeta, Instruction};
use crate::system;

/// Size in bytes of an SPL Token mint account.
pub const MINT_SIZE: u64 = 82;

/// Decimals used when the caller does not pick any.
pub const DEFAULT_MINT_DECIMALS: u8 = 9;

const INITIALIZE_MINT_IX_INDEX: u8 = 0;

/// Build an SPL Token `InitializeMint` instruction.
///
/// # Wire format
///
/// ```text
/// [0]            instruction index (InitializeMint)
/// [1]            decimals
/// [2..34]        mint authority
/// [34]           freeze authority tag (0 = none, 1 = some)
/// [35..67]       freeze authority, only when the tag is 1
/// ```
pub fn initialize_mint(
    mint: &Address,
    decimals: u8,
    mint_authority: &Address,
    freeze_authority: Option<&Address>,
) -> Instruction {
    let mut data = Vec::with_capacity(67);
    data.push(INITIALIZE_MINT_IX_INDEX);
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_bytes());
    match freeze_authority {
        Some(authority) => {
            data.push(1);
            data.extend_from_slice(authority.as_bytes());
        }
        None => data.push(0),
    }

    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::readonly(SYSVAR_RENT_ID, false),
        ],
        data,
    }
}

/// Parameters of a new mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintParams {
    pub decimals: u8,
    pub mint_authority: Address,
    pub freeze_authority: Option<Address>,
}

impl MintParams {
    /// Default decimals, `authority` as both mint and freeze authority.
    pub fn new(authority: Address) -> Self {
        Self {
            decimals: DEFAULT_MINT_DECIMALS,
            mint_authority: authority,
            freeze_authority: Some(authority),
        }
    }
}

/// Build the two instructions that create and initialize a mint.
///
/// Create-account always comes first; initialize needs an allocated,
/// token-owned account. Submit both in one transaction.
pub fn create_mint_instructions(
    payer: &Address,
    mint: &Address,
    params: &MintParams,
    rent_threshold: u64,
) -> Result<[Instruction; 2], TxError> {
    let create = system::create_account_checked(
        payer,
        mint,
        None,
        MINT_SIZE,
        &TOKEN_PROGRAM_ID,
        rent_threshold,
    )?;
    let initialize = initialize_mint(
        mint,
        params.decimals,
        &params.mint_authority,
        params.freeze_authority.as_ref(),
    );
    Ok([create, initialize])
}
