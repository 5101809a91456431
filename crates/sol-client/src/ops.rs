//! Composable ledger operations over one shared submit pipeline.
//!
//! Each operation composes its instructions first, so invalid input fails
//! before any network traffic, and fetches the blockhash last, right before
//! the message is compiled.

use sol_tx::{
    system, token, Address, Instruction, LifetimeToken, MessageBuilder, MintParams, Signer,
    Transaction, MINT_SIZE,
};
use tracing::{debug, instrument};

use crate::connection::Connection;
use crate::error::ClientError;
use crate::submit::{Confirmed, SubmitOptions};

/// Assembles `instructions` into one transaction paid by `fee_payer`, signs
/// it with the payer plus `extra_signers`, and waits for confirmation.
pub async fn submit_instructions(
    conn: &Connection,
    fee_payer: &dyn Signer,
    instructions: Vec<Instruction>,
    extra_signers: &[&dyn Signer],
    options: &SubmitOptions,
) -> Result<Confirmed, ClientError> {
    let lifetime = conn.latest_lifetime_token(options.commitment).await?;
    let tx = assemble(fee_payer, instructions, extra_signers, &lifetime)?;
    debug!(signature = %tx.signature(), instructions = tx.message().instructions().len(), "assembled");
    conn.send_and_confirm(&tx, &lifetime, options).await
}

fn assemble(
    fee_payer: &dyn Signer,
    instructions: Vec<Instruction>,
    extra_signers: &[&dyn Signer],
    lifetime: &LifetimeToken,
) -> Result<Transaction, ClientError> {
    let message = MessageBuilder::new(fee_payer.address())
        .with_lifetime(lifetime)
        .append_instructions(instructions)
        .compile()?;
    let mut signers: Vec<&dyn Signer> = Vec::with_capacity(1 + extra_signers.len());
    signers.push(fee_payer);
    signers.extend_from_slice(extra_signers);
    Ok(Transaction::sign(message, &signers)?)
}

/// Moves `lamports` from `source` to `destination`; `source` pays the fee.
#[instrument(skip(conn, source, options), fields(source = %source.address(), %destination, lamports))]
pub async fn transfer(
    conn: &Connection,
    source: &dyn Signer,
    destination: &Address,
    lamports: u64,
    options: &SubmitOptions,
) -> Result<Confirmed, ClientError> {
    let instruction = system::transfer(&source.address(), destination, lamports)?;
    submit_instructions(conn, source, vec![instruction], &[], options).await
}

/// Allocates a rent-exempt account of `space` bytes owned by `owner`.
///
/// `lamports` defaults to the rent-exemption threshold; an explicit amount
/// below it is refused.
pub async fn create_account(
    conn: &Connection,
    payer: &dyn Signer,
    new_account: &dyn Signer,
    space: u64,
    owner: &Address,
    lamports: Option<u64>,
    options: &SubmitOptions,
) -> Result<Confirmed, ClientError> {
    let rent = conn.rent_exemption_threshold(space).await?;
    let instruction = system::create_account_checked(
        &payer.address(),
        &new_account.address(),
        lamports,
        space,
        owner,
        rent,
    )?;
    submit_instructions(conn, payer, vec![instruction], &[new_account], options).await
}

/// Creates and initialises a token mint in a single transaction, so the
/// account never exists uninitialised.
#[instrument(skip(conn, payer, mint, params, options), fields(mint = %mint.address(), decimals = params.decimals))]
pub async fn create_mint(
    conn: &Connection,
    payer: &dyn Signer,
    mint: &dyn Signer,
    params: &MintParams,
    options: &SubmitOptions,
) -> Result<Confirmed, ClientError> {
    let rent = conn.rent_exemption_threshold(MINT_SIZE).await?;
    let instructions =
        token::create_mint_instructions(&payer.address(), &mint.address(), params, rent)?;
    submit_instructions(conn, payer, instructions.into(), &[mint], options).await
}
