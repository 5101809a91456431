//! Conversions between user-facing amounts and lamports.
//!
//! Instructions only ever carry positive `u64` lamport amounts. Everything
//! that can be zero, negative or fractional is rejected here, before an
//! instruction exists.

use crate::error::TxError;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Reject a zero lamport amount.
pub fn ensure_positive(lamports: u64) -> Result<u64, TxError> {
    if lamports == 0 {
        return Err(TxError::InvalidAmount("lamports must be > 0".into()));
    }
    Ok(lamports)
}

/// Parse an integer lamport amount such as `"10000000"` or `"-5"`.
pub fn parse_lamports(input: &str) -> Result<u64, TxError> {
    let value: i128 = input
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|e| TxError::InvalidAmount(format!("{input:?} is not an integer: {e}")))?;
    if value <= 0 {
        return Err(TxError::InvalidAmount(format!(
            "lamports must be > 0, got {value}"
        )));
    }
    u64::try_from(value)
        .map_err(|_| TxError::InvalidAmount(format!("{value} lamports overflows u64")))
}

/// Convert a SOL amount to lamports, rounding to the nearest lamport.
pub fn sol_to_lamports(sol: f64) -> Result<u64, TxError> {
    if !sol.is_finite() || sol <= 0.0 {
        return Err(TxError::InvalidAmount(format!(
            "SOL amount must be a positive number, got {sol}"
        )));
    }
    let lamports = (sol * LAMPORTS_PER_SOL as f64).round();
    if lamports >= u64::MAX as f64 {
        return Err(TxError::InvalidAmount(format!("{sol} SOL overflows u64")));
    }
    ensure_positive(lamports as u64)
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
