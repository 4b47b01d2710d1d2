//! # Pool Account Resolution
//!
//! Address helpers for the pool: parsing user-supplied addresses, deriving
//! the program's PDAs and the reserve Associated Token Accounts.

use crate::client::RpcError;
use lib_core::{AppError, Config};
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use std::str::FromStr;

/// Parse a base58 address, naming the field in the error.
pub fn parse_pubkey(value: &str, what: &str) -> Result<Pubkey, RpcError> {
    Pubkey::from_str(value.trim())
        .map_err(|_| RpcError::InvalidAddress(format!("Invalid {} address: {}", what, value)))
}

/// PDA `["authority"]` of the swap program; owns the reserves.
pub fn find_authority_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"authority"], program_id).0
}

/// PDA `["program_state"]` of the swap program.
pub fn find_program_state_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"program_state"], program_id).0
}

/// Associated Token Account of `owner` for `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// Every address the poller and the pool endpoints read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAccounts {
    pub program_id: Pubkey,
    pub program_state: Pubkey,
    pub authority: Pubkey,
    pub token_a_mint: Pubkey,
    pub token_b_mint: Pubkey,
    /// Reserve A: ATA(authority, token_a_mint)
    pub token_a_account: Pubkey,
    /// Reserve B: ATA(authority, token_b_mint)
    pub token_b_account: Pubkey,
}

impl PoolAccounts {
    pub fn new(program_id: Pubkey, authority: Option<Pubkey>, token_a_mint: Pubkey, token_b_mint: Pubkey) -> Self {
        let authority = authority.unwrap_or_else(|| find_authority_address(&program_id));
        Self {
            program_id,
            program_state: find_program_state_address(&program_id),
            authority,
            token_a_mint,
            token_b_mint,
            token_a_account: associated_token_address(&authority, &token_a_mint),
            token_b_account: associated_token_address(&authority, &token_b_mint),
        }
    }

    /// Resolve from configuration; any malformed address is a config error.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let parse = |value: &str, what: &str| {
            parse_pubkey(value, what).map_err(|e| AppError::Config(e.to_string()))
        };

        let program_id = parse(&config.pool_program_id, "POOL_PROGRAM_ID")?;
        let authority = config
            .pool_authority
            .as_deref()
            .map(|value| parse(value, "POOL_AUTHORITY"))
            .transpose()?;
        let token_a_mint = parse(&config.token_a_mint, "TOKEN_A_MINT")?;
        let token_b_mint = parse(&config.token_b_mint, "TOKEN_B_MINT")?;

        Ok(Self::new(program_id, authority, token_a_mint, token_b_mint))
    }
}
