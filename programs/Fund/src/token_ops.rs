use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_spl::token::{self, Approve, Burn, MintTo, SetAuthority, Transfer};
use spl_token::instruction::AuthorityType;
use spl_token::state::Account as SplTokenAccount;

/// Amount `spender` may still move out of `account`.
pub fn allowance(account: &SplTokenAccount, spender: &Pubkey) -> u64 {
    match account.delegate {
        COption::Some(delegate) if delegate == *spender => account.delegated_amount,
        _ => 0,
    }
}

/// True when `account` belongs to `owner` and carries the single unit of `mint`.
pub fn holds_nft(account: &SplTokenAccount, owner: &Pubkey, mint: &Pubkey) -> bool {
    account.owner == *owner && account.mint == *mint && account.amount == 1
}

/// Moves tokens out of a member's account with the program acting as its approved delegate.
pub fn transfer_from_user<'info>(
    token_program: &AccountInfo<'info>,
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    delegate: &AccountInfo<'info>,
    signer_seeds: &[&[&[u8]]],
    amount: u64,
) -> Result<()> {
    delegated_transfer(token_program, from, to, delegate, signer_seeds, amount)
}

/// Pays out of a custody vault. The vault is approved to the fund state itself,
/// so every payout consumes the vault allowance.
pub fn transfer_from_vault<'info>(
    token_program: &AccountInfo<'info>,
    vault: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    fund_state: &AccountInfo<'info>,
    signer_seeds: &[&[&[u8]]],
    amount: u64,
) -> Result<()> {
    delegated_transfer(token_program, vault, to, fund_state, signer_seeds, amount)
}

fn delegated_transfer<'info>(
    token_program: &AccountInfo<'info>,
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    authority: &AccountInfo<'info>,
    signer_seeds: &[&[&[u8]]],
    amount: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }

    let cpi_accounts = Transfer {
        from: from.clone(),
        to: to.clone(),
        authority: authority.clone(),
    };
    let cpi_ctx = CpiContext::new_with_signer(token_program.clone(), cpi_accounts, signer_seeds);

    token::transfer(cpi_ctx, amount)
}

pub fn approve_vault<'info>(
    token_program: &AccountInfo<'info>,
    vault: &AccountInfo<'info>,
    fund_state: &AccountInfo<'info>,
    signer_seeds: &[&[&[u8]]],
    amount: u64,
) -> Result<()> {
    let cpi_accounts = Approve {
        to: vault.clone(),
        delegate: fund_state.clone(),
        authority: fund_state.clone(),
    };
    let cpi_ctx = CpiContext::new_with_signer(token_program.clone(), cpi_accounts, signer_seeds);

    token::approve(cpi_ctx, amount)
}

/// Mints the single unit of a receipt and drops the mint authority so the supply stays at one.
pub fn mint_receipt<'info>(
    token_program: &AccountInfo<'info>,
    mint: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    fund_state: &AccountInfo<'info>,
    signer_seeds: &[&[&[u8]]],
) -> Result<()> {
    let cpi_accounts = MintTo {
        mint: mint.clone(),
        to: to.clone(),
        authority: fund_state.clone(),
    };
    let cpi_ctx = CpiContext::new_with_signer(token_program.clone(), cpi_accounts, signer_seeds);
    token::mint_to(cpi_ctx, 1)?;

    let cpi_accounts = SetAuthority {
        current_authority: fund_state.clone(),
        account_or_mint: mint.clone(),
    };
    let cpi_ctx = CpiContext::new_with_signer(token_program.clone(), cpi_accounts, signer_seeds);

    token::set_authority(cpi_ctx, AuthorityType::MintTokens, None)
}

pub fn burn_receipt<'info>(
    token_program: &AccountInfo<'info>,
    mint: &AccountInfo<'info>,
    from: &AccountInfo<'info>,
    holder: &AccountInfo<'info>,
) -> Result<()> {
    let cpi_accounts = Burn {
        mint: mint.clone(),
        from: from.clone(),
        authority: holder.clone(),
    };
    let cpi_ctx = CpiContext::new(token_program.clone(), cpi_accounts);

    token::burn(cpi_ctx, 1)
}
