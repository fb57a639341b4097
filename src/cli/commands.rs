//! CLI commands for the token ledger
//!
//! Each command opens the file-backed world state, runs exactly one ledger
//! operation and saves whatever that operation wrote.

use crate::store::{FileStoreConfig, FileWorldState};
use crate::token::{audit, LedgerError, TokenContract, TokenLedger};
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub ledger: TokenLedger<FileWorldState>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the world state under `data_dir`
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let config = FileStoreConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };
        let store = FileWorldState::open(config)?;

        Ok(Self {
            ledger: TokenLedger::new(store),
            data_dir,
        })
    }

    /// Persist any writes, including those of a partially applied operation
    pub fn save(&mut self) -> CliResult<()> {
        let store = self.ledger.store_mut();
        if store.is_dirty() {
            store.save()?;
        }
        Ok(())
    }

    /// Run one mutating operation and save, even when it failed part way
    fn run<F>(&mut self, op: F) -> CliResult<()>
    where
        F: FnOnce(&mut TokenLedger<FileWorldState>) -> Result<(), LedgerError>,
    {
        let result = op(&mut self.ledger);
        self.save()?;
        result.map_err(Into::into)
    }
}

/// Initialize the token
pub fn cmd_init(
    state: &mut AppState,
    symbol: &str,
    name: &str,
    supply: f64,
    admin: &str,
) -> CliResult<()> {
    state.run(|ledger| ledger.init_ledger(symbol, name, supply, admin))?;

    println!("✅ Token initialized!");
    println!("   📁 Data directory: {:?}", state.data_dir);
    println!("   🏷️  {} ({})", name, symbol);
    println!("   💰 Supply: {} held by {}", supply, admin);

    Ok(())
}

/// Create an empty account
pub fn cmd_create_user(state: &mut AppState, name: &str) -> CliResult<()> {
    state.run(|ledger| ledger.create_user(name))?;
    println!("👤 Account created: {}", name);
    Ok(())
}

/// Mint to the admin
pub fn cmd_mint(state: &mut AppState, admin: &str, amount: f64) -> CliResult<()> {
    state.run(|ledger| ledger.mint_tokens(admin, amount))?;

    let token = state.ledger.token_metadata()?;
    println!("🪙 Minted {} {} to {}", amount, token.symbol, admin);
    println!("   Total supply: {}", token.total_supply);
    Ok(())
}

/// Transfer between accounts
pub fn cmd_transfer(state: &mut AppState, from: &str, to: &str, amount: f64) -> CliResult<()> {
    state.run(|ledger| ledger.transfer_tokens(from, to, amount))?;

    println!("📤 Transferred {} from {} to {}", amount, from, to);
    println!("   {}: {}", from, state.ledger.get_balance(from)?);
    println!("   {}: {}", to, state.ledger.get_balance(to)?);
    Ok(())
}

/// Burn from an account
pub fn cmd_burn(state: &mut AppState, user: &str, amount: f64) -> CliResult<()> {
    state.run(|ledger| ledger.burn_tokens(user, amount))?;

    println!("🔥 Burned {} from {}", amount, user);
    println!("   Balance: {}", state.ledger.get_balance(user)?);
    Ok(())
}

/// Approve a spender
pub fn cmd_approve(state: &mut AppState, owner: &str, spender: &str, amount: f64) -> CliResult<()> {
    state.run(|ledger| ledger.approve_spender(owner, spender, amount))?;

    let allowance = state
        .ledger
        .get_user(owner)?
        .allowance(spender)
        .unwrap_or(0.0);
    println!("🤝 {} approved {} for {}", owner, spender, amount);
    println!("   Allowance now: {}", allowance);
    Ok(())
}

/// Delegated transfer
pub fn cmd_transfer_from(
    state: &mut AppState,
    owner: &str,
    spender: &str,
    recipient: &str,
    amount: f64,
) -> CliResult<()> {
    state.run(|ledger| ledger.transfer_from_approved_spenders(owner, spender, recipient, amount))?;

    println!(
        "📤 {} moved {} under {}'s allowance to {}",
        spender, amount, owner, recipient
    );
    println!("   {}: {}", recipient, state.ledger.get_balance(recipient)?);
    Ok(())
}

/// Show a balance
pub fn cmd_balance(state: &AppState, user: &str) -> CliResult<()> {
    let balance = state.ledger.get_balance(user)?;
    println!("💰 Balance for {}: {}", user, balance);
    Ok(())
}

/// Show a full account record
pub fn cmd_user(state: &AppState, user: &str) -> CliResult<()> {
    let account = state.ledger.get_user(user)?;

    println!("👤 Account {}", user);
    println!("   ├─ Name: {}", account.name);
    println!("   ├─ Balance: {}", account.balance);
    if account.allowances.is_empty() {
        println!("   └─ Allowances: none");
    } else {
        println!("   └─ Allowances:");
        for (spender, amount) in &account.allowances {
            println!("      └─ {} = {}", spender, amount);
        }
    }
    Ok(())
}

/// Show token metadata
pub fn cmd_token(state: &AppState) -> CliResult<()> {
    let token = state.ledger.token_metadata()?;

    println!("🪙 Token Info");
    println!("   ├─ Symbol: {}", token.symbol);
    println!("   ├─ Name: {}", token.name);
    println!("   ├─ Total supply: {}", token.total_supply);
    println!("   └─ Admin: {}", token.admin);
    Ok(())
}

/// Raw invocation by procedure name
pub fn cmd_invoke(state: &mut AppState, function: &str, args: &[String]) -> CliResult<()> {
    let response = TokenContract::new(state.ledger.store_mut()).invoke(function, args);
    state.save()?;

    if response.is_ok() {
        println!("✅ {} -> {}", function, response.status);
        if !response.payload.is_empty() {
            println!("{}", String::from_utf8_lossy(&response.payload));
        }
        Ok(())
    } else {
        println!("❌ {} -> {}: {}", function, response.status, response.message);
        Err(response.message.into())
    }
}

/// Audit every stored account
pub fn cmd_audit(state: &AppState) -> CliResult<()> {
    let store = state.ledger.store();
    let report = audit(store, store.keys())?;

    println!("🔍 Audit over {} accounts", report.accounts_checked);
    println!("   Sum of balances: {}", report.sum_of_balances);
    if let Some(token) = &report.token {
        println!("   Total supply: {}", token.total_supply);
    }

    if report.findings.is_empty() {
        println!("✅ No findings");
    } else {
        for finding in &report.findings {
            let marker = if finding.is_defect() { "❌" } else { "ℹ️ " };
            println!("   {} {}", marker, serde_json::to_string(finding)?);
        }
    }

    if !report.is_clean() {
        println!("⚠️  Ledger looks partially applied; inspect the findings above.");
    }
    Ok(())
}

/// Show storage statistics
pub fn cmd_stats(state: &AppState) -> CliResult<()> {
    let stats = state.ledger.store().stats()?;

    println!("📦 World State");
    println!("   ├─ Keys: {}", stats.key_count);
    println!("   ├─ File size: {} bytes", stats.file_size);
    println!("   ├─ Backups: {}", stats.backup_count);
    println!("   └─ Data directory: {:?}", stats.data_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_persist_between_runs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let mut state = AppState::new(dir.clone()).unwrap();
        cmd_init(&mut state, "TOK", "Tok", 1000.0, "admin1").unwrap();
        cmd_transfer(&mut state, "admin1", "u1", 300.0).unwrap();

        let state = AppState::new(dir).unwrap();
        assert_eq!(state.ledger.get_balance("admin1").unwrap(), 700.0);
        assert_eq!(state.ledger.get_balance("u1").unwrap(), 300.0);
    }

    #[test]
    fn test_failed_command_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let mut state = AppState::new(dir.clone()).unwrap();
        assert!(cmd_burn(&mut state, "ghost", 1.0).is_err());
        assert_eq!(state.ledger.store().stats().unwrap().file_size, 0);
    }

    #[test]
    fn test_invoke_round_trips_through_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let mut state = AppState::new(dir.clone()).unwrap();
        let init: Vec<String> = ["TOK", "Tok", "50", "admin1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        cmd_invoke(&mut state, "InitLedger", &init).unwrap();
        assert!(cmd_invoke(&mut state, "MintTokens", &["eve".to_string(), "1".to_string()]).is_err());

        let state = AppState::new(dir).unwrap();
        assert_eq!(state.ledger.get_balance("admin1").unwrap(), 50.0);
        cmd_audit(&state).unwrap();
    }
}
