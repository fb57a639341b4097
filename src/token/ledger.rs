//! Token ledger operations
//!
//! Each operation is a bounded read-validate-write sequence over the token
//! metadata record and one or more account records. All checks run before
//! the first write. The world state has no multi-key commit, so an operation
//! that writes several keys can stop part way: a failed write is reported
//! immediately and the remaining writes are not attempted. Earlier writes
//! stay committed.
//!
//! Write order per operation:
//!
//! | Operation | Writes, in order |
//! |---|---|
//! | `init_ledger` | `TOKEN`, admin |
//! | `create_user` | user |
//! | `mint_tokens` | `TOKEN`, admin |
//! | `transfer_tokens` | from, to |
//! | `burn_tokens` | user |
//! | `approve_spender` | owner, spender |
//! | `transfer_from_approved_spenders` | owner, recipient, spender |
//!
//! Balances are `f64`. Rounding error accumulates across repeated
//! operations and is not corrected.

use crate::store::WorldState;
use crate::token::error::{LedgerError, Missing};
use crate::token::records::{decode, encode, AccountRecord, TokenMetadata, TOKEN_KEY};
use std::collections::BTreeMap;

/// Accounts touched by one operation.
///
/// Each identity is read at most once, so aliased arguments (a transfer to
/// oneself, a spender who is also the recipient) mutate the same record and
/// no update is lost when the same key is written twice.
#[derive(Default)]
struct Touched {
    records: BTreeMap<String, AccountRecord>,
}

impl Touched {
    fn contains(&self, identity: &str) -> bool {
        self.records.contains_key(identity)
    }

    fn insert(&mut self, identity: &str, record: AccountRecord) {
        self.records.insert(identity.to_string(), record);
    }

    fn account(&mut self, identity: &str) -> &mut AccountRecord {
        self.records
            .entry(identity.to_string())
            .or_insert_with(|| AccountRecord::new(identity))
    }

    /// Serialize a staged record as a pending write
    fn encode(&mut self, identity: &str) -> Result<(String, Vec<u8>), LedgerError> {
        let bytes = encode(self.account(identity))?;
        Ok((identity.to_string(), bytes))
    }
}

/// The token ledger over a world state handle
pub struct TokenLedger<S> {
    store: S,
}

impl<S: WorldState> TokenLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    // =========================================================================
    // Record access
    // =========================================================================

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.store.get(key).map_err(|source| LedgerError::StoreRead {
            key: key.to_string(),
            source,
        })
    }

    fn load_token(&self) -> Result<Option<TokenMetadata>, LedgerError> {
        match self.read(TOKEN_KEY)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn require_token(&self) -> Result<TokenMetadata, LedgerError> {
        self.load_token()?
            .ok_or_else(|| LedgerError::NotFound(Missing::Token, TOKEN_KEY.to_string()))
    }

    /// The metadata key is not an account; operations naming it are rejected
    fn check_identity(identity: &str) -> Result<(), LedgerError> {
        if identity == TOKEN_KEY {
            return Err(LedgerError::ReservedIdentity(identity.to_string()));
        }
        Ok(())
    }

    fn load_account(&self, identity: &str) -> Result<Option<AccountRecord>, LedgerError> {
        Self::check_identity(identity)?;
        match self.read(identity)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn require_account(
        &self,
        identity: &str,
        missing: Missing,
    ) -> Result<AccountRecord, LedgerError> {
        self.load_account(identity)?
            .ok_or_else(|| LedgerError::NotFound(missing, identity.to_string()))
    }

    /// Existing record, or a zero-balance one for an identity never seen
    fn account_or_default(&self, identity: &str) -> Result<AccountRecord, LedgerError> {
        Ok(self
            .load_account(identity)?
            .unwrap_or_else(|| AccountRecord::new(identity)))
    }

    /// Load an identity into the working set unless already there
    fn stage(
        &self,
        touched: &mut Touched,
        identity: &str,
        required: Option<Missing>,
    ) -> Result<(), LedgerError> {
        if touched.contains(identity) {
            return Ok(());
        }
        let record = match required {
            Some(missing) => self.require_account(identity, missing)?,
            None => self.account_or_default(identity)?,
        };
        touched.insert(identity, record);
        Ok(())
    }

    /// Issue writes in order, stopping at the first failure
    fn write_all(&mut self, op: &str, writes: Vec<(String, Vec<u8>)>) -> Result<(), LedgerError> {
        for (committed, (key, bytes)) in writes.into_iter().enumerate() {
            if let Err(source) = self.store.put(&key, bytes) {
                if committed > 0 {
                    log::error!(
                        "{}: write to {} failed after {} committed write(s); ledger is partially applied",
                        op,
                        key,
                        committed
                    );
                }
                return Err(LedgerError::StoreWrite { key, source });
            }
        }
        Ok(())
    }

    fn check_amount(amount: f64) -> Result<(), LedgerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Ok(())
    }

    fn check_balance(record: &AccountRecord, amount: f64) -> Result<(), LedgerError> {
        if record.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                have: record.balance,
                need: amount,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Register an empty account under `name`
    pub fn create_user(&mut self, name: &str) -> Result<(), LedgerError> {
        Self::check_identity(name)?;
        if self.read(name)?.is_some() {
            return Err(LedgerError::UserAlreadyExists(name.to_string()));
        }

        let bytes = encode(&AccountRecord::new(name))?;
        self.write_all("create_user", vec![(name.to_string(), bytes)])?;

        log::info!("Account created: {}", name);
        Ok(())
    }

    /// Create the token and credit the whole initial supply to `admin`.
    ///
    /// If the admin write fails the metadata stays committed; the audit then
    /// reports the admin account as missing or empty.
    pub fn init_ledger(
        &mut self,
        symbol: &str,
        name: &str,
        initial_supply: f64,
        admin: &str,
    ) -> Result<(), LedgerError> {
        Self::check_amount(initial_supply)?;
        Self::check_identity(admin)?;

        if self.read(TOKEN_KEY)?.is_some() {
            log::warn!("Rejected re-initialization of token ledger");
            return Err(LedgerError::AlreadyInitialized);
        }

        let token = TokenMetadata {
            symbol: symbol.to_string(),
            name: name.to_string(),
            total_supply: initial_supply,
            admin: admin.to_string(),
        };
        let mut admin_account = AccountRecord::new(admin);
        admin_account.balance = initial_supply;

        let writes = vec![
            (TOKEN_KEY.to_string(), encode(&token)?),
            (admin.to_string(), encode(&admin_account)?),
        ];
        self.write_all("init_ledger", writes)?;

        log::info!(
            "Token initialized: {} ({}) supply {} held by {}",
            name,
            symbol,
            initial_supply,
            admin
        );
        Ok(())
    }

    /// Mint `amount` new tokens to the admin.
    ///
    /// A missing admin account is tolerated and created at zero before the
    /// credit, unlike every other debit path.
    pub fn mint_tokens(&mut self, admin: &str, amount: f64) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;

        let mut token = self.require_token()?;
        if token.admin != admin {
            log::warn!("Mint rejected: {} is not the token admin", admin);
            return Err(LedgerError::Unauthorized {
                caller: admin.to_string(),
            });
        }

        let mut admin_account = self.account_or_default(admin)?;
        token.total_supply += amount;
        admin_account.balance += amount;

        let writes = vec![
            (TOKEN_KEY.to_string(), encode(&token)?),
            (admin.to_string(), encode(&admin_account)?),
        ];
        self.write_all("mint_tokens", writes)?;

        log::info!(
            "Minted {} to {} (total supply {})",
            amount,
            admin,
            token.total_supply
        );
        Ok(())
    }

    /// Move `amount` from `from` to `to`, creating `to` if needed
    pub fn transfer_tokens(&mut self, from: &str, to: &str, amount: f64) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;

        let mut touched = Touched::default();
        self.stage(&mut touched, from, Some(Missing::Sender))?;
        Self::check_balance(touched.account(from), amount)?;
        self.stage(&mut touched, to, None)?;

        touched.account(from).balance -= amount;
        touched.account(to).balance += amount;

        let writes = vec![touched.encode(from)?, touched.encode(to)?];
        self.write_all("transfer_tokens", writes)?;

        log::info!("Transferred {} from {} to {}", amount, from, to);
        Ok(())
    }

    /// Destroy `amount` from `user`'s balance.
    ///
    /// The metadata total supply is left untouched, so after a burn it no
    /// longer equals the sum of balances.
    pub fn burn_tokens(&mut self, user: &str, amount: f64) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;

        let mut account = self.require_account(user, Missing::User)?;
        Self::check_balance(&account, amount)?;
        account.balance -= amount;

        self.write_all("burn_tokens", vec![(user.to_string(), encode(&account)?)])?;

        log::info!("Burned {} from {}", amount, user);
        Ok(())
    }

    /// Grant `spender` an additional allowance of `amount` on `owner`.
    ///
    /// Approval accumulates onto any existing allowance and also credits
    /// `amount` to the spender's own balance right away.
    pub fn approve_spender(
        &mut self,
        owner: &str,
        spender: &str,
        amount: f64,
    ) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;

        let mut touched = Touched::default();
        self.stage(&mut touched, owner, Some(Missing::Owner))?;
        Self::check_balance(touched.account(owner), amount)?;
        self.stage(&mut touched, spender, Some(Missing::Spender))?;

        touched.account(owner).add_allowance(spender, amount);
        touched.account(spender).balance += amount;

        let writes = vec![touched.encode(owner)?, touched.encode(spender)?];
        self.write_all("approve_spender", writes)?;

        log::info!("{} approved {} for {}", owner, spender, amount);
        Ok(())
    }

    /// Spend `amount` of `spender`'s allowance on `owner`, paying `recipient`.
    ///
    /// The consumed allowance is re-granted to `recipient` on the owner's
    /// record. Funds move from the spender's balance to the recipient's; the
    /// owner's balance only gates the operation.
    pub fn transfer_from_approved_spenders(
        &mut self,
        owner: &str,
        spender: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;

        let mut touched = Touched::default();
        self.stage(&mut touched, owner, Some(Missing::Owner))?;
        self.stage(&mut touched, spender, Some(Missing::Spender))?;

        let allowance = touched.account(owner).allowance(spender);
        match allowance {
            Some(have) if have >= amount => {}
            _ => {
                return Err(LedgerError::AllowanceExceeded {
                    have: allowance,
                    need: amount,
                })
            }
        }
        Self::check_balance(touched.account(owner), amount)?;
        // the debit below lands on the spender, whose balance must cover it too
        Self::check_balance(touched.account(spender), amount)?;

        self.stage(&mut touched, recipient, None)?;

        {
            let owner_account = touched.account(owner);
            owner_account.add_allowance(spender, -amount);
            owner_account.add_allowance(recipient, amount);
        }
        touched.account(spender).balance -= amount;
        touched.account(recipient).balance += amount;

        let writes = vec![
            touched.encode(owner)?,
            touched.encode(recipient)?,
            touched.encode(spender)?,
        ];
        self.write_all("transfer_from_approved_spenders", writes)?;

        log::info!(
            "{} spent {} of {}'s allowance, paid to {}",
            spender,
            amount,
            owner,
            recipient
        );
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_balance(&self, user: &str) -> Result<f64, LedgerError> {
        Ok(self.require_account(user, Missing::User)?.balance)
    }

    pub fn get_user(&self, user: &str) -> Result<AccountRecord, LedgerError> {
        self.require_account(user, Missing::User)
    }

    /// The token metadata record
    pub fn token_metadata(&self) -> Result<TokenMetadata, LedgerError> {
        self.require_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FaultyWorldState, MemoryWorldState, StoreError, TxSimulator};
    use crate::token::error::ErrorKind;

    fn ledger() -> TokenLedger<MemoryWorldState> {
        TokenLedger::new(MemoryWorldState::new())
    }

    fn initialized() -> TokenLedger<MemoryWorldState> {
        let mut ledger = ledger();
        ledger.init_ledger("TOK", "Tok", 1000.0, "admin1").unwrap();
        ledger
    }

    fn allowance(ledger: &TokenLedger<MemoryWorldState>, owner: &str, spender: &str) -> Option<f64> {
        ledger.get_user(owner).unwrap().allowance(spender)
    }

    #[test]
    fn test_scenario_init_mint_transfer_burn() {
        let mut ledger = initialized();
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);

        ledger.mint_tokens("admin1", 500.0).unwrap();
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1500.0);
        assert_eq!(ledger.token_metadata().unwrap().total_supply, 1500.0);

        ledger.transfer_tokens("admin1", "u1", 300.0).unwrap();
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1200.0);
        assert_eq!(ledger.get_balance("u1").unwrap(), 300.0);

        ledger.burn_tokens("u1", 100.0).unwrap();
        assert_eq!(ledger.get_balance("u1").unwrap(), 200.0);
        assert_eq!(ledger.token_metadata().unwrap().total_supply, 1500.0);
    }

    #[test]
    fn test_init_twice_fails_without_mutation() {
        let mut ledger = initialized();
        let before = ledger.store().get(TOKEN_KEY).unwrap();
        let version = ledger.store().version(TOKEN_KEY);

        let result = ledger.init_ledger("OTHER", "Other", 5.0, "admin2");
        assert!(matches!(result, Err(LedgerError::AlreadyInitialized)));

        assert_eq!(ledger.store().get(TOKEN_KEY).unwrap(), before);
        assert_eq!(ledger.store().version(TOKEN_KEY), version);
        assert!(matches!(
            ledger.get_user("admin2"),
            Err(LedgerError::NotFound(Missing::User, _))
        ));
    }

    #[test]
    fn test_init_writes_metadata_and_admin() {
        let ledger = initialized();

        let token = ledger.token_metadata().unwrap();
        assert_eq!(token.symbol, "TOK");
        assert_eq!(token.name, "Tok");
        assert_eq!(token.admin, "admin1");

        let admin = ledger.get_user("admin1").unwrap();
        assert_eq!(admin.name, "admin1");
        assert!(admin.allowances.is_empty());
    }

    #[test]
    fn test_create_user() {
        let mut ledger = ledger();
        ledger.create_user("alice").unwrap();

        let alice = ledger.get_user("alice").unwrap();
        assert_eq!(alice, AccountRecord::new("alice"));

        let result = ledger.create_user("alice");
        assert!(matches!(result, Err(LedgerError::UserAlreadyExists(ref n)) if n == "alice"));
    }

    #[test]
    fn test_mint_requires_token() {
        let mut ledger = ledger();
        let result = ledger.mint_tokens("admin1", 10.0);
        assert!(matches!(result, Err(LedgerError::NotFound(Missing::Token, _))));
    }

    #[test]
    fn test_mint_by_non_admin_leaves_state_unchanged() {
        let mut ledger = initialized();
        ledger.create_user("mallory").unwrap();

        let result = ledger.mint_tokens("mallory", 500.0);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);

        assert_eq!(ledger.token_metadata().unwrap().total_supply, 1000.0);
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);
        assert_eq!(ledger.get_balance("mallory").unwrap(), 0.0);
    }

    #[test]
    fn test_mint_recreates_missing_admin_account() {
        let mut store = MemoryWorldState::new();
        let token = TokenMetadata {
            symbol: "TOK".to_string(),
            name: "Tok".to_string(),
            total_supply: 1000.0,
            admin: "admin1".to_string(),
        };
        store.put(TOKEN_KEY, encode(&token).unwrap()).unwrap();

        let mut ledger = TokenLedger::new(store);
        ledger.mint_tokens("admin1", 25.0).unwrap();

        assert_eq!(ledger.get_balance("admin1").unwrap(), 25.0);
        assert_eq!(ledger.token_metadata().unwrap().total_supply, 1025.0);
    }

    #[test]
    fn test_transfer_preserves_pair_sum() {
        for (amount, to_start) in [(0.0, 0.0), (1.0, 7.5), (250.5, 0.0), (1000.0, 12.0)] {
            let mut ledger = initialized();
            if to_start > 0.0 {
                ledger.transfer_tokens("admin1", "bob", to_start).unwrap();
            } else {
                ledger.create_user("bob").unwrap();
            }
            let from_before = ledger.get_balance("admin1").unwrap();
            let to_before = ledger.get_balance("bob").unwrap();
            if from_before < amount {
                continue;
            }

            ledger.transfer_tokens("admin1", "bob", amount).unwrap();

            let from_after = ledger.get_balance("admin1").unwrap();
            let to_after = ledger.get_balance("bob").unwrap();
            assert_eq!(from_after, from_before - amount);
            assert_eq!(from_after + to_after, from_before + to_before);
        }
    }

    #[test]
    fn test_transfer_errors() {
        let mut ledger = initialized();

        let missing = ledger.transfer_tokens("ghost", "bob", 1.0);
        assert!(matches!(missing, Err(LedgerError::NotFound(Missing::Sender, _))));

        let too_much = ledger.transfer_tokens("admin1", "bob", 1000.5);
        assert!(matches!(
            too_much,
            Err(LedgerError::InsufficientBalance { have, need }) if have == 1000.0 && need == 1000.5
        ));
        // recipient was never materialized
        assert!(ledger.store().get("bob").unwrap().is_none());
    }

    #[test]
    fn test_transfer_to_self_is_net_noop() {
        let mut ledger = initialized();
        ledger.transfer_tokens("admin1", "admin1", 400.0).unwrap();

        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);
        // both writes were issued against the same key
        assert_eq!(ledger.store().version("admin1"), 3);
    }

    #[test]
    fn test_transfer_creates_recipient_with_identity_name() {
        let mut ledger = initialized();
        ledger.transfer_tokens("admin1", "carol", 10.0).unwrap();

        let carol = ledger.get_user("carol").unwrap();
        assert_eq!(carol.name, "carol");
        assert_eq!(carol.balance, 10.0);
    }

    #[test]
    fn test_invalid_amounts_rejected() {
        let mut ledger = initialized();

        for amount in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ledger.transfer_tokens("admin1", "bob", amount),
                Err(LedgerError::InvalidAmount(_))
            ));
            assert!(matches!(
                ledger.mint_tokens("admin1", amount),
                Err(LedgerError::InvalidAmount(_))
            ));
        }
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);
    }

    #[test]
    fn test_burn_never_goes_negative() {
        for amount in [0.0, 0.5, 299.5, 300.0, 300.5, 10_000.0] {
            let mut ledger = initialized();
            ledger.transfer_tokens("admin1", "u1", 300.0).unwrap();

            let result = ledger.burn_tokens("u1", amount);
            if amount > 300.0 {
                assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
                assert_eq!(ledger.get_balance("u1").unwrap(), 300.0);
            } else {
                result.unwrap();
                assert_eq!(ledger.get_balance("u1").unwrap(), 300.0 - amount);
            }
            assert_eq!(ledger.token_metadata().unwrap().total_supply, 1000.0);
        }
    }

    #[test]
    fn test_burn_unknown_user() {
        let mut ledger = initialized();
        assert!(matches!(
            ledger.burn_tokens("ghost", 1.0),
            Err(LedgerError::NotFound(Missing::User, _))
        ));
    }

    #[test]
    fn test_approve_accumulates_and_credits_spender() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();

        ledger.approve_spender("admin1", "spender", 100.0).unwrap();
        ledger.approve_spender("admin1", "spender", 50.0).unwrap();

        assert_eq!(allowance(&ledger, "admin1", "spender"), Some(150.0));
        assert_eq!(ledger.get_balance("spender").unwrap(), 150.0);
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);
    }

    #[test]
    fn test_approve_check_order() {
        let mut ledger = initialized();

        assert!(matches!(
            ledger.approve_spender("ghost", "spender", 1.0),
            Err(LedgerError::NotFound(Missing::Owner, _))
        ));
        // balance is checked before the spender lookup
        assert!(matches!(
            ledger.approve_spender("admin1", "ghost", 5000.0),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            ledger.approve_spender("admin1", "ghost", 1.0),
            Err(LedgerError::NotFound(Missing::Spender, _))
        ));
        assert!(ledger.get_user("admin1").unwrap().allowances.is_empty());
    }

    #[test]
    fn test_approve_self_keeps_both_effects() {
        let mut ledger = initialized();
        ledger.approve_spender("admin1", "admin1", 10.0).unwrap();

        let admin = ledger.get_user("admin1").unwrap();
        assert_eq!(admin.allowance("admin1"), Some(10.0));
        assert_eq!(admin.balance, 1010.0);
    }

    #[test]
    fn test_transfer_from_moves_allowance_and_funds() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();
        ledger.approve_spender("admin1", "spender", 100.0).unwrap();

        ledger
            .transfer_from_approved_spenders("admin1", "spender", "recipient", 40.0)
            .unwrap();

        assert_eq!(allowance(&ledger, "admin1", "spender"), Some(60.0));
        assert_eq!(allowance(&ledger, "admin1", "recipient"), Some(40.0));
        assert_eq!(ledger.get_balance("spender").unwrap(), 60.0);
        assert_eq!(ledger.get_balance("recipient").unwrap(), 40.0);
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);
    }

    #[test]
    fn test_transfer_from_allowance_exceeded() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();

        let unapproved = ledger.transfer_from_approved_spenders("admin1", "spender", "r", 1.0);
        assert!(matches!(
            unapproved,
            Err(LedgerError::AllowanceExceeded { have: None, .. })
        ));

        ledger.approve_spender("admin1", "spender", 20.0).unwrap();
        let over = ledger.transfer_from_approved_spenders("admin1", "spender", "r", 20.5);
        assert!(matches!(
            over,
            Err(LedgerError::AllowanceExceeded { have: Some(h), need }) if h == 20.0 && need == 20.5
        ));
        assert_eq!(allowance(&ledger, "admin1", "spender"), Some(20.0));
        assert!(ledger.store().get("r").unwrap().is_none());
    }

    #[test]
    fn test_transfer_from_missing_parties() {
        let mut ledger = initialized();
        assert!(matches!(
            ledger.transfer_from_approved_spenders("ghost", "spender", "r", 1.0),
            Err(LedgerError::NotFound(Missing::Owner, _))
        ));
        assert!(matches!(
            ledger.transfer_from_approved_spenders("admin1", "ghost", "r", 1.0),
            Err(LedgerError::NotFound(Missing::Spender, _))
        ));
    }

    #[test]
    fn test_transfer_from_owner_balance_gate() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();
        ledger.approve_spender("admin1", "spender", 600.0).unwrap();
        ledger.transfer_tokens("admin1", "elsewhere", 900.0).unwrap();

        let result = ledger.transfer_from_approved_spenders("admin1", "spender", "r", 500.0);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { have, .. }) if have == 100.0
        ));
    }

    #[test]
    fn test_transfer_from_spender_cannot_go_negative() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();
        ledger.approve_spender("admin1", "spender", 100.0).unwrap();
        ledger.transfer_tokens("spender", "elsewhere", 90.0).unwrap();

        let result = ledger.transfer_from_approved_spenders("admin1", "spender", "r", 50.0);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { have, .. }) if have == 10.0
        ));
        assert_eq!(ledger.get_balance("spender").unwrap(), 10.0);
    }

    #[test]
    fn test_transfer_from_spender_is_recipient() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();
        ledger.approve_spender("admin1", "spender", 100.0).unwrap();

        ledger
            .transfer_from_approved_spenders("admin1", "spender", "spender", 30.0)
            .unwrap();

        assert_eq!(ledger.get_balance("spender").unwrap(), 100.0);
        assert_eq!(allowance(&ledger, "admin1", "spender"), Some(100.0));
    }

    #[test]
    fn test_queries_have_no_side_effects() {
        let ledger = initialized();
        let keys = ledger.store().keys();

        assert!(matches!(
            ledger.get_balance("ghost"),
            Err(LedgerError::NotFound(Missing::User, _))
        ));
        assert!(ledger.get_user("ghost").is_err());
        assert_eq!(ledger.store().keys(), keys);
    }

    #[test]
    fn test_floating_point_rounding_is_preserved() {
        let mut ledger = ledger();
        ledger.init_ledger("TOK", "Tok", 0.0, "admin1").unwrap();
        ledger.mint_tokens("admin1", 0.1).unwrap();
        ledger.mint_tokens("admin1", 0.2).unwrap();

        let balance = ledger.get_balance("admin1").unwrap();
        assert_ne!(balance, 0.3);
        assert!((balance - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_init_partial_failure_leaves_metadata() {
        let store = FaultyWorldState::new(MemoryWorldState::new()).fail_puts_to("admin1");
        let mut ledger = TokenLedger::new(store);

        let result = ledger.init_ledger("TOK", "Tok", 1000.0, "admin1");
        assert!(matches!(result, Err(LedgerError::StoreWrite { ref key, .. }) if key == "admin1"));

        let inner = ledger.into_inner().into_inner();
        assert!(inner.get(TOKEN_KEY).unwrap().is_some());
        assert!(inner.get("admin1").unwrap().is_none());
    }

    #[test]
    fn test_mint_partial_failure_keeps_supply_increase() {
        let ledger = initialized();
        let store = FaultyWorldState::new(ledger.into_inner()).fail_put_at(1);
        let mut ledger = TokenLedger::new(store);

        let result = ledger.mint_tokens("admin1", 500.0);
        assert!(matches!(result, Err(LedgerError::StoreWrite { ref key, .. }) if key == "admin1"));
        assert_eq!(ledger.store().puts_attempted(), 2);

        let ledger = TokenLedger::new(ledger.into_inner().into_inner());
        assert_eq!(ledger.token_metadata().unwrap().total_supply, 1500.0);
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);
    }

    #[test]
    fn test_approve_partial_failure_keeps_owner_allowance() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();

        let store = FaultyWorldState::new(ledger.into_inner()).fail_put_at(1);
        let mut ledger = TokenLedger::new(store);

        let result = ledger.approve_spender("admin1", "spender", 100.0);
        assert!(matches!(result, Err(LedgerError::StoreWrite { ref key, .. }) if key == "spender"));
        assert_eq!(ledger.store().puts_attempted(), 2);

        let ledger = TokenLedger::new(ledger.into_inner().into_inner());
        assert_eq!(allowance(&ledger, "admin1", "spender"), Some(100.0));
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1000.0);
        assert_eq!(ledger.get_balance("spender").unwrap(), 0.0);
    }

    #[test]
    fn test_token_key_is_not_an_account() {
        let mut ledger = initialized();

        let reserved = |result: Result<(), LedgerError>| {
            matches!(result, Err(LedgerError::ReservedIdentity(ref id)) if id == TOKEN_KEY)
        };
        assert!(reserved(ledger.transfer_tokens("admin1", TOKEN_KEY, 10.0)));
        assert!(reserved(ledger.transfer_tokens(TOKEN_KEY, "admin1", 0.0)));
        assert!(reserved(ledger.approve_spender("admin1", TOKEN_KEY, 1.0)));
        assert!(reserved(ledger.create_user(TOKEN_KEY)));
        assert!(reserved(ledger.burn_tokens(TOKEN_KEY, 0.0)));
        assert!(reserved(ledger.transfer_from_approved_spenders(
            "admin1", TOKEN_KEY, "bob", 0.0
        )));
        assert!(matches!(
            ledger.get_user(TOKEN_KEY),
            Err(LedgerError::ReservedIdentity(_))
        ));
        assert_eq!(
            ledger.get_balance(TOKEN_KEY).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        let token = ledger.token_metadata().unwrap();
        assert_eq!(token.symbol, "TOK");
        assert_eq!(token.total_supply, 1000.0);
        ledger.mint_tokens("admin1", 5.0).unwrap();
        assert_eq!(ledger.get_balance("admin1").unwrap(), 1005.0);
    }

    #[test]
    fn test_init_rejects_token_key_as_admin() {
        let mut ledger = ledger();
        let result = ledger.init_ledger("TOK", "Tok", 1000.0, TOKEN_KEY);
        assert!(matches!(result, Err(LedgerError::ReservedIdentity(_))));
        assert!(ledger.store().is_empty());
    }

    #[test]
    fn test_transfer_from_stops_at_first_failed_write() {
        let mut ledger = initialized();
        ledger.create_user("spender").unwrap();
        ledger.approve_spender("admin1", "spender", 100.0).unwrap();

        let store = FaultyWorldState::new(ledger.into_inner()).fail_put_at(1);
        let mut ledger = TokenLedger::new(store);

        let result = ledger.transfer_from_approved_spenders("admin1", "spender", "r", 40.0);
        assert!(matches!(result, Err(LedgerError::StoreWrite { ref key, .. }) if key == "r"));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::StoreWriteFailure);
        // owner committed, recipient failed, spender never attempted
        assert_eq!(ledger.store().puts_attempted(), 2);

        let inner = ledger.into_inner().into_inner();
        let ledger = TokenLedger::new(inner);
        assert_eq!(allowance(&ledger, "admin1", "spender"), Some(60.0));
        assert_eq!(allowance(&ledger, "admin1", "r"), Some(40.0));
        assert_eq!(ledger.get_balance("spender").unwrap(), 100.0);
        assert!(ledger.get_user("r").is_err());
    }

    #[test]
    fn test_read_failure_is_surfaced() {
        let mut inner = MemoryWorldState::new();
        TokenLedger::new(&mut inner)
            .init_ledger("TOK", "Tok", 10.0, "admin1")
            .unwrap();

        let store = FaultyWorldState::new(inner).fail_gets_of("bob");
        let mut ledger = TokenLedger::new(store);

        let result = ledger.transfer_tokens("admin1", "bob", 1.0);
        assert!(matches!(
            result,
            Err(LedgerError::StoreRead { ref key, source: StoreError::Unavailable(_) }) if key == "bob"
        ));
        assert_eq!(ledger.store().puts_attempted(), 0);
    }

    #[test]
    fn test_concurrent_transfers_conflict_under_mvcc() {
        let mut committed = initialized().into_inner();
        let snapshot = committed.clone();

        let mut first = TokenLedger::new(TxSimulator::new(&snapshot));
        first.transfer_tokens("admin1", "bob", 600.0).unwrap();
        let mut second = TokenLedger::new(TxSimulator::new(&snapshot));
        second.transfer_tokens("admin1", "carol", 600.0).unwrap();

        first.into_inner().commit(&mut committed).unwrap();
        let result = second.into_inner().commit(&mut committed);
        assert!(matches!(result, Err(StoreError::Conflict { ref key }) if key == "admin1"));

        let ledger = TokenLedger::new(committed);
        assert_eq!(ledger.get_balance("admin1").unwrap(), 400.0);
        assert_eq!(ledger.get_balance("bob").unwrap(), 600.0);
        assert!(ledger.get_user("carol").is_err());
    }
}
