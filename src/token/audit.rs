//! Ledger consistency audit
//!
//! Operations write several keys without a shared commit, so a failed write
//! can leave the ledger partially applied. The audit reads the metadata and
//! a given set of accounts and reports what looks off. It never writes.

use crate::store::WorldState;
use crate::token::error::LedgerError;
use crate::token::records::{decode, AccountRecord, TokenMetadata, TOKEN_KEY};
use serde::Serialize;

/// A single audit observation
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    /// No token metadata record
    MissingMetadata,
    /// Metadata exists but the admin has no account: initialization stopped
    /// after its first write
    AdminAccountMissing { admin: String },
    /// Admin account exists with a zero balance
    AdminAccountEmpty { admin: String },
    NegativeBalance { account: String, balance: f64 },
    NegativeAllowance {
        owner: String,
        spender: String,
        amount: f64,
    },
    /// Total supply differs from the balances seen. Expected after burns and
    /// approvals, so informational only.
    SupplyMismatch { total_supply: f64, sum_of_balances: f64 },
}

impl Finding {
    /// Whether the finding points at damage rather than known divergence
    pub fn is_defect(&self) -> bool {
        !matches!(
            self,
            Finding::SupplyMismatch { .. } | Finding::AdminAccountEmpty { .. }
        )
    }
}

/// Result of an audit pass
#[derive(Clone, Debug, Default, Serialize)]
pub struct AuditReport {
    pub token: Option<TokenMetadata>,
    pub accounts_checked: usize,
    pub sum_of_balances: f64,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        !self.findings.iter().any(Finding::is_defect)
    }
}

/// Audit the metadata record and the listed identities.
///
/// The world state cannot be enumerated through [`WorldState`], so callers
/// pass the identities to inspect. Unknown identities and the metadata key
/// are skipped.
pub fn audit<S, I, T>(store: &S, identities: I) -> Result<AuditReport, LedgerError>
where
    S: WorldState + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let read = |key: &str| {
        store.get(key).map_err(|source| LedgerError::StoreRead {
            key: key.to_string(),
            source,
        })
    };

    let mut report = AuditReport::default();

    let token: Option<TokenMetadata> = match read(TOKEN_KEY)? {
        Some(bytes) => Some(decode(&bytes)?),
        None => None,
    };

    match &token {
        None => report.findings.push(Finding::MissingMetadata),
        Some(token) => match read(&token.admin)? {
            None => report.findings.push(Finding::AdminAccountMissing {
                admin: token.admin.clone(),
            }),
            Some(bytes) => {
                let admin: AccountRecord = decode(&bytes)?;
                if admin.balance == 0.0 {
                    report.findings.push(Finding::AdminAccountEmpty {
                        admin: token.admin.clone(),
                    });
                }
            }
        },
    }

    for identity in identities {
        let identity = identity.as_ref();
        if identity == TOKEN_KEY {
            continue;
        }
        let Some(bytes) = read(identity)? else {
            continue;
        };
        let account: AccountRecord = decode(&bytes)?;
        report.accounts_checked += 1;
        report.sum_of_balances += account.balance;

        if account.balance < 0.0 {
            report.findings.push(Finding::NegativeBalance {
                account: identity.to_string(),
                balance: account.balance,
            });
        }
        for (spender, amount) in &account.allowances {
            if *amount < 0.0 {
                report.findings.push(Finding::NegativeAllowance {
                    owner: identity.to_string(),
                    spender: spender.clone(),
                    amount: *amount,
                });
            }
        }
    }

    if let Some(token) = &token {
        if token.total_supply != report.sum_of_balances {
            report.findings.push(Finding::SupplyMismatch {
                total_supply: token.total_supply,
                sum_of_balances: report.sum_of_balances,
            });
        }
    }

    if report.is_clean() {
        log::debug!("Audit clean over {} accounts", report.accounts_checked);
    } else {
        log::warn!("Audit found {} finding(s)", report.findings.len());
    }

    report.token = token;
    Ok(report)
}
