//! Invocation dispatch
//!
//! Maps a procedure name plus positional string arguments onto a ledger
//! operation, the way the execution host hands an invocation to the
//! contract. Argument order is significant.

use crate::store::WorldState;
use crate::token::error::{ErrorKind, LedgerError};
use crate::token::ledger::TokenLedger;
use serde::Serialize;

/// Invocable procedure names
pub const FUNCTIONS: &[&str] = &[
    "Createuser",
    "InitLedger",
    "MintTokens",
    "ApproveSpender",
    "TransferTokens",
    "GetBalance",
    "GetUser",
    "BurnTokens",
    "TransferFromApprovedSpenders",
    "GetToken",
];

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const FORBIDDEN: u16 = 403;
pub const NOT_FOUND: u16 = 404;
pub const CONFLICT: u16 = 409;
pub const INTERNAL_ERROR: u16 = 500;

/// Result of one invocation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    /// JSON payload for queries, empty otherwise
    pub payload: Vec<u8>,
}

impl Response {
    fn success(payload: Vec<u8>) -> Self {
        Self {
            status: OK,
            message: String::new(),
            payload,
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OK
    }
}

impl From<LedgerError> for Response {
    fn from(err: LedgerError) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => NOT_FOUND,
            ErrorKind::AlreadyExists => CONFLICT,
            ErrorKind::Unauthorized => FORBIDDEN,
            ErrorKind::InsufficientBalance
            | ErrorKind::AllowanceExceeded
            | ErrorKind::InvalidArgument => BAD_REQUEST,
            ErrorKind::StoreReadFailure
            | ErrorKind::StoreWriteFailure
            | ErrorKind::SerializationFailure => INTERNAL_ERROR,
        };
        Response::error(status, err.to_string())
    }
}

/// The token contract bound to a world state
pub struct TokenContract<S> {
    ledger: TokenLedger<S>,
}

impl<S: WorldState> TokenContract<S> {
    pub fn new(store: S) -> Self {
        Self {
            ledger: TokenLedger::new(store),
        }
    }

    pub fn ledger(&self) -> &TokenLedger<S> {
        &self.ledger
    }

    pub fn into_inner(self) -> S {
        self.ledger.into_inner()
    }

    /// Dispatch one invocation
    pub fn invoke(&mut self, function: &str, args: &[String]) -> Response {
        log::debug!("invoke {}({})", function, args.join(", "));

        let arity = match function {
            "GetToken" => 0,
            "Createuser" | "GetBalance" | "GetUser" => 1,
            "MintTokens" | "BurnTokens" => 2,
            "ApproveSpender" | "TransferTokens" => 3,
            "InitLedger" | "TransferFromApprovedSpenders" => 4,
            _ => {
                return Response::error(BAD_REQUEST, format!("Unknown function: {}", function));
            }
        };
        if args.len() != arity {
            return Response::error(
                BAD_REQUEST,
                format!(
                    "{} expects {} argument(s), got {}",
                    function,
                    arity,
                    args.len()
                ),
            );
        }

        self.dispatch(function, args).unwrap_or_else(|failure| failure)
    }

    fn dispatch(&mut self, function: &str, args: &[String]) -> Result<Response, Response> {
        let ledger = &mut self.ledger;
        match function {
            "Createuser" => ledger.create_user(&args[0])?,
            "InitLedger" => {
                let supply = parse_amount(&args[2])?;
                ledger.init_ledger(&args[0], &args[1], supply, &args[3])?
            }
            "MintTokens" => ledger.mint_tokens(&args[0], parse_amount(&args[1])?)?,
            "ApproveSpender" => {
                ledger.approve_spender(&args[0], &args[1], parse_amount(&args[2])?)?
            }
            "TransferTokens" => {
                ledger.transfer_tokens(&args[0], &args[1], parse_amount(&args[2])?)?
            }
            "BurnTokens" => ledger.burn_tokens(&args[0], parse_amount(&args[1])?)?,
            "TransferFromApprovedSpenders" => ledger.transfer_from_approved_spenders(
                &args[0],
                &args[1],
                &args[2],
                parse_amount(&args[3])?,
            )?,
            "GetBalance" => return json_payload(&ledger.get_balance(&args[0])?),
            "GetUser" => return json_payload(&ledger.get_user(&args[0])?),
            "GetToken" => return json_payload(&ledger.token_metadata()?),
            _ => {
                return Err(Response::error(
                    BAD_REQUEST,
                    format!("Unknown function: {}", function),
                ))
            }
        }
        Ok(Response::success(Vec::new()))
    }
}

fn parse_amount(raw: &str) -> Result<f64, Response> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Response::error(BAD_REQUEST, format!("Invalid amount: {:?}", raw)))
}

fn json_payload<T: Serialize>(value: &T) -> Result<Response, Response> {
    serde_json::to_vec(value)
        .map(Response::success)
        .map_err(|e| Response::from(LedgerError::from(e)))
}
