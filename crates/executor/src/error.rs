//! Command error codes.

use thiserror::Error;

/// Numeric command error codes.
///
/// The values are part of the client-visible protocol and must not change.
/// Several codes are shared across failure kinds, matching the historical
/// assignment.
pub mod codes {
    pub const NO_PERMISSIONS: u32 = 2;
    pub const NO_ACCOUNT: u32 = 3;
    pub const INVALID_AMOUNT: u32 = 3;
    pub const ROLE_ALREADY_EXISTS: u32 = 3;
    pub const NO_ENTITY: u32 = 3;
    pub const INVALID_ASSET_AMOUNT: u32 = 4;
    pub const INCORRECT_OLD_VALUE: u32 = 4;
    pub const PEERS_COUNT_NOT_ENOUGH: u32 = 4;
    pub const NO_SIGNATORY: u32 = 4;
    pub const ENTITY_ALREADY_EXISTS: u32 = 4;
    pub const COUNT_NOT_ENOUGH: u32 = 5;
    pub const NOT_ENOUGH_ASSETS: u32 = 6;
    pub const INCORRECT_BALANCE: u32 = 7;
    pub const STORE_FAILURE: u32 = 1002;
    pub const NO_IMPLEMENTATION: u32 = 1005;
    pub const PERMISSION_ALREADY_SET: u32 = 1007;
    pub const PUBLIC_KEY_EMPTY: u32 = 1008;
    pub const INVALID_FIELD_SIZE: u32 = 1009;
}

/// A failed store access, tagged with a domain error code.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{description} (code {code})")]
pub struct DbError {
    pub code: u32,
    pub description: String,
}

impl DbError {
    pub fn new(code: u32, description: impl Into<String>) -> Self {
        DbError {
            code,
            description: description.into(),
        }
    }
}

/// A failed command: the command's name, a numeric code and a description.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Command: {command}. {description} (code {code})")]
pub struct CommandError {
    pub command: &'static str,
    pub code: u32,
    pub description: String,
}

impl CommandError {
    pub fn new(command: &'static str, code: u32, description: impl Into<String>) -> Self {
        CommandError {
            command,
            code,
            description: description.into(),
        }
    }

    pub(crate) fn from_db(command: &'static str, err: DbError) -> Self {
        CommandError {
            command,
            code: err.code,
            description: err.description,
        }
    }
}
