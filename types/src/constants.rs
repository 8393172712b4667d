/// Maximum user id length accepted on the API surface.
pub const MAX_USER_ID_LENGTH: usize = 64;

/// Hard ceiling on grid size across all variants.
pub const MAX_GRID_SIZE: usize = 64;

/// Hard ceiling on flips per session across all variants.
pub const MAX_FLIPS_PER_SESSION: u32 = 32;

/// Recent sessions retained per user for history queries.
pub const SESSION_HISTORY_LIMIT: usize = 20;

/// Leaderboard size.
pub const LEADERBOARD_SIZE: usize = 10;

/// Error codes for API error responses
pub const ERROR_INSUFFICIENT_BALANCE: u8 = 1;
pub const ERROR_INVALID_BET: u8 = 2;
pub const ERROR_VARIANT_INACTIVE: u8 = 3;
pub const ERROR_ELIGIBILITY: u8 = 4;
pub const ERROR_INVALID_FLIP: u8 = 5;
pub const ERROR_SESSION_NOT_FOUND: u8 = 6;
pub const ERROR_LEDGER_WRITE: u8 = 7;
pub const ERROR_WITHDRAWAL_NOT_FOUND: u8 = 8;
pub const ERROR_UNKNOWN_VARIANT: u8 = 9;
pub const ERROR_INVALID_REQUEST: u8 = 10;
