use thiserror::Error;

/// Validation and parsing errors exposed by `chainheat-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptySymbol,
    #[error("ticker length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("ticker must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("OCC symbol too short to hold date, type, and strike: '{value}'")]
    OccTooShort { value: String },
    #[error("OCC symbol carries an invalid expiration date: '{value}'")]
    OccInvalidDate { value: String },
    #[error("OCC option type must be 'C' or 'P': '{ch}'")]
    OccInvalidType { ch: char },
    #[error("OCC strike field is not an 8-digit number: '{value}'")]
    OccInvalidStrike { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("cache timestamp must match YYYY-MM-DD-HH-MM-SS: '{value}'")]
    BadCacheTimestamp { value: String },
    #[error("expiration date must match YYYY-MM-DD: '{value}'")]
    BadExpirationDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("strike price must be positive")]
    NonPositiveStrike,
    #[error("underlying price must be positive")]
    NonPositiveUnderlying,
    #[error("delta {value} is outside [-1, 1]")]
    DeltaOutOfRange { value: f64 },
    #[error("contract '{occ}' does not belong to underlying '{expected}'")]
    UnderlyingMismatch { occ: String, expected: String },
}
