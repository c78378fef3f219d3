use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::domain::{ExpiryDate, OptionType};
use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 10;

// OCC tail: 6-digit date + type char + 8-digit strike.
const OCC_TAIL_LEN: usize = 15;

/// Normalized underlying ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a ticker to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        let mut chars = normalized.chars().enumerate();
        if let Some((_, first)) = chars.next() {
            if !first.is_ascii_alphabetic() {
                return Err(ValidationError::SymbolInvalidStart { ch: first });
            }
        }
        for (index, ch) in chars {
            if !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '-') {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// Decoded OCC option identifier, e.g. `AAPL240621C00190000`.
///
/// Fixed-width encoding: root symbol, YYMMDD expiration, C/P flag, and an
/// 8-digit strike scaled by 1000.
#[derive(Debug, Clone, PartialEq)]
pub struct OccSymbol {
    pub root: String,
    pub expiration: ExpiryDate,
    pub option_type: OptionType,
    pub strike: f64,
}

impl OccSymbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let raw = input.trim();
        if raw.len() <= OCC_TAIL_LEN || !raw.is_ascii() {
            return Err(ValidationError::OccTooShort {
                value: raw.to_owned(),
            });
        }

        let (root, tail) = raw.split_at(raw.len() - OCC_TAIL_LEN);
        let (date_part, rest) = tail.split_at(6);
        let type_char = rest.as_bytes()[0] as char;
        let strike_part = &rest[1..];

        let expiration = parse_occ_date(date_part).ok_or_else(|| {
            ValidationError::OccInvalidDate {
                value: raw.to_owned(),
            }
        })?;

        let option_type = match type_char {
            'C' => OptionType::Call,
            'P' => OptionType::Put,
            ch => return Err(ValidationError::OccInvalidType { ch }),
        };

        let strike_thousandths: u64 = strike_part.parse().map_err(|_| {
            ValidationError::OccInvalidStrike {
                value: strike_part.to_owned(),
            }
        })?;

        Ok(Self {
            root: root.to_owned(),
            expiration,
            option_type,
            strike: strike_thousandths as f64 / 1000.0,
        })
    }
}

fn parse_occ_date(date_part: &str) -> Option<ExpiryDate> {
    let yy: i32 = date_part.get(0..2)?.parse().ok()?;
    let mm: u8 = date_part.get(2..4)?.parse().ok()?;
    let dd: u8 = date_part.get(4..6)?.parse().ok()?;
    let month = Month::try_from(mm).ok()?;
    let date = Date::from_calendar_date(2000 + yy, month, dd).ok()?;
    Some(ExpiryDate::new(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" spy ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "SPY");
    }

    #[test]
    fn rejects_empty_and_invalid_symbols() {
        assert!(matches!(
            Symbol::parse("  "),
            Err(ValidationError::EmptySymbol)
        ));
        assert!(matches!(
            Symbol::parse("7AAPL"),
            Err(ValidationError::SymbolInvalidStart { .. })
        ));
        assert!(matches!(
            Symbol::parse("AA PL"),
            Err(ValidationError::SymbolInvalidChar { .. })
        ));
    }

    #[test]
    fn decodes_call_occ_symbol() {
        let parsed = OccSymbol::parse("AAPL240621C00190000").expect("must parse");
        assert_eq!(parsed.root, "AAPL");
        assert_eq!(parsed.expiration.date(), date!(2024 - 06 - 21));
        assert_eq!(parsed.option_type, OptionType::Call);
        assert!((parsed.strike - 190.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_fractional_strike() {
        let parsed = OccSymbol::parse("SPY250117P00412500").expect("must parse");
        assert_eq!(parsed.option_type, OptionType::Put);
        assert!((parsed.strike - 412.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_short_and_malformed_occ_symbols() {
        assert!(matches!(
            OccSymbol::parse("AAPL"),
            Err(ValidationError::OccTooShort { .. })
        ));
        assert!(matches!(
            OccSymbol::parse("AAPL249921C00190000"),
            Err(ValidationError::OccInvalidDate { .. })
        ));
        assert!(matches!(
            OccSymbol::parse("AAPL240621X00190000"),
            Err(ValidationError::OccInvalidType { ch: 'X' })
        ));
        assert!(matches!(
            OccSymbol::parse("AAPL240621C0019000X"),
            Err(ValidationError::OccInvalidStrike { .. })
        ));
    }
}
