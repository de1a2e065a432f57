//! Amount input mask for the transfer form.
//!
//! Keystrokes are filtered here, before anything reaches validation: a
//! rejected string never replaces the stored value.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Optional digits, optional single point, at most two digits after it.
/// ASCII digits only.
static AMOUNT_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]*\.?[0-9]{0,2}$").expect("amount input pattern is valid"));

/// What a stored amount string reads as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountReading {
    /// No digits yet (`""`, `"."`) or not a masked value at all
    Blank,
    Value(Decimal),
    /// Accepted by the mask but beyond what `Decimal` can hold
    TooLarge,
}

impl AmountReading {
    #[must_use]
    pub fn value(self) -> Option<Decimal> {
        match self {
            Self::Value(amount) => Some(amount),
            Self::Blank | Self::TooLarge => None,
        }
    }
}

/// Whether `input` may be stored as the amount field's value
#[must_use]
pub fn accepts_amount_input(input: &str) -> bool {
    AMOUNT_INPUT.is_match(input)
}

/// Read a stored amount string.
///
/// `".5"` reads as 0.5 and `"5."` as 5. The mask caps the fraction at two
/// digits, so the only way a masked string fails to parse is an integer
/// part too long for `Decimal`.
#[must_use]
pub fn read_amount_input(input: &str) -> AmountReading {
    if !accepts_amount_input(input) || !input.bytes().any(|b| b.is_ascii_digit()) {
        return AmountReading::Blank;
    }
    let trimmed = input.strip_suffix('.').unwrap_or(input);
    let normalized = if trimmed.starts_with('.') {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    };
    match Decimal::from_str(&normalized) {
        Ok(amount) => AmountReading::Value(amount),
        Err(_) => AmountReading::TooLarge,
    }
}

/// Numeric value of a stored amount string, if it has one
#[must_use]
pub fn parse_amount_input(input: &str) -> Option<Decimal> {
    read_amount_input(input).value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::dec;

    /// Every string over `alphabet` up to `max_len` characters, shortest first
    fn all_strings(alphabet: &[char], max_len: usize) -> Vec<String> {
        let mut out = vec![String::new()];
        let mut frontier = vec![String::new()];
        for _ in 0..max_len {
            let mut next = Vec::with_capacity(frontier.len() * alphabet.len());
            for prefix in &frontier {
                for &c in alphabet {
                    let mut s = prefix.clone();
                    s.push(c);
                    next.push(s);
                }
            }
            out.extend(next.iter().cloned());
            frontier = next;
        }
        out
    }

    /// The mask rule written out by hand
    fn mask_rule(input: &str) -> bool {
        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (input, None),
        };
        whole.bytes().all(|b| b.is_ascii_digit())
            && fraction.map_or(true, |f| f.len() <= 2 && f.bytes().all(|b| b.is_ascii_digit()))
    }

    #[test]
    fn test_mask_accepts_valid_inputs() {
        for input in ["", "0", "5", "50", "50.", "50.0", "50.00", ".5", ".55", ".", "007"] {
            assert!(accepts_amount_input(input), "should accept {:?}", input);
        }
    }

    #[test]
    fn test_mask_rejects_invalid_inputs() {
        for input in [
            "50.001", "5..0", "1.2.3", "-5", "+5", "abc", "5a", "1e3", " 5", "5 ", "1,00", "٣",
        ] {
            assert!(!accepts_amount_input(input), "should reject {:?}", input);
        }
    }

    #[test]
    fn test_mask_matches_rule_for_all_short_inputs() {
        let inputs = all_strings(&['0', '7', '.', 'a', '-', '٣'], 5);
        assert_eq!(inputs.len(), 9331);

        for input in &inputs {
            assert_eq!(
                accepts_amount_input(input),
                mask_rule(input),
                "mask disagrees on {:?}",
                input
            );
            let has_digit = input.bytes().any(|b| b.is_ascii_digit());
            let blank = read_amount_input(input) == AmountReading::Blank;
            assert_eq!(blank, !(mask_rule(input) && has_digit), "reading of {:?}", input);
        }
    }

    #[test]
    fn test_parse_amount_input() {
        assert_eq!(parse_amount_input("150.00"), Some(dec("150.00")));
        assert_eq!(parse_amount_input(".5"), Some(dec("0.5")));
        assert_eq!(parse_amount_input("5."), Some(dec("5")));
        assert_eq!(parse_amount_input("0"), Some(Decimal::ZERO));
        assert_eq!(parse_amount_input(""), None);
        assert_eq!(parse_amount_input("."), None);
        assert_eq!(parse_amount_input("1.234"), None);
    }

    #[test]
    fn test_integer_part_beyond_decimal_range_reads_too_large() {
        let thirty_digits = format!("1{}", "0".repeat(29));
        assert!(accepts_amount_input(&thirty_digits));
        assert_eq!(read_amount_input(&thirty_digits), AmountReading::TooLarge);
        assert_eq!(
            read_amount_input(&format!("{}.99", thirty_digits)),
            AmountReading::TooLarge
        );
        assert_eq!(parse_amount_input(&thirty_digits), None);

        assert_eq!(read_amount_input("12.50"), AmountReading::Value(dec("12.50")));
        assert_eq!(read_amount_input("."), AmountReading::Blank);
    }
}
