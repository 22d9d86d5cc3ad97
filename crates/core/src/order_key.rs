#![forbid(unsafe_code)]

//! Sibling position keys.
//!
//! A key is a base-62 fraction written most significant digit first over an
//! ASCII-ordered alphabet, so plain byte comparison (SQLite `BINARY`, Rust
//! `str::cmp`) orders keys numerically. Keys never end in the zero digit,
//! which keeps room below every key and lets [`key_between`] always find a
//! strictly-between value without touching existing rows.
//!
//! Open-ended allocation (append or prepend) counts instead of bisecting.
//! A run of `m` leading `z` (or `0`) digits selects a level whose head is
//! `m + 1` digits wide; the next key adds (or subtracts) one in the last
//! head digit and climbs a level on overflow. Key length therefore grows with
//! the logarithm of the number of appends rather than linearly.

pub const ORDER_KEY_DIGITS: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
pub const MAX_ORDER_KEY_LEN: usize = 1024;

const BASE: usize = ORDER_KEY_DIGITS.len();
const ZERO: u8 = ORDER_KEY_DIGITS[0];
const MID: u8 = ORDER_KEY_DIGITS[BASE / 2];
const TOP: u8 = ORDER_KEY_DIGITS[BASE - 1];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OrderKeyError {
    #[error("order key must not be empty")]
    Empty,
    #[error("order key is too long")]
    TooLong,
    #[error("order key contains invalid character {ch:?} at index {index}")]
    InvalidChar { ch: char, index: usize },
    #[error("order key must not end with '0'")]
    TrailingZero,
    #[error("order keys are not ordered ({lower:?} >= {upper:?})")]
    NotOrdered { lower: String, upper: String },
}

pub fn validate_order_key(key: &str) -> Result<(), OrderKeyError> {
    if key.is_empty() {
        return Err(OrderKeyError::Empty);
    }
    for (index, ch) in key.chars().enumerate() {
        if !ch.is_ascii() || digit_value(ch as u8).is_none() {
            return Err(OrderKeyError::InvalidChar { ch, index });
        }
    }
    if key.as_bytes().last() == Some(&ZERO) {
        return Err(OrderKeyError::TrailingZero);
    }
    Ok(())
}

/// Caller-supplied keys are also length-capped; allocated keys may grow
/// past the cap after many inserts into the same gap.
pub fn validate_explicit_order_key(key: &str) -> Result<(), OrderKeyError> {
    if key.len() > MAX_ORDER_KEY_LEN {
        return Err(OrderKeyError::TooLong);
    }
    validate_order_key(key)
}

/// Returns a key strictly between `lower` and `upper`. A missing bound is
/// open: `(None, Some(k))` sorts before `k`, `(Some(k), None)` after it.
pub fn key_between(lower: Option<&str>, upper: Option<&str>) -> Result<String, OrderKeyError> {
    if let Some(lower) = lower {
        validate_order_key(lower)?;
    }
    if let Some(upper) = upper {
        validate_order_key(upper)?;
    }
    if let (Some(lower), Some(upper)) = (lower, upper)
        && lower >= upper
    {
        return Err(OrderKeyError::NotOrdered {
            lower: lower.to_string(),
            upper: upper.to_string(),
        });
    }

    let digits = match (lower, upper) {
        (None, None) => vec![MID],
        (Some(lower), None) => increment(lower.as_bytes()),
        (None, Some(upper)) => decrement(upper.as_bytes()),
        (Some(lower), Some(upper)) => midpoint(lower.as_bytes(), Some(upper.as_bytes())),
    };
    // Every byte comes from ORDER_KEY_DIGITS.
    Ok(digits.into_iter().map(char::from).collect())
}

pub fn key_after(lower: &str) -> Result<String, OrderKeyError> {
    key_between(Some(lower), None)
}

pub fn key_before(upper: &str) -> Result<String, OrderKeyError> {
    key_between(None, Some(upper))
}

fn digit_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some(usize::from(byte - b'0')),
        b'A'..=b'Z' => Some(usize::from(byte - b'A') + 10),
        b'a'..=b'z' => Some(usize::from(byte - b'a') + 36),
        _ => None,
    }
}

/// Smallest step above `key` at its level: `m` leading top digits, then an
/// `m + 1` digit head that is bumped by one. The head never starts with the
/// top digit, so the carry stops inside it.
fn increment(key: &[u8]) -> Vec<u8> {
    let level = key.iter().take_while(|b| **b == TOP).count();
    let (prefix, rest) = key.split_at(level);
    let mut out = prefix.to_vec();
    if rest.is_empty() {
        out.push(MID);
        return out;
    }

    let mut head = head_digits(rest, level + 1);
    for digit in head.iter_mut().rev() {
        if *digit + 1 < BASE {
            *digit += 1;
            break;
        }
        *digit = 0;
    }
    out.extend(trimmed(&head));
    out
}

/// Mirror of [`increment`] below `key`, counting leading zero digits. The
/// head starts with a non-zero digit, so the borrow stops inside it.
fn decrement(key: &[u8]) -> Vec<u8> {
    let level = key.iter().take_while(|b| **b == ZERO).count();
    let (prefix, rest) = key.split_at(level);
    let mut out = prefix.to_vec();

    let mut head = head_digits(rest, level + 1);
    for digit in head.iter_mut().rev() {
        if *digit > 0 {
            *digit -= 1;
            break;
        }
        *digit = BASE - 1;
    }
    let head = trimmed(&head);
    if head.is_empty() {
        out.extend([ZERO, MID]);
    } else {
        out.extend(head);
    }
    out
}

// First `width` digit values of `rest`, zero-padded.
fn head_digits(rest: &[u8], width: usize) -> Vec<usize> {
    (0..width)
        .map(|i| rest.get(i).and_then(|b| digit_value(*b)).unwrap_or(0))
        .collect()
}

fn trimmed(head: &[usize]) -> Vec<u8> {
    let len = head.iter().rposition(|d| *d != 0).map_or(0, |i| i + 1);
    head[..len].iter().map(|d| ORDER_KEY_DIGITS[*d]).collect()
}

// Requires lower < upper (absent lower reads as zero, absent upper as one)
// and no trailing zero digit on either side.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> Vec<u8> {
    if let Some(upper) = upper {
        let mut shared = 0usize;
        while shared < upper.len() && lower.get(shared).copied().unwrap_or(ZERO) == upper[shared] {
            shared += 1;
        }
        if shared > 0 {
            let mut out = upper[..shared].to_vec();
            let rest = lower.get(shared..).unwrap_or(&[]);
            out.extend(midpoint(rest, Some(&upper[shared..])));
            return out;
        }
    }

    let low = lower.first().and_then(|b| digit_value(*b)).unwrap_or(0);
    let high = upper
        .and_then(|u| u.first())
        .and_then(|b| digit_value(*b))
        .unwrap_or(BASE);

    if high - low > 1 {
        return vec![ORDER_KEY_DIGITS[(low + high) / 2]];
    }

    if let Some(upper) = upper
        && upper.len() > 1
    {
        return vec![upper[0]];
    }

    let mut out = vec![ORDER_KEY_DIGITS[low]];
    out.extend(midpoint(lower.get(1..).unwrap_or(&[]), None));
    out
}
