#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of every object and block id: 128 bits in Crockford base32.
pub const ID_LEN: usize = 26;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id must be 26 characters (got {len})")]
    InvalidLength { len: usize },
    #[error("id contains invalid character {ch:?} at index {index}")]
    InvalidChar { ch: char, index: usize },
    #[error("id overflows 128 bits")]
    Overflow,
}

macro_rules! sortable_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }

            pub fn try_new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate_sortable_id(&value)?;
                Ok(Self(value))
            }

            /// Fresh id ordered by creation time.
            pub fn generate() -> Self {
                Self(encode_u128(Uuid::now_v7().as_u128()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

sortable_id!(ObjectId);
sortable_id!(BlockId);

fn encode_u128(value: u128) -> String {
    let mut out = String::with_capacity(ID_LEN);
    for index in 0..ID_LEN {
        let shift = 5 * (ID_LEN - 1 - index);
        let digit = ((value >> shift) & 0x1f) as usize;
        out.push(CROCKFORD[digit] as char);
    }
    out
}

fn validate_sortable_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    let len = value.chars().count();
    if len != ID_LEN {
        return Err(IdError::InvalidLength { len });
    }
    for (index, ch) in value.chars().enumerate() {
        if !ch.is_ascii() || !CROCKFORD.contains(&(ch as u8)) {
            return Err(IdError::InvalidChar { ch, index });
        }
    }
    // 26 * 5 = 130 bits, so the leading digit only carries 3.
    if value.as_bytes()[0] > b'7' {
        return Err(IdError::Overflow);
    }
    Ok(())
}
