//! Identity obfuscation for the token wire value.
//!
//! The identity is XORed against a shuffled `A..Z` alphabet (the key repeats every
//! 26 bytes) and rendered as unpadded RFC 4648 base32. This only keeps the login
//! out of plain sight in cookies and logs. It is **not** encryption: anyone holding
//! a few encoded values can recover the alphabet, and nothing authenticates the
//! result. Validation never trusts the decoded identity on its own; it must match a
//! live token together with its secret.

use base32::Alphabet as Base32;
use rand::{seq::SliceRandom, Rng};
use std::fmt;
use thiserror::Error;

pub const ALPHABET_LEN: usize = 26;

const PLAIN_ALPHABET: &[u8; ALPHABET_LEN] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// Valid counts of trailing `=` in a full 8-character base32 block.
const VALID_PADDING: [usize; 5] = [0, 1, 3, 4, 6];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid base32 character {0:?}")]
    InvalidCharacter(char),
    #[error("invalid base32 length")]
    InvalidLength,
    #[error("identity is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlphabetError {
    #[error("alphabet must be a permutation of the 26 uppercase letters")]
    NotAPermutation,
}

/// A permutation of the 26 uppercase ASCII letters used as the XOR key.
#[derive(Clone, PartialEq, Eq)]
pub struct Alphabet([u8; ALPHABET_LEN]);

impl Alphabet {
    /// Shuffle `A..Z` with the given RNG.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut letters = *PLAIN_ALPHABET;
        letters.shuffle(rng);
        Self(letters)
    }

    /// Use a fixed permutation, e.g. to share the key between processes or in tests.
    ///
    /// # Errors
    /// Returns an error unless `letters` contains each uppercase letter exactly once.
    pub fn from_letters(letters: &str) -> Result<Self, AlphabetError> {
        let bytes: [u8; ALPHABET_LEN] = letters
            .as_bytes()
            .try_into()
            .map_err(|_| AlphabetError::NotAPermutation)?;

        let mut seen = [false; ALPHABET_LEN];
        for byte in bytes {
            if !byte.is_ascii_uppercase() {
                return Err(AlphabetError::NotAPermutation);
            }
            let slot = usize::from(byte - b'A');
            if seen[slot] {
                return Err(AlphabetError::NotAPermutation);
            }
            seen[slot] = true;
        }

        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ALPHABET_LEN] {
        &self.0
    }
}

// The alphabet is the key, keep it out of logs.
impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Alphabet(..)")
    }
}

#[derive(Clone, Debug)]
pub struct IdentityCodec {
    alphabet: Alphabet,
}

impl IdentityCodec {
    #[must_use]
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    #[must_use]
    pub fn encode(&self, identity: &[u8]) -> String {
        base32::encode(Base32::Rfc4648 { padding: false }, &self.xor(identity))
    }

    /// # Errors
    /// Returns [`DecodeError`] when `encoded` is not valid base32.
    pub fn decode(&self, encoded: &str) -> Result<Vec<u8>, DecodeError> {
        let mut padded = encoded.to_string();
        while padded.len() % 8 != 0 {
            padded.push('=');
        }

        let body = padded.trim_end_matches('=');
        if let Some(bad) = body
            .chars()
            .find(|ch| !matches!(ch, 'A'..='Z' | '2'..='7'))
        {
            return Err(DecodeError::InvalidCharacter(bad));
        }
        if !VALID_PADDING.contains(&(padded.len() - body.len())) {
            return Err(DecodeError::InvalidLength);
        }

        let raw = base32::decode(Base32::Rfc4648 { padding: false }, body)
            .ok_or(DecodeError::InvalidLength)?;

        Ok(self.xor(&raw))
    }

    #[must_use]
    pub fn encode_identity(&self, identity: &str) -> String {
        self.encode(identity.as_bytes())
    }

    /// # Errors
    /// Returns [`DecodeError`] on invalid base32 or when the identity is not UTF-8.
    pub fn decode_identity(&self, encoded: &str) -> Result<String, DecodeError> {
        String::from_utf8(self.decode(encoded)?).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn xor(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .zip(self.alphabet.as_bytes().iter().cycle())
            .map(|(byte, key)| byte ^ key)
            .collect()
    }
}
