//! Token vocabularies.
//!
//! The training core only ever talks to the [`Vocabulary`] trait. A
//! [`TokenVocabulary`] is provided for string alphabets made of single- and
//! multi-character tokens (e.g. `Cl`, `Br`, `[nH]` in SMILES).

mod token;

pub use token::TokenVocabulary;

use crate::{Result, Token};

/// Default start sentinel name.
pub const START_TOKEN: &str = "GO";
/// Default end sentinel name.
pub const END_TOKEN: &str = "EOS";

/// Bidirectional token <-> id mapping with designated start/end ids.
///
/// Implementations must be a stable bijection over their supported alphabet:
/// `decode(encode(s)) == s` for every encodable `s`.
pub trait Vocabulary {
    /// Split a string into token ids. Sentinels are not added.
    fn encode(&self, text: &str) -> Result<Vec<Token>>;

    /// Join token ids back into a string, skipping every id in `ignore`.
    fn decode(&self, tokens: &[Token], ignore: &[Token]) -> String;

    /// Number of ids, sentinels included.
    fn len(&self) -> usize;

    /// Whether the vocabulary holds no tokens.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id prepended implicitly to every sequence.
    fn start_token(&self) -> Token;

    /// Id that terminates a sequence.
    fn end_token(&self) -> Token;

    /// Decode a generated sequence, dropping both sentinels.
    fn decode_sequence(&self, tokens: &[Token]) -> String {
        self.decode(tokens, &[self.start_token(), self.end_token()])
    }
}
