//! SMILES alphabet.

use seqrl::vocab::TokenVocabulary;
use seqrl::Result;

/// Common SMILES tokens, multi-character atoms included
pub const SMILES_TOKENS: &[&str] = &[
    "C", "c", "N", "n", "O", "o", "S", "s", "F", "P", "I", "Cl", "Br", "[nH]", "[NH+]", "[N+]",
    "[O-]", "[N-]", "[S+]", "[C@H]", "[C@@H]", "[C@]", "[C@@]", "=", "#", "-", "/", "\\", "(",
    ")", "1", "2", "3", "4", "5", "6", "7", "8", "%10",
];

/// Vocabulary over [`SMILES_TOKENS`] plus the default sentinels
pub fn smiles_vocabulary() -> Result<TokenVocabulary> {
    TokenVocabulary::new(SMILES_TOKENS.iter().copied())
}
