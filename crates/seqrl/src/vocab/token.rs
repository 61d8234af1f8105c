//! Greedy longest-match vocabulary.

use super::{Vocabulary, END_TOKEN, START_TOKEN};
use crate::{Result, SeqRlError, Token};
use std::collections::HashMap;
use std::path::Path;

/// Vocabulary over an explicit token list.
///
/// Encoding is greedy longest-match, so with tokens `C`, `l` and `Cl` the
/// string `"Cl"` encodes to a single id. Sentinel names are never matched
/// while encoding.
#[derive(Clone, Debug)]
pub struct TokenVocabulary {
    tokens: Vec<String>,
    index: HashMap<String, Token>,
    start: Token,
    end: Token,
    /// Longest non-sentinel token, in chars
    max_chars: usize,
}

impl TokenVocabulary {
    /// Build from a token list, adding the `GO`/`EOS` sentinels when absent.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_sentinels(tokens, START_TOKEN, END_TOKEN)
    }

    /// Build from a token list with custom sentinel names.
    ///
    /// Sentinels missing from `tokens` are appended in start, end order.
    pub fn with_sentinels<I, S>(tokens: I, start: &str, end: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if start == end {
            return Err(SeqRlError::Config(
                "start and end sentinels must differ".to_string(),
            ));
        }

        let mut list: Vec<String> = Vec::new();
        let mut index = HashMap::new();
        for token in tokens {
            let token = token.into();
            if token.is_empty() {
                return Err(SeqRlError::Config("empty token in vocabulary".to_string()));
            }
            if index.contains_key(&token) {
                return Err(SeqRlError::Config(format!("duplicate token {token:?}")));
            }
            index.insert(token.clone(), list.len() as Token);
            list.push(token);
        }
        for sentinel in [start, end] {
            if !index.contains_key(sentinel) {
                index.insert(sentinel.to_string(), list.len() as Token);
                list.push(sentinel.to_string());
            }
        }

        let max_chars = list
            .iter()
            .filter(|t| t.as_str() != start && t.as_str() != end)
            .map(|t| t.chars().count())
            .max()
            .unwrap_or(0);

        Ok(Self {
            start: index[start],
            end: index[end],
            tokens: list,
            index,
            max_chars,
        })
    }

    /// Load a newline-separated token file. Blank lines are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::new(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    /// Look up the string form of an id.
    pub fn token(&self, id: Token) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Look up the id of a token string.
    pub fn id(&self, token: &str) -> Option<Token> {
        self.index.get(token).copied()
    }

    /// All tokens in id order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn is_sentinel(&self, id: Token) -> bool {
        id == self.start || id == self.end
    }
}

impl Vocabulary for TokenVocabulary {
    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        let mut ids = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            // Byte offsets of the first 1..=max_chars char boundaries
            let ends: Vec<usize> = rest
                .char_indices()
                .skip(1)
                .map(|(i, _)| i)
                .chain(std::iter::once(rest.len()))
                .take(self.max_chars)
                .collect();

            let matched = ends.iter().rev().find_map(|&end| {
                self.index
                    .get(&rest[..end])
                    .filter(|&&id| !self.is_sentinel(id))
                    .map(|&id| (id, end))
            });

            match matched {
                Some((id, len)) => {
                    ids.push(id);
                    pos += len;
                }
                None => {
                    return Err(SeqRlError::UnknownToken {
                        input: text.to_string(),
                        position: pos,
                    })
                }
            }
        }

        Ok(ids)
    }

    fn decode(&self, tokens: &[Token], ignore: &[Token]) -> String {
        tokens
            .iter()
            .filter(|id| !ignore.contains(id))
            .filter_map(|&id| self.token(id))
            .collect()
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn start_token(&self) -> Token {
        self.start
    }

    fn end_token(&self) -> Token {
        self.end
    }
}
