use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The author-assigned identity of a nucleotide: chain, residue number, and
/// optional insertion code.
///
/// Chain identifiers are kept verbatim, so numeric or multi-character ids
/// found in mmCIF files survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeqId {
    pub chain: String,
    pub number: i32,
    pub icode: Option<char>,
}

impl SeqId {
    pub fn new(chain: impl Into<String>, number: i32, icode: Option<char>) -> Self {
        Self {
            chain: chain.into(),
            number,
            icode,
        }
    }
}

impl fmt::Display for SeqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.number)?;
        if let Some(icode) = self.icode {
            write!(f, "{}", icode)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid residue identifier: '{0}'")]
pub struct ParseSeqIdError(pub String);

impl FromStr for SeqId {
    type Err = ParseSeqIdError;

    /// Parses `CHAIN:NUMBER[ICODE]`. The chain is everything before the last
    /// colon, so chain names may themselves contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSeqIdError(s.to_string());
        let (chain, rest) = s.rsplit_once(':').ok_or_else(err)?;
        if chain.is_empty() || rest.is_empty() {
            return Err(err());
        }
        let (digits, icode) = match rest.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => (&rest[..rest.len() - 1], Some(c)),
            _ => (rest, None),
        };
        let number = digits.parse::<i32>().map_err(|_| err())?;
        Ok(SeqId::new(chain, number, icode))
    }
}
