use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The structural class of a secondary-structure element.
///
/// The declaration order doubles as the canonical sort order of element
/// identifiers (`f < h < i < m < s < t`), which every deterministic listing
/// in the crate (serialization, coordinate arrays, traversal) relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// Unpaired 5' tail of a strand.
    Fiveprime,
    /// Hairpin loop closed by a single stem.
    Hairpin,
    /// Interior loop or bulge between two nested stems.
    Interior,
    /// Multiloop segment, including exterior-loop linkers.
    Multiloop,
    /// Helical duplex region.
    Stem,
    /// Unpaired 3' tail of a strand.
    Threeprime,
}

impl ElementKind {
    pub const ALL: [ElementKind; 6] = [
        ElementKind::Fiveprime,
        ElementKind::Hairpin,
        ElementKind::Interior,
        ElementKind::Multiloop,
        ElementKind::Stem,
        ElementKind::Threeprime,
    ];

    pub fn letter(self) -> char {
        match self {
            ElementKind::Fiveprime => 'f',
            ElementKind::Hairpin => 'h',
            ElementKind::Interior => 'i',
            ElementKind::Multiloop => 'm',
            ElementKind::Stem => 's',
            ElementKind::Threeprime => 't',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'f' => Some(ElementKind::Fiveprime),
            'h' => Some(ElementKind::Hairpin),
            'i' => Some(ElementKind::Interior),
            'm' => Some(ElementKind::Multiloop),
            's' => Some(ElementKind::Stem),
            't' => Some(ElementKind::Threeprime),
            _ => None,
        }
    }

    /// Loops whose both ends attach to stems.
    pub fn is_junction(self) -> bool {
        matches!(self, ElementKind::Interior | ElementKind::Multiloop)
    }
}

/// A typed element token such as `s0` or `m3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub kind: ElementKind,
    pub index: usize,
}

impl ElementId {
    pub const fn new(kind: ElementKind, index: usize) -> Self {
        Self { kind, index }
    }

    pub const fn stem(index: usize) -> Self {
        Self::new(ElementKind::Stem, index)
    }

    pub fn is_stem(&self) -> bool {
        self.kind == ElementKind::Stem
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.letter(), self.index)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid element identifier: '{0}'")]
pub struct ParseElementIdError(pub String);

impl FromStr for ElementId {
    type Err = ParseElementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = chars
            .next()
            .and_then(ElementKind::from_letter)
            .ok_or_else(|| ParseElementIdError(s.to_string()))?;
        let index = chars
            .as_str()
            .parse::<usize>()
            .map_err(|_| ParseElementIdError(s.to_string()))?;
        Ok(ElementId { kind, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        for text in ["s0", "h12", "i3", "m0", "f0", "t1"] {
            let id: ElementId = text.parse().unwrap();
            assert_eq!(id.to_string(), text);
        }
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        assert!("x1".parse::<ElementId>().is_err());
        assert!("s".parse::<ElementId>().is_err());
        assert!("s-1".parse::<ElementId>().is_err());
        assert!("".parse::<ElementId>().is_err());
    }

    #[test]
    fn ordering_follows_kind_letter_then_index() {
        let mut ids: Vec<ElementId> = ["t0", "s10", "s2", "f0", "m1", "h0", "i0"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let names: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(names, ["f0", "h0", "i0", "m1", "s2", "s10", "t0"]);
    }
}
