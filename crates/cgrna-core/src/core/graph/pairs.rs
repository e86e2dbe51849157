use super::error::GraphError;
use std::collections::BTreeSet;

const OPENING_BRACKETS: [char; 4] = ['(', '[', '{', '<'];
const CLOSING_BRACKETS: [char; 4] = [')', ']', '}', '>'];

/// Residue ranges of one helix: strand one runs `start1..=end1`, strand two
/// runs `start2..=end2`, with `start1` paired to `end2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StemSpan {
    pub start1: usize,
    pub end1: usize,
    pub start2: usize,
    pub end2: usize,
}

impl StemSpan {
    pub fn bp_length(&self) -> usize {
        self.end1 - self.start1 + 1
    }

    fn crosses(&self, other: &StemSpan) -> bool {
        let (i, j) = (self.start1, self.end2);
        let (k, l) = (other.start1, other.end2);
        (i < k && k < j && j < l) || (k < i && i < l && l < j)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.bp_length()).map(move |k| (self.start1 + k, self.end2 - k))
    }
}

/// A 1-based base-pairing table: `partner(i) == Some(j)` iff `i` pairs `j`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PairTable {
    partners: Vec<Option<usize>>,
}

impl PairTable {
    /// An unpaired table for `length` residues.
    pub fn unpaired(length: usize) -> Self {
        Self {
            partners: vec![None; length],
        }
    }

    /// Builds a table from 1-based pairs, rejecting self pairs, out-of-range
    /// residues, and residues that appear in two different pairs.
    pub fn from_pairs(
        length: usize,
        pairs: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, GraphError> {
        let mut table = Self::unpaired(length);
        for (i, j) in pairs {
            table.add_pair(i, j)?;
        }
        Ok(table)
    }

    /// Parses a dot-bracket string. `&` separates strands and is reported as a
    /// backbone break after the preceding residue.
    pub fn from_dotbracket(text: &str) -> Result<(Self, Vec<usize>), GraphError> {
        let mut stacks: [Vec<usize>; 4] = Default::default();
        let mut pairs = Vec::new();
        let mut breaks = Vec::new();
        let mut residue = 0usize;

        for (position, c) in text.chars().enumerate() {
            if c == '&' {
                if residue == 0 || breaks.last() == Some(&residue) {
                    return Err(GraphError::InvalidDotBracket {
                        position,
                        reason: "empty strand".into(),
                    });
                }
                breaks.push(residue);
                continue;
            }
            residue += 1;
            if let Some(level) = OPENING_BRACKETS.iter().position(|&b| b == c) {
                stacks[level].push(residue);
            } else if let Some(level) = CLOSING_BRACKETS.iter().position(|&b| b == c) {
                let opener = stacks[level]
                    .pop()
                    .ok_or_else(|| GraphError::InvalidDotBracket {
                        position,
                        reason: format!("unmatched '{}'", c),
                    })?;
                pairs.push((opener, residue));
            } else if c != '.' {
                return Err(GraphError::InvalidDotBracket {
                    position,
                    reason: format!("unexpected character '{}'", c),
                });
            }
        }
        if let Some(level) = stacks.iter().position(|s| !s.is_empty()) {
            return Err(GraphError::InvalidDotBracket {
                position: text.len(),
                reason: format!("unmatched '{}'", OPENING_BRACKETS[level]),
            });
        }
        if breaks.last() == Some(&residue) {
            return Err(GraphError::InvalidDotBracket {
                position: text.len(),
                reason: "empty strand".into(),
            });
        }

        Ok((Self::from_pairs(residue, pairs)?, breaks))
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    pub fn partner(&self, residue: usize) -> Option<usize> {
        residue
            .checked_sub(1)
            .and_then(|idx| self.partners.get(idx).copied().flatten())
    }

    pub fn is_paired(&self, residue: usize) -> bool {
        self.partner(residue).is_some()
    }

    /// All pairs `(i, j)` with `i < j`, ordered by `i`.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        (1..=self.len())
            .filter_map(|i| self.partner(i).filter(|&j| j > i).map(|j| (i, j)))
            .collect()
    }

    pub fn add_pair(&mut self, i: usize, j: usize) -> Result<(), GraphError> {
        let length = self.len();
        for r in [i, j] {
            if r == 0 || r > length {
                return Err(GraphError::ResidueOutOfRange { residue: r, length });
            }
        }
        if i == j {
            return Err(GraphError::ConflictingPair {
                residue: i,
                first: i,
                second: j,
            });
        }
        for (a, b) in [(i, j), (j, i)] {
            if let Some(existing) = self.partner(a) {
                if existing != b {
                    return Err(GraphError::ConflictingPair {
                        residue: a,
                        first: existing,
                        second: b,
                    });
                }
            }
        }
        self.partners[i - 1] = Some(j);
        self.partners[j - 1] = Some(i);
        Ok(())
    }

    pub fn remove_pair(&mut self, i: usize) {
        if let Some(j) = self.partner(i) {
            self.partners[i - 1] = None;
            self.partners[j - 1] = None;
        }
    }

    /// Maximal runs of stacked pairs. A stem never continues across a
    /// backbone break on either strand.
    pub fn stems(&self, breaks: &[usize]) -> Vec<StemSpan> {
        let broken: BTreeSet<usize> = breaks.iter().copied().collect();
        let continues = |i: usize, j: usize| -> bool {
            i + 1 < j.saturating_sub(1)
                && self.partner(i + 1) == Some(j - 1)
                && !broken.contains(&i)
                && !broken.contains(&(j - 1))
        };

        let mut stems = Vec::new();
        let mut i = 1;
        while i <= self.len() {
            let Some(j) = self.partner(i).filter(|&j| j > i) else {
                i += 1;
                continue;
            };
            let mut end1 = i;
            let mut start2 = j;
            while continues(end1, start2) {
                end1 += 1;
                start2 -= 1;
            }
            stems.push(StemSpan {
                start1: i,
                end1,
                start2,
                end2: j,
            });
            i = end1 + 1;
        }
        stems
    }

    /// Renders the table, assigning each pair the first bracket type whose
    /// already-assigned pairs it does not cross.
    pub fn to_dotbracket(&self, breaks: &[usize]) -> String {
        let mut levels: Vec<Vec<(usize, usize)>> = Vec::new();
        let mut symbol = vec!['.'; self.len()];
        for (i, j) in self.pairs() {
            let crosses = |&(k, l): &(usize, usize)| (k < i && i < l && l < j) || (i < k && k < j && j < l);
            let level = match levels.iter().position(|lv| !lv.iter().any(crosses)) {
                Some(level) => level,
                None => {
                    levels.push(Vec::new());
                    levels.len() - 1
                }
            };
            levels[level].push((i, j));
            let bracket = level.min(OPENING_BRACKETS.len() - 1);
            symbol[i - 1] = OPENING_BRACKETS[bracket];
            symbol[j - 1] = CLOSING_BRACKETS[bracket];
        }

        let broken: BTreeSet<usize> = breaks.iter().copied().collect();
        let mut out = String::with_capacity(self.len() + breaks.len());
        for (idx, c) in symbol.into_iter().enumerate() {
            out.push(c);
            if broken.contains(&(idx + 1)) && idx + 1 < self.len() {
                out.push('&');
            }
        }
        out
    }

    /// Removes pseudoknots at stem granularity and returns the removed pairs.
    ///
    /// The stem crossing the most other stems goes first; ties remove the
    /// stem with fewer pairs, then the one starting later.
    pub fn remove_pseudoknots(&mut self, breaks: &[usize]) -> Vec<(usize, usize)> {
        let mut removed = Vec::new();
        loop {
            let stems = self.stems(breaks);
            let worst = stems
                .iter()
                .map(|s| (stems.iter().filter(|o| s.crosses(o)).count(), s))
                .filter(|(crossings, _)| *crossings > 0)
                .max_by(|(ca, a), (cb, b)| {
                    ca.cmp(cb)
                        .then(b.bp_length().cmp(&a.bp_length()))
                        .then(a.start1.cmp(&b.start1))
                })
                .map(|(_, s)| *s);
            let Some(stem) = worst else {
                break;
            };
            for (i, j) in stem.pairs() {
                self.remove_pair(i);
                removed.push((i, j));
            }
        }
        removed.sort_unstable();
        removed
    }

    /// Unpairs every stem consisting of a single base pair.
    pub fn dissolve_length_one_stems(&mut self, breaks: &[usize]) -> Vec<(usize, usize)> {
        let single: Vec<(usize, usize)> = self
            .stems(breaks)
            .into_iter()
            .filter(|s| s.bp_length() == 1)
            .map(|s| (s.start1, s.end2))
            .collect();
        for &(i, _) in &single {
            self.remove_pair(i);
        }
        single
    }

    /// Restricts the table to `range` (1-based, inclusive) and renumbers it
    /// from 1. Pairs leaving the range are dropped.
    pub fn slice(&self, first: usize, last: usize) -> PairTable {
        let mut out = PairTable::unpaired(last + 1 - first);
        for (i, j) in self.pairs() {
            if i >= first && j <= last {
                out.partners[i - first] = Some(j + 1 - first);
                out.partners[j - first] = Some(i + 1 - first);
            }
        }
        out
    }
}
