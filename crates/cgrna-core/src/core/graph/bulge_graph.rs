use super::element::{ElementId, ElementKind};
use super::error::GraphError;
use super::pairs::{PairTable, StemSpan};
use super::sequence::SeqId;
use std::collections::{BTreeMap, BTreeSet};

/// Where a single-stranded stretch attaches to its flanking stems.
///
/// `prev` is the stem residue directly 5' of the stretch and `next` the stem
/// residue directly 3' of it. Either is `None` when the stretch ends at a
/// chain terminus or a backbone break instead of a stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// One end of a junction: the stem it touches and the side of that stem
/// (0: before strand one, 1: after strand one, 2: before strand two,
/// 3: after strand two).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemSide {
    pub stem: ElementId,
    pub side: usize,
}

impl StemSide {
    /// Index of the stem end this side touches: 0 for the end holding the
    /// first base pair, 1 for the end holding the last.
    pub fn end_index(&self) -> usize {
        side_end_index(self.side)
    }
}

pub fn side_end_index(side: usize) -> usize {
    match side {
        0 | 3 => 0,
        _ => 1,
    }
}

/// The secondary-structure graph of one (possibly multi-stranded) RNA.
///
/// Residues are numbered from 1. Every residue belongs to exactly one element;
/// stems own both strands of their helix, loops own their unpaired residues,
/// and zero-length junctions own none.
#[derive(Debug, Clone, PartialEq)]
pub struct BulgeGraph {
    name: String,
    seq: String,
    seq_ids: Vec<SeqId>,
    backbone_breaks: Vec<usize>,
    pair_table: PairTable,
    defines: BTreeMap<ElementId, Vec<usize>>,
    edges: BTreeMap<ElementId, BTreeSet<ElementId>>,
    segments: BTreeMap<ElementId, Vec<Segment>>,
    residue_elements: Vec<ElementId>,
}

struct RawLoop {
    first_residue: usize,
    define: Vec<usize>,
    segments: Vec<Segment>,
}

impl RawLoop {
    fn from_link(prev: usize, next: usize) -> Self {
        let define = if prev + 1 < next {
            vec![prev + 1, next - 1]
        } else {
            Vec::new()
        };
        Self {
            first_residue: prev,
            define,
            segments: vec![Segment {
                prev: Some(prev),
                next: Some(next),
            }],
        }
    }
}

impl BulgeGraph {
    /// Builds the element graph of a folded molecule.
    ///
    /// # Arguments
    ///
    /// * `name` - The molecule name carried into serialized output.
    /// * `seq` - One letter per residue, without strand separators.
    /// * `seq_ids` - Author identity of every residue, in sequence order.
    /// * `backbone_breaks` - Residues after which the backbone is discontinuous.
    /// * `pair_table` - Base pairs; must already be free of conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the lengths disagree or a break lies outside
    /// the molecule.
    pub fn new(
        name: impl Into<String>,
        seq: impl Into<String>,
        seq_ids: Vec<SeqId>,
        backbone_breaks: Vec<usize>,
        pair_table: PairTable,
    ) -> Result<Self, GraphError> {
        let seq = seq.into();
        let n = pair_table.len();
        if !seq.is_ascii() {
            return Err(GraphError::InvalidSequence(seq));
        }
        if seq.len() != n {
            return Err(GraphError::SequenceLength {
                expected: n,
                found: seq.len(),
            });
        }
        if seq_ids.len() != n {
            return Err(GraphError::SequenceLength {
                expected: n,
                found: seq_ids.len(),
            });
        }
        let breaks: Vec<usize> = backbone_breaks
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if let Some(&bad) = breaks.iter().find(|&&b| b == 0 || b >= n) {
            return Err(GraphError::InvalidBreak {
                position: bad,
                length: n,
            });
        }

        let mut graph = Self {
            name: name.into(),
            seq,
            seq_ids,
            backbone_breaks: breaks,
            pair_table,
            defines: BTreeMap::new(),
            edges: BTreeMap::new(),
            segments: BTreeMap::new(),
            residue_elements: Vec::new(),
        };
        graph.assign_elements();
        Ok(graph)
    }

    /// A graph-only molecule from dot-bracket notation. Strands separated by
    /// `&` become chains `A`, `B`, ... numbered from 1; a missing sequence is
    /// filled with `N`.
    pub fn from_dotbracket(dotbracket: &str, seq: Option<&str>) -> Result<Self, GraphError> {
        let (pair_table, breaks) = PairTable::from_dotbracket(dotbracket)?;
        let n = pair_table.len();
        let seq: String = match seq {
            Some(s) => s.chars().filter(|&c| c != '&').collect(),
            None => "N".repeat(n),
        };

        let mut seq_ids = Vec::with_capacity(n);
        let mut strand = 0usize;
        let mut number = 0i32;
        for residue in 1..=n {
            number += 1;
            seq_ids.push(SeqId::new(strand_chain_name(strand), number, None));
            if breaks.contains(&residue) {
                strand += 1;
                number = 0;
            }
        }

        Self::new("untitled", seq, seq_ids, breaks, pair_table)
    }

    fn assign_elements(&mut self) {
        let n = self.pair_table.len();
        let stems = self.pair_table.stems(&self.backbone_breaks);

        let mut strands: Vec<(usize, usize)> = stems
            .iter()
            .flat_map(|s| [(s.start1, s.end1), (s.start2, s.end2)])
            .collect();
        strands.sort_unstable();

        let mut raw_segments = Vec::with_capacity(strands.len() + 1);
        let mut prev = 0;
        for &(start, end) in &strands {
            raw_segments.push((prev, start));
            prev = end;
        }
        raw_segments.push((prev, n + 1));

        let mut links: BTreeMap<usize, usize> = BTreeMap::new();
        let mut fiveprime = Vec::new();
        let mut threeprime = Vec::new();
        for (p, q) in raw_segments {
            let cuts: Vec<usize> = self
                .backbone_breaks
                .iter()
                .copied()
                .filter(|&b| b >= p && b < q)
                .collect();
            if cuts.is_empty() && p >= 1 && q <= n {
                links.insert(p, q);
                continue;
            }
            let starts = std::iter::once(p + 1).chain(cuts.iter().map(|b| b + 1));
            let ends = cuts.iter().copied().chain(std::iter::once(q - 1));
            let last = cuts.len();
            for (k, (lo, hi)) in starts.zip(ends).enumerate() {
                if lo > hi {
                    continue;
                }
                let segment = Segment {
                    prev: (k == 0 && p >= 1).then_some(p),
                    next: (k == last && q <= n).then_some(q),
                };
                let piece = RawLoop {
                    first_residue: lo,
                    define: vec![lo, hi],
                    segments: vec![segment],
                };
                if segment.prev.is_some() {
                    threeprime.push(piece);
                } else {
                    fiveprime.push(piece);
                }
            }
        }

        let (hairpins, interiors, multiloops) = self.classify_links(&links, &stems);

        for (k, s) in stems.iter().enumerate() {
            self.defines.insert(
                ElementId::stem(k),
                vec![s.start1, s.end1, s.start2, s.end2],
            );
        }
        for (kind, mut loops) in [
            (ElementKind::Fiveprime, fiveprime),
            (ElementKind::Threeprime, threeprime),
            (ElementKind::Hairpin, hairpins),
            (ElementKind::Interior, interiors),
            (ElementKind::Multiloop, multiloops),
        ] {
            loops.sort_by_key(|l| l.first_residue);
            for (k, raw) in loops.into_iter().enumerate() {
                let id = ElementId::new(kind, k);
                self.defines.insert(id, raw.define);
                self.segments.insert(id, raw.segments);
            }
        }

        let mut residue_elements = vec![ElementId::stem(0); n];
        for (id, define) in &self.defines {
            for r in define_residues(define) {
                residue_elements[r - 1] = *id;
            }
        }
        self.residue_elements = residue_elements;

        for (id, segments) in &self.segments {
            for r in segments.iter().flat_map(|s| [s.prev, s.next]).flatten() {
                let stem = self.residue_elements[r - 1];
                self.edges.entry(*id).or_default().insert(stem);
                self.edges.entry(stem).or_default().insert(*id);
            }
        }
        for id in self.defines.keys() {
            self.edges.entry(*id).or_default();
        }
    }

    fn classify_links(
        &self,
        links: &BTreeMap<usize, usize>,
        stems: &[StemSpan],
    ) -> (Vec<RawLoop>, Vec<RawLoop>, Vec<RawLoop>) {
        let mut hairpins = Vec::new();
        let mut interiors = Vec::new();
        let mut multiloops = Vec::new();
        let mut in_closed_cycle = BTreeSet::new();

        for &start in links.keys() {
            if in_closed_cycle.contains(&start) {
                continue;
            }
            let mut cycle = vec![start];
            let mut current = start;
            let closed = loop {
                let Some(next) = self.pair_table.partner(links[&current]) else {
                    break false;
                };
                if next == start {
                    break true;
                }
                if !links.contains_key(&next) || cycle.contains(&next) {
                    break false;
                }
                cycle.push(next);
                current = next;
            };
            if !closed {
                continue;
            }
            cycle.sort_unstable();
            in_closed_cycle.extend(cycle.iter().copied());

            match cycle.as_slice() {
                &[p] => hairpins.push(RawLoop::from_link(p, links[&p])),
                &[p1, p2] if is_interior_pattern(p1, links[&p1], p2, links[&p2], stems) => {
                    let (q1, q2) = (links[&p1], links[&p2]);
                    let mut define = Vec::new();
                    for (p, q) in [(p1, q1), (p2, q2)] {
                        if p + 1 < q {
                            define.extend([p + 1, q - 1]);
                        }
                    }
                    interiors.push(RawLoop {
                        first_residue: p1,
                        define,
                        segments: vec![
                            Segment {
                                prev: Some(p1),
                                next: Some(q1),
                            },
                            Segment {
                                prev: Some(p2),
                                next: Some(q2),
                            },
                        ],
                    });
                }
                _ => multiloops.extend(cycle.iter().map(|&p| RawLoop::from_link(p, links[&p]))),
            }
        }

        multiloops.extend(
            links
                .iter()
                .filter(|(p, _)| !in_closed_cycle.contains(*p))
                .map(|(&p, &q)| RawLoop::from_link(p, q)),
        );
        (hairpins, interiors, multiloops)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The sequence without strand separators.
    pub fn seq(&self) -> &str {
        &self.seq
    }

    /// The sequence with `&` inserted at every backbone break.
    pub fn seq_with_separators(&self) -> String {
        insert_separators(&self.seq, &self.backbone_breaks)
    }

    pub fn seq_ids(&self) -> &[SeqId] {
        &self.seq_ids
    }

    pub fn seq_id(&self, residue: usize) -> Option<&SeqId> {
        residue.checked_sub(1).and_then(|i| self.seq_ids.get(i))
    }

    pub fn backbone_breaks_after(&self) -> &[usize] {
        &self.backbone_breaks
    }

    pub fn pair_table(&self) -> &PairTable {
        &self.pair_table
    }

    /// Distinct chain identifiers in order of first appearance.
    pub fn chains(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.seq_ids
            .iter()
            .map(|id| id.chain.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn seq_length(&self) -> usize {
        self.pair_table.len()
    }

    /// Residues covered by all element defines. Equals [`Self::seq_length`]
    /// for every well-formed graph.
    pub fn total_length(&self) -> usize {
        self.defines
            .values()
            .map(|d| d.chunks(2).map(|r| r[1] + 1 - r[0]).sum::<usize>())
            .sum()
    }

    pub fn defines(&self) -> &BTreeMap<ElementId, Vec<usize>> {
        &self.defines
    }

    pub fn define(&self, id: ElementId) -> Result<&[usize], GraphError> {
        self.defines
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(GraphError::UnknownElement(id))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.defines.contains_key(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.defines.keys().copied()
    }

    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = ElementId> + '_ {
        self.defines.keys().copied().filter(move |id| id.kind == kind)
    }

    pub fn stem_iterator(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements_of(ElementKind::Stem)
    }

    pub fn hloop_iterator(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements_of(ElementKind::Hairpin)
    }

    pub fn iloop_iterator(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements_of(ElementKind::Interior)
    }

    pub fn mloop_iterator(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements_of(ElementKind::Multiloop)
    }

    pub fn floop_iterator(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements_of(ElementKind::Fiveprime)
    }

    pub fn tloop_iterator(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements_of(ElementKind::Threeprime)
    }

    pub fn edges(&self, id: ElementId) -> Result<&BTreeSet<ElementId>, GraphError> {
        self.edges.get(&id).ok_or(GraphError::UnknownElement(id))
    }

    /// Stems adjacent to `id`, in identifier order.
    pub fn connections(&self, id: ElementId) -> Result<Vec<ElementId>, GraphError> {
        Ok(self
            .edges(id)?
            .iter()
            .copied()
            .filter(ElementId::is_stem)
            .collect())
    }

    pub fn segments(&self, id: ElementId) -> &[Segment] {
        self.segments.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stem_length(&self, stem: ElementId) -> Result<usize, GraphError> {
        let d = self.define(stem)?;
        Ok(d[1] + 1 - d[0])
    }

    pub fn pairing_partner(&self, residue: usize) -> Option<usize> {
        self.pair_table.partner(residue)
    }

    pub fn get_node_from_residue_num(&self, residue: usize) -> Result<ElementId, GraphError> {
        residue
            .checked_sub(1)
            .and_then(|i| self.residue_elements.get(i).copied())
            .ok_or(GraphError::ResidueOutOfRange {
                residue,
                length: self.seq_length(),
            })
    }

    /// Residues of an element in ascending order.
    pub fn define_residue_num_iterator(&self, id: ElementId) -> Result<Vec<usize>, GraphError> {
        Ok(define_residues(self.define(id)?).collect())
    }

    fn stem_side(&self, residue: usize, loop_follows: bool) -> Option<StemSide> {
        let stem = self.get_node_from_residue_num(residue).ok()?;
        let d = self.defines.get(&stem)?;
        let side = match (loop_follows, residue) {
            (true, r) if r == d[1] => 1,
            (true, r) if r == d[3] => 3,
            (false, r) if r == d[0] => 0,
            (false, r) if r == d[2] => 2,
            _ => return None,
        };
        Some(StemSide { stem, side })
    }

    /// The stem sides at both ends of the first segment of a junction or
    /// hairpin, 5' end first.
    pub fn junction_ends(&self, id: ElementId) -> Option<(StemSide, StemSide)> {
        let segment = self.segments(id).first()?;
        Some((
            self.stem_side(segment.prev?, true)?,
            self.stem_side(segment.next?, false)?,
        ))
    }

    /// Every stem side touched by an element, in segment order.
    pub fn attachments(&self, id: ElementId) -> Vec<StemSide> {
        self.segments(id)
            .iter()
            .flat_map(|s| {
                [
                    s.prev.and_then(|r| self.stem_side(r, true)),
                    s.next.and_then(|r| self.stem_side(r, false)),
                ]
            })
            .flatten()
            .collect()
    }

    /// The first side of `stem` touched by `elem`.
    pub fn attachment_side(&self, stem: ElementId, elem: ElementId) -> Result<usize, GraphError> {
        self.attachments(elem)
            .into_iter()
            .find(|a| a.stem == stem)
            .map(|a| a.side)
            .ok_or(GraphError::NotAdjacent(elem, stem))
    }

    /// Stem end indices `(near, far)` relative to `elem`: `near` is the end
    /// of `stem` that `elem` touches.
    pub fn get_sides(&self, stem: ElementId, elem: ElementId) -> Result<(usize, usize), GraphError> {
        let near = side_end_index(self.attachment_side(stem, elem)?);
        Ok((near, 1 - near))
    }

    /// Signed junction type of `bulge` when walked from `stem1` to `stem2`.
    ///
    /// Interior loops give `1` when `stem1` is the enclosing stem and `-1`
    /// otherwise. Multiloop segments are typed by the sides they connect:
    /// `(1, 0) -> 2`, `(3, 0) -> 3`, `(1, 2) -> 4`, `(3, 2) -> 5`, negated when
    /// walked against the backbone direction.
    pub fn connection_type(
        &self,
        bulge: ElementId,
        stem1: ElementId,
        stem2: ElementId,
    ) -> Result<i32, GraphError> {
        match bulge.kind {
            ElementKind::Interior => {
                let side = self.attachment_side(stem1, bulge)?;
                self.attachment_side(stem2, bulge)?;
                Ok(if side_end_index(side) == 1 { 1 } else { -1 })
            }
            _ => {
                let (from, to) = self
                    .junction_ends(bulge)
                    .ok_or(GraphError::NotAdjacent(bulge, stem1))?;
                let code = match (from.side, to.side) {
                    (1, 0) => 2,
                    (3, 0) => 3,
                    (1, 2) => 4,
                    _ => 5,
                };
                if from.stem == stem1 && to.stem == stem2 {
                    Ok(code)
                } else if from.stem == stem2 && to.stem == stem1 {
                    Ok(-code)
                } else {
                    Err(GraphError::NotAdjacent(bulge, stem1))
                }
            }
        }
    }

    pub fn to_dotbracket_string(&self) -> String {
        self.pair_table.to_dotbracket(&self.backbone_breaks)
    }

    /// One element letter per residue.
    pub fn to_element_string(&self) -> String {
        self.residue_elements.iter().map(|e| e.kind.letter()).collect()
    }

    /// Groups of elements reachable from each other through edges.
    pub fn connected_components(&self) -> Vec<BTreeSet<ElementId>> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for start in self.defines.keys() {
            if seen.contains(start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut stack = vec![*start];
            while let Some(id) = stack.pop() {
                if !component.insert(id) {
                    continue;
                }
                if let Some(neighbors) = self.edges.get(&id) {
                    stack.extend(neighbors.iter().copied());
                }
            }
            seen.extend(component.iter().copied());
            components.push(component);
        }
        components
    }

    /// Renames elements. The mapping must cover every element, keep each
    /// element's kind, and be injective.
    pub fn relabel(&self, mapping: &BTreeMap<ElementId, ElementId>) -> Result<Self, GraphError> {
        let rename = |id: &ElementId| -> Result<ElementId, GraphError> {
            let target = mapping
                .get(id)
                .copied()
                .ok_or_else(|| GraphError::InvalidRelabel(format!("{} is not mapped", id)))?;
            if target.kind != id.kind {
                return Err(GraphError::InvalidRelabel(format!(
                    "{} cannot become {}",
                    id, target
                )));
            }
            Ok(target)
        };

        let mut defines = BTreeMap::new();
        for (id, define) in &self.defines {
            if defines.insert(rename(id)?, define.clone()).is_some() {
                return Err(GraphError::InvalidRelabel(format!(
                    "two elements map onto {}",
                    rename(id)?
                )));
            }
        }
        let mut edges = BTreeMap::new();
        for (id, neighbors) in &self.edges {
            let renamed = neighbors.iter().map(rename).collect::<Result<_, _>>()?;
            edges.insert(rename(id)?, renamed);
        }
        let mut segments = BTreeMap::new();
        for (id, segs) in &self.segments {
            segments.insert(rename(id)?, segs.clone());
        }
        let residue_elements = self
            .residue_elements
            .iter()
            .map(rename)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            defines,
            edges,
            segments,
            residue_elements,
            ..self.clone()
        })
    }
}

fn is_interior_pattern(p1: usize, q1: usize, p2: usize, q2: usize, stems: &[StemSpan]) -> bool {
    let outer = stems.iter().find(|s| s.end1 == p1 && s.start2 == q2);
    let inner = stems.iter().find(|s| s.start1 == q1 && s.end2 == p2);
    matches!((outer, inner), (Some(o), Some(i)) if o != i)
}

fn define_residues(define: &[usize]) -> impl Iterator<Item = usize> + '_ {
    define.chunks(2).flat_map(|r| r[0]..=r[1])
}

pub(crate) fn insert_separators(seq: &str, breaks: &[usize]) -> String {
    let mut out = String::with_capacity(seq.len() + breaks.len());
    for (i, c) in seq.chars().enumerate() {
        out.push(c);
        if breaks.contains(&(i + 1)) && i + 1 < seq.len() {
            out.push('&');
        }
    }
    out
}

fn strand_chain_name(strand: usize) -> String {
    if strand < 26 {
        char::from(b'A' + strand as u8).to_string()
    } else {
        strand.to_string()
    }
}
