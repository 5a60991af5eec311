//! ChemAxon extended SMILES (`|...|` suffix) support.
//!
//! Two fields describe structural variation and are expanded into
//! concrete molecules:
//!
//! - `LN:a:min.max[.b1.b2]`: link node. Atom `a` and its substituents are
//!   repeated `min..=max` times along the path between `b1` and `b2`
//!   (by default the two neighbours of `a`).
//! - `m:a:t1.t2...`: position variation. The single bond of dummy atom `a`
//!   is moved to one of the target atoms and the dummy is removed.
//!
//! All other fields are skipped.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::SmilesBond;
use crate::mol::Mol;

/// Upper bound on the number of concrete structures one CX layer may
/// expand to.
pub const MAX_VARIANTS: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CxError {
    Unterminated,
    InvalidField { field: String },
    AtomOutOfRange { atom: usize },
    InvalidLinkNode { atom: usize },
    InvalidPositionVariation { atom: usize },
    TooManyVariants,
}

impl fmt::Display for CxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CxError::Unterminated => write!(f, "extension block is missing its closing '|'"),
            CxError::InvalidField { field } => write!(f, "invalid extension field {field:?}"),
            CxError::AtomOutOfRange { atom } => {
                write!(f, "extension refers to atom {atom}, which does not exist")
            }
            CxError::InvalidLinkNode { atom } => write!(
                f,
                "link node on atom {atom} needs a repeat range min <= max with min >= 1 \
                 and two bonded outer atoms"
            ),
            CxError::InvalidPositionVariation { atom } => write!(
                f,
                "position variation atom {atom} must have exactly one bond"
            ),
            CxError::TooManyVariants => write!(
                f,
                "extension layer expands to more than {MAX_VARIANTS} structures"
            ),
        }
    }
}

impl std::error::Error for CxError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
    pub atom: usize,
    pub min: usize,
    pub max: usize,
    pub outer: Option<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionVariation {
    pub atom: usize,
    pub targets: Vec<usize>,
}

/// The variation fields of one CX block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CxExtensions {
    pub link_nodes: Vec<LinkNode>,
    pub position_variations: Vec<PositionVariation>,
}

impl CxExtensions {
    pub fn is_empty(&self) -> bool {
        self.link_nodes.is_empty() && self.position_variations.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Field {
    LinkNode,
    Position,
}

/// Parse a `|...|` block. Text after the closing `|` is ignored.
pub fn parse_cx(text: &str) -> Result<CxExtensions, CxError> {
    let body = block_body(text.trim())?;
    let mut ext = CxExtensions::default();
    // A field such as `m:` may list several groups separated by commas;
    // a segment starting with a digit continues the previous field.
    let mut current = None;

    for segment in split_fields(body) {
        if let Some(rest) = segment.strip_prefix("LN:") {
            current = Some(Field::LinkNode);
            ext.link_nodes.push(parse_link_node(rest, segment)?);
        } else if let Some(rest) = segment.strip_prefix("m:") {
            current = Some(Field::Position);
            ext.position_variations.push(parse_position(rest, segment)?);
        } else if segment.starts_with(|c: char| c.is_ascii_digit()) {
            match current {
                Some(Field::LinkNode) => ext.link_nodes.push(parse_link_node(segment, segment)?),
                Some(Field::Position) => {
                    ext.position_variations.push(parse_position(segment, segment)?)
                }
                None => {}
            }
        } else {
            current = None;
        }
    }
    Ok(ext)
}

fn block_body(text: &str) -> Result<&str, CxError> {
    let inner = text.strip_prefix('|').ok_or(CxError::Unterminated)?;
    let end = inner.find('|').ok_or(CxError::Unterminated)?;
    Ok(&inner[..end])
}

/// Split on commas outside `(...)`, `{...}` and `$...$`.
fn split_fields(body: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut depth = 0u32;
    let mut in_label = false;
    let mut start = 0;
    for (i, ch) in body.char_indices() {
        match ch {
            '$' => in_label = !in_label,
            '(' | '{' if !in_label => depth += 1,
            ')' | '}' if !in_label => depth = depth.saturating_sub(1),
            ',' if depth == 0 && !in_label => {
                fields.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&body[start..]);
    fields.into_iter().filter(|f| !f.is_empty()).collect()
}

fn numbers(text: &str, sep: char, field: &str) -> Result<Vec<usize>, CxError> {
    text.split(sep)
        .map(|n| {
            n.parse::<usize>().map_err(|_| CxError::InvalidField {
                field: field.to_string(),
            })
        })
        .collect()
}

fn atom_and_values<'a>(text: &'a str, field: &str) -> Result<(usize, &'a str), CxError> {
    let invalid = || CxError::InvalidField {
        field: field.to_string(),
    };
    let (atom, values) = text.split_once(':').ok_or_else(invalid)?;
    let atom = atom.parse::<usize>().map_err(|_| invalid())?;
    Ok((atom, values))
}

fn parse_link_node(text: &str, field: &str) -> Result<LinkNode, CxError> {
    let (atom, values) = atom_and_values(text, field)?;
    let nums = numbers(values, '.', field)?;
    let outer = match nums.len() {
        2 => None,
        4 => Some((nums[2], nums[3])),
        _ => {
            return Err(CxError::InvalidField {
                field: field.to_string(),
            })
        }
    };
    Ok(LinkNode {
        atom,
        min: nums[0],
        max: nums[1],
        outer,
    })
}

fn parse_position(text: &str, field: &str) -> Result<PositionVariation, CxError> {
    let (atom, values) = atom_and_values(text, field)?;
    let targets = numbers(values, '.', field)?;
    Ok(PositionVariation { atom, targets })
}

/// Every concrete structure described by `ext`. Without variation fields
/// the result is the input alone, never an empty list.
pub fn enumerate_structural_variants(
    raw: &Mol<Atom, SmilesBond>,
    ext: &CxExtensions,
) -> Result<Vec<Mol<Atom, SmilesBond>>, CxError> {
    if ext.is_empty() {
        return Ok(vec![raw.clone()]);
    }

    let (links, positions) = resolve(raw, ext)?;

    let mut axes: Vec<usize> = links.iter().map(|l| l.max - l.min + 1).collect();
    axes.extend(positions.iter().map(|p| p.targets.len()));
    let total = axes
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .filter(|&t| t <= MAX_VARIANTS)
        .ok_or(CxError::TooManyVariants)?;

    let mut variants = Vec::with_capacity(total);
    for choice in choices(&axes) {
        let (link_choice, position_choice) = choice.split_at(links.len());
        variants.push(build_variant(raw, &links, link_choice, &positions, position_choice));
    }
    Ok(variants)
}

/// Check that every atom `ext` refers to exists in `raw` and has the
/// neighbours its field needs, without building any variant.
pub fn check_references(raw: &Mol<Atom, SmilesBond>, ext: &CxExtensions) -> Result<(), CxError> {
    resolve(raw, ext).map(|_| ())
}

fn resolve(
    raw: &Mol<Atom, SmilesBond>,
    ext: &CxExtensions,
) -> Result<(Vec<ResolvedLink>, Vec<ResolvedPosition>), CxError> {
    let links = ext
        .link_nodes
        .iter()
        .map(|ln| resolve_link(raw, ln))
        .collect::<Result<Vec<_>, _>>()?;
    let positions = ext
        .position_variations
        .iter()
        .map(|pv| resolve_position(raw, pv))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((links, positions))
}

struct ResolvedLink {
    atom: NodeIndex,
    min: usize,
    max: usize,
    far: NodeIndex,
    unit: Vec<NodeIndex>,
}

struct ResolvedPosition {
    dummy: NodeIndex,
    anchor: NodeIndex,
    bond: SmilesBond,
    targets: Vec<NodeIndex>,
}

fn node(raw: &Mol<Atom, SmilesBond>, atom: usize) -> Result<NodeIndex, CxError> {
    if atom < raw.atom_count() {
        Ok(NodeIndex::new(atom))
    } else {
        Err(CxError::AtomOutOfRange { atom })
    }
}

fn resolve_link(raw: &Mol<Atom, SmilesBond>, ln: &LinkNode) -> Result<ResolvedLink, CxError> {
    let atom = node(raw, ln.atom)?;
    let invalid = CxError::InvalidLinkNode { atom: ln.atom };
    if ln.min == 0 || ln.min > ln.max {
        return Err(invalid);
    }
    let (near, far) = match ln.outer {
        Some((b1, b2)) => (node(raw, b1)?, node(raw, b2)?),
        None => {
            let nbs: Vec<NodeIndex> = raw.neighbors(atom).collect();
            match nbs[..] {
                [a, b] => (a.min(b), a.max(b)),
                _ => return Err(invalid),
            }
        }
    };
    if raw.bond_between(atom, near).is_none() || raw.bond_between(atom, far).is_none() {
        return Err(invalid);
    }

    // The repeating unit: everything reachable from the link atom without
    // passing through either outer atom.
    let mut unit = vec![atom];
    let mut seen: HashSet<NodeIndex> = [atom, near, far].into_iter().collect();
    let mut queue = VecDeque::from([atom]);
    while let Some(cur) = queue.pop_front() {
        for nb in raw.neighbors(cur) {
            if seen.insert(nb) {
                unit.push(nb);
                queue.push_back(nb);
            }
        }
    }

    Ok(ResolvedLink {
        atom,
        min: ln.min,
        max: ln.max,
        far,
        unit,
    })
}

fn resolve_position(
    raw: &Mol<Atom, SmilesBond>,
    pv: &PositionVariation,
) -> Result<ResolvedPosition, CxError> {
    let dummy = node(raw, pv.atom)?;
    let edges: Vec<_> = raw.bonds_of(dummy).collect();
    let [edge] = edges[..] else {
        return Err(CxError::InvalidPositionVariation { atom: pv.atom });
    };
    let anchor = raw
        .neighbors(dummy)
        .next()
        .ok_or(CxError::InvalidPositionVariation { atom: pv.atom })?;
    if pv.targets.is_empty() {
        return Err(CxError::InvalidPositionVariation { atom: pv.atom });
    }
    let targets = pv
        .targets
        .iter()
        .map(|&t| node(raw, t))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedPosition {
        dummy,
        anchor,
        bond: raw.bond(edge).clone(),
        targets,
    })
}

/// Mixed-radix counter over `axes`.
fn choices(axes: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &n in axes {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..n).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    out
}

fn build_variant(
    raw: &Mol<Atom, SmilesBond>,
    links: &[ResolvedLink],
    link_choice: &[usize],
    positions: &[ResolvedPosition],
    position_choice: &[usize],
) -> Mol<Atom, SmilesBond> {
    let moved: HashSet<_> = links
        .iter()
        .zip(link_choice)
        .filter(|(l, &extra)| l.min - 1 + extra > 0)
        .filter_map(|(l, _)| raw.bond_between(l.atom, l.far))
        .collect();

    let mut mol: Mol<Atom, SmilesBond> = Mol::new();
    for idx in raw.atoms() {
        mol.add_atom(raw.atom(idx).clone());
    }
    for edge in raw.bonds() {
        if moved.contains(&edge) {
            continue;
        }
        if let Some((a, b)) = raw.bond_endpoints(edge) {
            mol.add_bond(a, b, raw.bond(edge).clone());
        }
    }

    for (link, &extra) in links.iter().zip(link_choice) {
        let copies = link.min - 1 + extra;
        if copies == 0 {
            continue;
        }
        let Some(link_edge) = raw.bond_between(link.atom, link.far) else {
            continue;
        };
        let link_bond = raw.bond(link_edge).clone();
        let mut last = link.atom;
        for _ in 0..copies {
            let copy = copy_unit(raw, &mut mol, &link.unit);
            mol.add_bond(last, copy, link_bond.clone());
            last = copy;
        }
        mol.add_bond(last, link.far, link_bond);
    }

    for (pos, &pick) in positions.iter().zip(position_choice) {
        mol.add_bond(pos.anchor, pos.targets[pick], pos.bond.clone());
    }

    if positions.is_empty() {
        return mol;
    }
    let dummies: HashSet<NodeIndex> = positions.iter().map(|p| p.dummy).collect();
    mol.induced(|idx| !dummies.contains(&idx)).0
}

/// Append a copy of `unit` with its internal bonds; returns the copy of
/// the unit's first atom.
fn copy_unit(
    raw: &Mol<Atom, SmilesBond>,
    mol: &mut Mol<Atom, SmilesBond>,
    unit: &[NodeIndex],
) -> NodeIndex {
    let copies: Vec<NodeIndex> = unit
        .iter()
        .map(|&idx| mol.add_atom(raw.atom(idx).clone()))
        .collect();
    for (i, &a) in unit.iter().enumerate() {
        for (j, &b) in unit.iter().enumerate().skip(i + 1) {
            if let Some(edge) = raw.bond_between(a, b) {
                mol.add_bond(copies[i], copies[j], raw.bond(edge).clone());
            }
        }
    }
    copies[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::{finalize, parse_smiles, split_cx, to_canonical_smiles};

    fn canon(smiles: &str) -> String {
        let mol = crate::smiles::from_smiles(smiles)
            .unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"));
        to_canonical_smiles(&mol)
    }

    fn expand(cxsmiles: &str) -> Vec<String> {
        let (_, cx) = split_cx(cxsmiles);
        let ext = parse_cx(cx.unwrap_or("||")).unwrap();
        let raw = parse_smiles(cxsmiles).unwrap();
        let mut out: Vec<String> = enumerate_structural_variants(&raw, &ext)
            .unwrap()
            .into_iter()
            .map(|m| to_canonical_smiles(&finalize(m).unwrap()))
            .collect();
        out.sort();
        out
    }

    // --- Parsing ---

    #[test]
    fn parse_link_node_field() {
        let ext = parse_cx("|LN:1:1.3|").unwrap();
        assert_eq!(
            ext.link_nodes,
            vec![LinkNode {
                atom: 1,
                min: 1,
                max: 3,
                outer: None
            }]
        );
    }

    #[test]
    fn parse_link_node_with_outer_atoms() {
        let ext = parse_cx("|LN:2:1.2.1.3|").unwrap();
        assert_eq!(ext.link_nodes[0].outer, Some((1, 3)));
    }

    #[test]
    fn parse_position_groups() {
        let ext = parse_cx("|m:6:0.1.2,7:3.4|").unwrap();
        assert_eq!(ext.position_variations.len(), 2);
        assert_eq!(ext.position_variations[0].targets, vec![0, 1, 2]);
        assert_eq!(ext.position_variations[1].atom, 7);
    }

    #[test]
    fn other_fields_are_skipped() {
        let ext = parse_cx("|(0,0,;1.5,0,),$R1;;$,c:1,3,m:2:0.1|").unwrap();
        assert!(ext.link_nodes.is_empty());
        assert_eq!(ext.position_variations.len(), 1);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse_cx("|LN:1:1.3"), Err(CxError::Unterminated));
        assert!(matches!(
            parse_cx("|LN:x:1.3|"),
            Err(CxError::InvalidField { .. })
        ));
        assert!(matches!(
            parse_cx("|LN:1:1|"),
            Err(CxError::InvalidField { .. })
        ));
    }

    // --- Expansion ---

    #[test]
    fn no_fields_gives_the_input() {
        let raw = parse_smiles("CCO").unwrap();
        let out = enumerate_structural_variants(&raw, &CxExtensions::default()).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn link_node_repeats_chain() {
        assert_eq!(
            expand("OCO |LN:1:1.3|"),
            {
                let mut v = vec![canon("OCO"), canon("OCCO"), canon("OCCCO")];
                v.sort();
                v
            }
        );
    }

    #[test]
    fn link_node_repeats_substituents() {
        // the methyl on the repeated carbon comes along
        let out = expand("NC(C)O |LN:1:2.2.0.3|");
        assert_eq!(out, vec![canon("NC(C)C(C)O")]);
    }

    #[test]
    fn position_variation_moves_substituent() {
        let out = expand("c1ccncc1.*Cl |m:6:0.1.2|");
        assert_eq!(out.len(), 3);
        assert!(out.contains(&canon("Clc1ccncc1")));
        assert!(out.contains(&canon("Clc1cccnc1")));
        assert!(out.contains(&canon("Clc1ccccn1")));
    }

    #[test]
    fn combined_fields_multiply() {
        assert_eq!(expand("OCC.*C |LN:1:1.2,m:3:0.2|").len(), 4);
    }

    #[test]
    fn invalid_references() {
        let raw = parse_smiles("CCO").unwrap();
        let ext = parse_cx("|LN:9:1.2|").unwrap();
        assert_eq!(
            enumerate_structural_variants(&raw, &ext).map(|v| v.len()),
            Err(CxError::AtomOutOfRange { atom: 9 })
        );
        let ext = parse_cx("|LN:1:2.1|").unwrap();
        assert_eq!(
            enumerate_structural_variants(&raw, &ext).map(|v| v.len()),
            Err(CxError::InvalidLinkNode { atom: 1 })
        );
        let ext = parse_cx("|m:1:0|").unwrap();
        assert_eq!(
            enumerate_structural_variants(&raw, &ext).map(|v| v.len()),
            Err(CxError::InvalidPositionVariation { atom: 1 })
        );
        assert_eq!(
            check_references(&raw, &ext),
            Err(CxError::InvalidPositionVariation { atom: 1 })
        );
        let ext = parse_cx("|m:3:0.1|").unwrap();
        assert_eq!(
            check_references(&raw, &ext),
            Err(CxError::AtomOutOfRange { atom: 3 })
        );
    }
}
