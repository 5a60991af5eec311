use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::rings::RingInfo;
use crate::traits::HasAtomMap;

/// A parsed SMARTS pattern.
pub type QueryMol = Mol<QueryAtom, BondExpr>;

/// One pattern atom: its test expression and the `:n` map class (`0` when
/// absent).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAtom {
    pub expr: AtomExpr,
    pub map_num: u16,
}

impl QueryAtom {
    pub fn new(expr: AtomExpr) -> Self {
        Self { expr, map_num: 0 }
    }
}

impl HasAtomMap for QueryAtom {
    fn map_num(&self) -> u16 {
        self.map_num
    }

    fn set_map_num(&mut self, map_num: u16) {
        self.map_num = map_num;
    }
}

/// AST node for a SMARTS atom query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    /// Wildcard `*`.
    True,
    /// Element test. `aromatic` is `None` for `#n`, `Some(true)` for
    /// lowercase symbols, `Some(false)` for uppercase.
    Element {
        atomic_num: u8,
        aromatic: Option<bool>,
    },
    /// `a`
    Aromatic,
    /// `A`
    Aliphatic,
    Isotope(u16),
    /// Explicit connections (`D`).
    Degree(u8),
    /// Bond order sum plus hydrogens (`v`).
    Valence(u8),
    /// Connections plus hydrogens (`X`).
    Connectivity(u8),
    /// Total hydrogen count (`H`).
    TotalHCount(u8),
    /// Implicit hydrogen count (`h`). Hydrogens are never graph atoms in
    /// perceived molecules, so this equals the stored count.
    ImplicitHCount(u8),
    /// Number of SSSR rings containing the atom (`Rn`).
    RingMembership(u8),
    /// Smallest SSSR ring size (`rn`).
    SmallestRingSize(u8),
    /// Number of ring bonds (`xn`).
    RingBondCount(u8),
    Charge(i8),
    /// `R` without a count, or `r`.
    InRing,
    /// `R0`
    NotInRing,
    /// `$(...)`: the atom must be the first atom of a match of the inner
    /// pattern.
    Recursive(Box<QueryMol>),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
}

/// AST node for a SMARTS bond query expression.
///
/// Unwritten bonds default to [`BondExpr::SingleOrAromatic`].
#[derive(Debug, Clone, PartialEq)]
pub enum BondExpr {
    /// `~`
    True,
    /// `-`, `/`, `\`: a non-aromatic single bond.
    Single,
    /// `=`: a non-aromatic double bond.
    Double,
    /// `#`
    Triple,
    /// `:`
    Aromatic,
    /// `@`
    Ring,
    SingleOrAromatic,
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
    Not(Box<BondExpr>),
}

/// Target-side data shared by every atom and bond test of one search.
pub struct MatchContext<'a> {
    pub mol: &'a Mol<Atom, Bond>,
    pub ring_info: &'a RingInfo,
    /// Target atoms that anchor a match of each recursive sub-pattern,
    /// keyed by the sub-pattern's address.
    pub recursive_matches: HashMap<usize, Vec<bool>>,
}

fn explicit_h_neighbors(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    mol.neighbors(idx)
        .filter(|&nb| mol.atom(nb).atomic_num == 1)
        .count() as u8
}

fn valence(mol: &Mol<Atom, Bond>, idx: NodeIndex) -> u8 {
    mol.bonds_of(idx)
        .map(|e| mol.bond(e).order.valence())
        .fold(mol.atom(idx).hydrogen_count, u8::saturating_add)
}

impl AtomExpr {
    pub fn matches(&self, ctx: &MatchContext, idx: NodeIndex) -> bool {
        let atom = ctx.mol.atom(idx);
        match self {
            AtomExpr::True => true,
            AtomExpr::Element {
                atomic_num,
                aromatic,
            } => atom.atomic_num == *atomic_num && aromatic.is_none_or(|a| atom.is_aromatic == a),
            AtomExpr::Aromatic => atom.is_aromatic,
            AtomExpr::Aliphatic => !atom.is_aromatic,
            AtomExpr::Isotope(iso) => atom.isotope == *iso,
            AtomExpr::Degree(d) => ctx.mol.degree(idx) == *d as usize,
            AtomExpr::Valence(v) => valence(ctx.mol, idx) == *v,
            AtomExpr::Connectivity(x) => {
                ctx.mol.degree(idx) + atom.hydrogen_count as usize == *x as usize
            }
            AtomExpr::TotalHCount(h) => {
                atom.hydrogen_count + explicit_h_neighbors(ctx.mol, idx) == *h
            }
            AtomExpr::ImplicitHCount(h) => atom.hydrogen_count == *h,
            AtomExpr::RingMembership(n) => ctx.ring_info.ring_membership(idx) == *n as usize,
            AtomExpr::SmallestRingSize(r) => {
                ctx.ring_info.smallest_ring_size(idx).unwrap_or(0) == *r as usize
            }
            AtomExpr::RingBondCount(x) => ctx.ring_info.ring_bond_count(idx) == *x as usize,
            AtomExpr::Charge(c) => atom.formal_charge == *c,
            AtomExpr::InRing => ctx.ring_info.is_ring_atom(idx),
            AtomExpr::NotInRing => !ctx.ring_info.is_ring_atom(idx),
            AtomExpr::Recursive(inner) => {
                let key = inner.as_ref() as *const QueryMol as usize;
                ctx.recursive_matches
                    .get(&key)
                    .and_then(|hits| hits.get(idx.index()).copied())
                    .unwrap_or(false)
            }
            AtomExpr::And(exprs) => exprs.iter().all(|e| e.matches(ctx, idx)),
            AtomExpr::Or(exprs) => exprs.iter().any(|e| e.matches(ctx, idx)),
            AtomExpr::Not(expr) => !expr.matches(ctx, idx),
        }
    }

    /// Visit every recursive sub-pattern, outermost first.
    pub fn for_each_recursive<'a>(&'a self, f: &mut impl FnMut(&'a QueryMol)) {
        match self {
            AtomExpr::Recursive(inner) => {
                let inner: &'a QueryMol = inner;
                f(inner);
                for atom in inner.atoms() {
                    inner.atom(atom).expr.for_each_recursive(f);
                }
            }
            AtomExpr::And(exprs) | AtomExpr::Or(exprs) => {
                for e in exprs {
                    e.for_each_recursive(f);
                }
            }
            AtomExpr::Not(expr) => expr.for_each_recursive(f),
            _ => {}
        }
    }

    /// Primitives that hold on every atom this expression matches: the
    /// expression itself, or the members of a top-level conjunction.
    pub fn conjuncts(&self) -> Vec<&AtomExpr> {
        match self {
            AtomExpr::And(parts) => parts.iter().flat_map(AtomExpr::conjuncts).collect(),
            other => vec![other],
        }
    }
}

impl BondExpr {
    pub fn matches(&self, ctx: &MatchContext, edge: EdgeIndex) -> bool {
        let bond = ctx.mol.bond(edge);
        match self {
            BondExpr::True => true,
            BondExpr::Single => bond.order == BondOrder::Single && !bond.is_aromatic,
            BondExpr::Double => bond.order == BondOrder::Double && !bond.is_aromatic,
            BondExpr::Triple => bond.order == BondOrder::Triple,
            BondExpr::Aromatic => bond.is_aromatic,
            BondExpr::Ring => ctx.ring_info.is_ring_bond(edge),
            BondExpr::SingleOrAromatic => bond.is_aromatic || bond.order == BondOrder::Single,
            BondExpr::And(exprs) => exprs.iter().all(|e| e.matches(ctx, edge)),
            BondExpr::Or(exprs) => exprs.iter().any(|e| e.matches(ctx, edge)),
            BondExpr::Not(expr) => !expr.matches(ctx, edge),
        }
    }

    /// The concrete order this expression asks for, if it names exactly one.
    pub fn specified_order(&self) -> Option<SpecifiedBond> {
        match self {
            BondExpr::Single => Some(SpecifiedBond::Single),
            BondExpr::Double => Some(SpecifiedBond::Double),
            BondExpr::Triple => Some(SpecifiedBond::Triple),
            BondExpr::Aromatic => Some(SpecifiedBond::Aromatic),
            BondExpr::And(parts) => parts.iter().find_map(BondExpr::specified_order),
            _ => None,
        }
    }
}

/// Bond type a template writes into a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifiedBond {
    Single,
    Double,
    Triple,
    Aromatic,
}
