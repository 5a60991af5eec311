mod error;
mod parser;
pub mod query;
mod writer;

pub use error::SmartsError;
pub use query::{AtomExpr, BondExpr, MatchContext, QueryAtom, QueryMol, SpecifiedBond};
pub(crate) use writer::bracket_atom;
pub use writer::{atom_expr_text, bond_expr_text, to_smarts};

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
use crate::rings::RingInfo;
use crate::substruct::{substruct_matches_with, AtomMapping};

pub fn from_smarts(s: &str) -> Result<QueryMol, SmartsError> {
    parser::parse(s)
}

pub fn has_smarts_match(target: &Mol<Atom, Bond>, query: &QueryMol) -> bool {
    !smarts_matches(target, query, Some(1)).is_empty()
}

/// All embeddings of `query` in `target`, symmetric duplicates included.
pub fn smarts_matches(
    target: &Mol<Atom, Bond>,
    query: &QueryMol,
    limit: Option<usize>,
) -> Vec<AtomMapping> {
    let ring_info = RingInfo::sssr(target);
    let ctx = match_context(target, &ring_info, query);
    matches_in_context(&ctx, query, limit)
}

/// Build the context for matching `query`, evaluating its recursive
/// sub-patterns against `target` up front.
pub fn match_context<'a>(
    target: &'a Mol<Atom, Bond>,
    ring_info: &'a RingInfo,
    query: &QueryMol,
) -> MatchContext<'a> {
    let mut ctx = MatchContext {
        mol: target,
        ring_info,
        recursive_matches: HashMap::new(),
    };

    let mut nested = Vec::new();
    for atom in query.atoms() {
        query.atom(atom).expr.for_each_recursive(&mut |inner| nested.push(inner));
    }
    // Inner patterns come after the patterns that contain them.
    for inner in nested.into_iter().rev() {
        let key = inner as *const QueryMol as usize;
        if ctx.recursive_matches.contains_key(&key) {
            continue;
        }
        let hits = anchored_hits(&ctx, inner);
        ctx.recursive_matches.insert(key, hits);
    }
    ctx
}

pub fn matches_in_context(
    ctx: &MatchContext,
    query: &QueryMol,
    limit: Option<usize>,
) -> Vec<AtomMapping> {
    substruct_matches_with(
        ctx.mol,
        query,
        |t, q| query.atom(q).expr.matches(ctx, t),
        |t, q| query.bond(q).matches(ctx, t),
        limit,
    )
}

/// For each target atom, whether `inner` embeds with its first atom there.
fn anchored_hits(ctx: &MatchContext, inner: &QueryMol) -> Vec<bool> {
    let first = NodeIndex::new(0);
    ctx.mol
        .atoms()
        .map(|anchor| {
            !substruct_matches_with(
                ctx.mol,
                inner,
                |t, q| (q != first || t == anchor) && inner.atom(q).expr.matches(ctx, t),
                |t, q| inner.bond(q).matches(ctx, t),
                Some(1),
            )
            .is_empty()
        })
        .collect()
}
