//! Subgraph isomorphism in the VF2 style.
//!
//! Matchers receive indices rather than payloads so that callers can
//! consult per-atom context (ring membership, recursive pattern results)
//! that lives outside the graph.

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::mol::Mol;

/// `(query atom, target atom)` pairs, ordered by query atom index.
pub type AtomMapping = Vec<(NodeIndex, NodeIndex)>;

/// Every embedding of `query` into `target`, including ones that differ
/// only by a symmetry of the query. `limit` stops the search early.
///
/// `atom_match` is called with `(target atom, query atom)` and
/// `bond_match` with `(target bond, query bond)`.
pub fn substruct_matches_with<A1, B1, A2, B2>(
    target: &Mol<A1, B1>,
    query: &Mol<A2, B2>,
    atom_match: impl Fn(NodeIndex, NodeIndex) -> bool,
    bond_match: impl Fn(EdgeIndex, EdgeIndex) -> bool,
    limit: Option<usize>,
) -> Vec<AtomMapping> {
    if query.atom_count() > target.atom_count() {
        return Vec::new();
    }
    let mut vf2 = Vf2 {
        target,
        query,
        atom_match,
        bond_match,
        query_order: search_order(query),
        query_map: vec![None; query.atom_count()],
        target_used: vec![false; target.atom_count()],
        limit: limit.unwrap_or(usize::MAX),
        results: Vec::new(),
    };
    if vf2.limit > 0 {
        vf2.recurse(0);
    }
    vf2.results
}

/// Breadth-first order over each query component, starting from its
/// highest-degree atom, so every atom after a component's first has an
/// already-placed neighbour.
fn search_order<A, B>(query: &Mol<A, B>) -> Vec<NodeIndex> {
    let n = query.atom_count();
    let mut seeds: Vec<NodeIndex> = query.atoms().collect();
    seeds.sort_by_key(|&a| std::cmp::Reverse(query.degree(a)));

    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for seed in seeds {
        if placed[seed.index()] {
            continue;
        }
        placed[seed.index()] = true;
        let mut head = order.len();
        order.push(seed);
        while head < order.len() {
            let node = order[head];
            head += 1;
            let mut next: Vec<NodeIndex> = query
                .neighbors(node)
                .filter(|nb| !placed[nb.index()])
                .collect();
            next.sort();
            next.dedup();
            for nb in next {
                placed[nb.index()] = true;
                order.push(nb);
            }
        }
    }
    order
}

struct Vf2<'a, A1, B1, A2, B2, FA, FB> {
    target: &'a Mol<A1, B1>,
    query: &'a Mol<A2, B2>,
    atom_match: FA,
    bond_match: FB,
    query_order: Vec<NodeIndex>,
    query_map: Vec<Option<NodeIndex>>,
    target_used: Vec<bool>,
    limit: usize,
    results: Vec<AtomMapping>,
}

impl<A1, B1, A2, B2, FA, FB> Vf2<'_, A1, B1, A2, B2, FA, FB>
where
    FA: Fn(NodeIndex, NodeIndex) -> bool,
    FB: Fn(EdgeIndex, EdgeIndex) -> bool,
{
    fn recurse(&mut self, depth: usize) {
        if depth == self.query_order.len() {
            let mapping = self
                .query_map
                .iter()
                .enumerate()
                .filter_map(|(q, t)| t.map(|t| (NodeIndex::new(q), t)))
                .collect();
            self.results.push(mapping);
            return;
        }

        let query_node = self.query_order[depth];
        for target_node in self.candidates(query_node) {
            if self.target_used[target_node.index()] || !self.is_feasible(query_node, target_node)
            {
                continue;
            }

            self.query_map[query_node.index()] = Some(target_node);
            self.target_used[target_node.index()] = true;

            self.recurse(depth + 1);

            self.query_map[query_node.index()] = None;
            self.target_used[target_node.index()] = false;

            if self.results.len() >= self.limit {
                return;
            }
        }
    }

    /// Neighbours of an already-mapped partner when one exists, otherwise
    /// every target atom.
    fn candidates(&self, query_node: NodeIndex) -> Vec<NodeIndex> {
        let anchor = self
            .query
            .neighbors(query_node)
            .find_map(|nb| self.query_map[nb.index()]);
        match anchor {
            Some(t) => {
                let mut cands: Vec<NodeIndex> = self.target.neighbors(t).collect();
                cands.sort();
                cands.dedup();
                cands
            }
            None => self.target.atoms().collect(),
        }
    }

    fn is_feasible(&self, query_node: NodeIndex, target_node: NodeIndex) -> bool {
        if self.query.degree(query_node) > self.target.degree(target_node) {
            return false;
        }
        if !(self.atom_match)(target_node, query_node) {
            return false;
        }

        for q_edge in self.query.bonds_of(query_node) {
            let Some((a, b)) = self.query.bond_endpoints(q_edge) else {
                continue;
            };
            let q_neighbor = if a == query_node { b } else { a };
            let Some(t_mapped) = self.query_map[q_neighbor.index()] else {
                continue;
            };
            match self.target.bond_between(target_node, t_mapped) {
                Some(t_edge) if (self.bond_match)(t_edge, q_edge) => {}
                _ => return false,
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::{Bond, BondOrder};
    use crate::smiles::from_smiles;

    fn mol(smiles: &str) -> Mol<Atom, Bond> {
        from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    fn matches(target: &Mol<Atom, Bond>, query: &Mol<Atom, Bond>) -> Vec<AtomMapping> {
        substruct_matches_with(
            target,
            query,
            |t, q| {
                let (t, q) = (target.atom(t), query.atom(q));
                t.atomic_num == q.atomic_num && (!q.is_aromatic || t.is_aromatic)
            },
            |t, q| {
                let (t, q) = (target.bond(t), query.bond(q));
                if t.is_aromatic && q.is_aromatic {
                    true
                } else {
                    t.order == q.order
                }
            },
            None,
        )
    }

    // --- Counting embeddings ---

    #[test]
    fn propane_cc_matches() {
        assert_eq!(matches(&mol("CCC"), &mol("CC")).len(), 4);
    }

    #[test]
    fn cyclohexane_cc_matches_cover_all_edges() {
        let target = mol("C1CCCCC1");
        let all = matches(&target, &mol("CC"));
        assert_eq!(all.len(), 12);
        for mapping in &all {
            assert!(target.bond_between(mapping[0].1, mapping[1].1).is_some());
        }
    }

    #[test]
    fn benzene_automorphisms() {
        assert_eq!(matches(&mol("c1ccccc1"), &mol("c1ccccc1")).len(), 12);
    }

    #[test]
    fn no_duplicate_mappings() {
        let all = matches(&mol("c1ccccc1"), &mol("c1ccccc1"));
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn limit_stops_early() {
        let target = mol("C1CCCCC1");
        let query = mol("CC");
        let first = substruct_matches_with(&target, &query, |_, _| true, |_, _| true, Some(3));
        assert_eq!(first.len(), 3);
        let none = substruct_matches_with(&target, &query, |_, _| true, |_, _| true, Some(0));
        assert!(none.is_empty());
    }

    // --- Bond and atom checks ---

    #[test]
    fn bond_order_is_respected() {
        assert!(matches(&mol("CC"), &mol("C=C")).is_empty());
        assert!(matches(&mol("C=C"), &mol("CC")).is_empty());
        assert!(!matches(&mol("C#N"), &mol("C#N")).is_empty());
    }

    #[test]
    fn aromatic_query_does_not_match_aliphatic() {
        assert!(matches(&mol("C1CCCCC1"), &mol("c1ccccc1")).is_empty());
        assert!(!matches(&mol("c1ccc2ccccc2c1"), &mol("c1ccccc1")).is_empty());
    }

    #[test]
    fn mapping_is_ordered_by_query_atom() {
        let target = mol("OCC");
        let query = mol("CO");
        let m = &matches(&target, &query)[0];
        assert_eq!(m[0].0, NodeIndex::new(0));
        assert_eq!(target.atom(m[0].1).atomic_num, 6);
        assert_eq!(target.atom(m[1].1).atomic_num, 8);
    }

    #[test]
    fn disconnected_query_places_each_component() {
        let target = mol("CCO.N");
        let query = mol("O.N");
        let all = matches(&target, &query);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn custom_bond_matcher_ignores_order() {
        let target = mol("C=C");
        let query = mol("CC");
        let all = substruct_matches_with(
            &target,
            &query,
            |t, q| target.atom(t).atomic_num == query.atom(q).atomic_num,
            |t, _| target.bond(t).order != BondOrder::Triple,
            None,
        );
        assert_eq!(all.len(), 2);
    }

    // --- Degenerate inputs ---

    #[test]
    fn empty_query_matches_once() {
        let all = matches(&mol("CCO"), &Mol::new());
        assert_eq!(all, vec![Vec::new()]);
    }

    #[test]
    fn larger_query_never_matches() {
        assert!(matches(&mol("C"), &mol("CCCCCC")).is_empty());
        assert!(matches(&Mol::new(), &mol("C")).is_empty());
    }
}
