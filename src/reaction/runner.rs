use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::aromaticity;
use crate::atom::Atom;
use crate::bond::{Bond, SmilesBond, SmilesBondOrder};
use crate::element::{charged_valences, Element};
use crate::kekulize::kekulize;
use crate::mol::Mol;
use crate::rings::RingInfo;
use crate::smarts::{match_context, matches_in_context, AtomExpr, QueryMol, SpecifiedBond};
use crate::smiles::{bond_order_sum, implicit_hydrogens};
use crate::substruct::AtomMapping;

use super::error::ReactionError;
use super::Reaction;

/// Default cap on the number of template-match combinations per run.
pub const DEFAULT_MAX_COMBINATIONS: usize = 1000;

impl Reaction {
    /// Apply this reaction to one molecule per reactant template.
    ///
    /// Returns one entry per combination of template matches, each holding
    /// one product per product template. An empty result means some
    /// template did not match.
    pub fn run(&self, reactants: &[&Mol<Atom, Bond>]) -> Result<Vec<Vec<Mol<Atom, Bond>>>, ReactionError> {
        self.run_with_limit(reactants, DEFAULT_MAX_COMBINATIONS)
    }

    pub fn run_with_limit(
        &self,
        reactants: &[&Mol<Atom, Bond>],
        max_combinations: usize,
    ) -> Result<Vec<Vec<Mol<Atom, Bond>>>, ReactionError> {
        if reactants.len() != self.reactant_templates.len() {
            return Err(ReactionError::WrongReactantCount {
                expected: self.reactant_templates.len(),
                got: reactants.len(),
            });
        }
        check_unique_maps(&self.reactant_templates)?;

        let per_template_matches: Vec<Vec<AtomMapping>> = self
            .reactant_templates
            .iter()
            .zip(reactants)
            .map(|(tmpl, mol)| {
                let ring_info = RingInfo::sssr(mol);
                let ctx = match_context(mol, &ring_info, tmpl);
                matches_in_context(&ctx, tmpl, Some(max_combinations.saturating_add(1)))
            })
            .collect();

        if per_template_matches.iter().any(Vec::is_empty) {
            return Ok(Vec::new());
        }

        let combinations = cartesian_product(&per_template_matches, max_combinations);

        combinations
            .iter()
            .map(|combo| self.generate_products(combo, reactants))
            .collect()
    }

    fn generate_products(
        &self,
        match_combo: &[&AtomMapping],
        reactants: &[&Mol<Atom, Bond>],
    ) -> Result<Vec<Mol<Atom, Bond>>, ReactionError> {
        let matched = MatchedReactants::new(&self.reactant_templates, match_combo);
        self.product_templates
            .iter()
            .map(|tmpl| build_product(tmpl, &matched, reactants))
            .collect()
    }
}

fn check_unique_maps(templates: &[QueryMol]) -> Result<(), ReactionError> {
    let mut seen = HashSet::new();
    for tmpl in templates {
        for idx in tmpl.atoms() {
            let map_num = tmpl.atom(idx).map_num;
            if map_num > 0 && !seen.insert(map_num) {
                return Err(ReactionError::DuplicateAtomMap { map_num });
            }
        }
    }
    Ok(())
}

/// Where each mapped template atom landed in the reactants.
struct MatchedReactants {
    by_map: HashMap<u16, (usize, NodeIndex)>,
    map_of: Vec<HashMap<NodeIndex, u16>>,
    matched: Vec<HashSet<NodeIndex>>,
    template_pairs: HashSet<(u16, u16)>,
}

impl MatchedReactants {
    fn new(templates: &[QueryMol], match_combo: &[&AtomMapping]) -> Self {
        let mut by_map = HashMap::new();
        let mut map_of = vec![HashMap::new(); templates.len()];
        let mut matched = vec![HashSet::new(); templates.len()];
        for (ri, (tmpl, mapping)) in templates.iter().zip(match_combo).enumerate() {
            for &(q, t) in mapping.iter() {
                matched[ri].insert(t);
                let map_num = tmpl.atom(q).map_num;
                if map_num > 0 {
                    by_map.insert(map_num, (ri, t));
                    map_of[ri].insert(t, map_num);
                }
            }
        }
        let template_pairs = templates.iter().flat_map(mapped_pairs).collect();
        Self {
            by_map,
            map_of,
            matched,
            template_pairs,
        }
    }
}

fn mapped_pairs(tmpl: &QueryMol) -> HashSet<(u16, u16)> {
    tmpl.bonds()
        .filter_map(|edge| {
            let (a, b) = tmpl.bond_endpoints(edge)?;
            let (ma, mb) = (tmpl.atom(a).map_num, tmpl.atom(b).map_num);
            (ma > 0 && mb > 0).then_some((ma.min(mb), ma.max(mb)))
        })
        .collect()
}

fn build_product(
    tmpl: &QueryMol,
    matched: &MatchedReactants,
    reactants: &[&Mol<Atom, Bond>],
) -> Result<Mol<Atom, Bond>, ReactionError> {
    let mut product: Mol<Atom, SmilesBond> = Mol::new();
    let mut node_of = Vec::with_capacity(tmpl.atom_count());
    let mut source_of: HashMap<NodeIndex, (usize, NodeIndex)> = HashMap::new();
    let mut node_by_map: HashMap<u16, NodeIndex> = HashMap::new();
    let mut explicit_h: HashSet<NodeIndex> = HashSet::new();

    for p_idx in tmpl.atoms() {
        let query_atom = tmpl.atom(p_idx);
        let source = (query_atom.map_num > 0)
            .then(|| matched.by_map.get(&query_atom.map_num).copied())
            .flatten();
        let mut atom = match source {
            Some((ri, t)) => reactants[ri].atom(t).clone(),
            None => Atom::default(),
        };
        let h_given = apply_template(&mut atom, &query_atom.expr);
        atom.map_num = 0;
        atom.no_implicit = true;

        let node = product.add_atom(atom);
        node_of.push(node);
        if let Some(src) = source {
            source_of.insert(node, src);
            node_by_map.insert(query_atom.map_num, node);
        }
        if h_given {
            explicit_h.insert(node);
        }
    }

    let product_pairs = mapped_pairs(tmpl);
    let aromatic_written: Vec<bool> = tmpl
        .atoms()
        .map(|idx| written_aromatic(&tmpl.atom(idx).expr))
        .collect();
    let reactant_bond = |pa: NodeIndex, pb: NodeIndex| {
        match (source_of.get(&pa), source_of.get(&pb)) {
            (Some(&(ra, ta)), Some(&(rb, tb))) if ra == rb => reactants[ra]
                .bond_between(ta, tb)
                .map(|e| reactants[ra].bond(e)),
            _ => None,
        }
    };

    // A template that writes an aromatic bond the reactant lacks rebuilds
    // the whole aromatic system: its bonds are kekulized again from scratch.
    let aromatizes = tmpl.bonds().any(|edge| {
        let Some((a, b)) = tmpl.bond_endpoints(edge) else {
            return false;
        };
        aromatic_written[a.index()]
            && aromatic_written[b.index()]
            && matches!(
                tmpl.bond(edge).specified_order(),
                None | Some(SpecifiedBond::Aromatic)
            )
            && !reactant_bond(node_of[a.index()], node_of[b.index()])
                .is_some_and(|bond| bond.is_aromatic)
    });

    let mut fixed_order: HashSet<EdgeIndex> = HashSet::new();
    for edge in tmpl.bonds() {
        let Some((a, b)) = tmpl.bond_endpoints(edge) else {
            continue;
        };
        let (pa, pb) = (node_of[a.index()], node_of[b.index()]);
        let existing = reactant_bond(pa, pb);
        let both_aromatic = aromatic_written[a.index()] && aromatic_written[b.index()];
        let order = match tmpl.bond(edge).specified_order() {
            Some(SpecifiedBond::Single) => SmilesBondOrder::Single,
            Some(SpecifiedBond::Double) => SmilesBondOrder::Double,
            Some(SpecifiedBond::Triple) => SmilesBondOrder::Triple,
            Some(SpecifiedBond::Aromatic) if aromatizes => SmilesBondOrder::Aromatic,
            // An aromatic bond that already exists keeps its Kekulé order so
            // it stays consistent with the carried ring bonds.
            Some(SpecifiedBond::Aromatic) => match existing {
                Some(bond) if bond.is_aromatic => SmilesBond::from(bond).order,
                _ => SmilesBondOrder::Aromatic,
            },
            None if aromatizes && both_aromatic => SmilesBondOrder::Aromatic,
            None => existing
                .map(|bond| SmilesBond::from(bond).order)
                .unwrap_or(SmilesBondOrder::Single),
        };
        let product_edge = product.add_bond(pa, pb, SmilesBond::new(order));
        if matches!(
            tmpl.bond(edge).specified_order(),
            Some(SpecifiedBond::Single | SpecifiedBond::Double | SpecifiedBond::Triple)
        ) {
            fixed_order.insert(product_edge);
        }
    }

    let mut carried: HashMap<(usize, NodeIndex), NodeIndex> = HashMap::new();
    let mapped_nodes: Vec<(NodeIndex, (usize, NodeIndex))> =
        node_of.iter().filter_map(|n| source_of.get(n).map(|&s| (*n, s))).collect();

    for &(product_node, (ri, t_idx)) in &mapped_nodes {
        let reactant = reactants[ri];
        let map_num = matched.map_of[ri].get(&t_idx).copied().unwrap_or(0);
        for neighbor in reactant.neighbors(t_idx) {
            if !matched.matched[ri].contains(&neighbor) {
                carry_substituent(
                    &mut product,
                    reactant,
                    &matched.matched[ri],
                    (ri, t_idx, product_node),
                    neighbor,
                    &mut carried,
                );
                continue;
            }
            // A bond between matched atoms that neither template mentions
            // (typically a ring closure) is kept as is.
            let Some(&n_map) = matched.map_of[ri].get(&neighbor) else {
                continue;
            };
            let pair = (map_num.min(n_map), map_num.max(n_map));
            if matched.template_pairs.contains(&pair) || product_pairs.contains(&pair) {
                continue;
            }
            let Some(&other) = node_by_map.get(&n_map) else {
                continue;
            };
            if product.bond_between(product_node, other).is_none() {
                if let Some(e) = reactant.bond_between(t_idx, neighbor) {
                    product.add_bond(product_node, other, SmilesBond::from(reactant.bond(e)));
                }
            }
        }
    }

    if aromatizes {
        let mut origin = source_of.clone();
        origin.extend(carried.iter().map(|(&src, &node)| (node, src)));
        dearomatize_copied_bonds(&mut product, &origin, &fixed_order, reactants);
    }

    for &node in &node_of {
        if explicit_h.contains(&node) {
            continue;
        }
        let source = source_of.get(&node).copied();
        let h = if aromatizes && touches_aromatic(&product, node) {
            aromatic_hydrogens(&product, node, source, reactants)
        } else {
            product_hydrogens(&product, node, source, reactants)?
        };
        product.atom_mut(node).hydrogen_count = h;
    }

    let mut mol = kekulize(&product)?;
    aromaticity::perceive(&mut mol);
    Ok(mol)
}

/// Copy the reactant atoms reachable from `start` without crossing a
/// matched atom, bonding the first one to the product anchor.
fn carry_substituent(
    product: &mut Mol<Atom, SmilesBond>,
    reactant: &Mol<Atom, Bond>,
    matched: &HashSet<NodeIndex>,
    (ri, anchor, product_anchor): (usize, NodeIndex, NodeIndex),
    start: NodeIndex,
    carried: &mut HashMap<(usize, NodeIndex), NodeIndex>,
) {
    let mut queue = VecDeque::new();
    let start_node = copy_atom(product, reactant, ri, start, carried, &mut queue);
    link(product, reactant, (anchor, product_anchor), (start, start_node));

    while let Some((r_node, p_node)) = queue.pop_front() {
        for nb in reactant.neighbors(r_node) {
            if matched.contains(&nb) {
                continue;
            }
            let nb_node = copy_atom(product, reactant, ri, nb, carried, &mut queue);
            link(product, reactant, (r_node, p_node), (nb, nb_node));
        }
    }
}

fn copy_atom(
    product: &mut Mol<Atom, SmilesBond>,
    reactant: &Mol<Atom, Bond>,
    ri: usize,
    node: NodeIndex,
    carried: &mut HashMap<(usize, NodeIndex), NodeIndex>,
    queue: &mut VecDeque<(NodeIndex, NodeIndex)>,
) -> NodeIndex {
    if let Some(&existing) = carried.get(&(ri, node)) {
        return existing;
    }
    let mut atom = reactant.atom(node).clone();
    atom.map_num = 0;
    atom.no_implicit = true;
    let new_node = product.add_atom(atom);
    carried.insert((ri, node), new_node);
    queue.push_back((node, new_node));
    new_node
}

fn link(
    product: &mut Mol<Atom, SmilesBond>,
    reactant: &Mol<Atom, Bond>,
    (r_a, p_a): (NodeIndex, NodeIndex),
    (r_b, p_b): (NodeIndex, NodeIndex),
) {
    if product.bond_between(p_a, p_b).is_some() {
        return;
    }
    if let Some(edge) = reactant.bond_between(r_a, r_b) {
        product.add_bond(p_a, p_b, SmilesBond::from(reactant.bond(edge)));
    }
}

/// Write the simple primitives of a product template atom into `atom`.
/// Returns whether the template fixed the hydrogen count.
fn apply_template(atom: &mut Atom, expr: &AtomExpr) -> bool {
    let mut h_given = false;
    for part in expr.conjuncts() {
        match part {
            AtomExpr::Element { atomic_num, .. } => atom.atomic_num = *atomic_num,
            AtomExpr::Charge(c) => atom.formal_charge = *c,
            AtomExpr::Isotope(i) => atom.isotope = *i,
            AtomExpr::TotalHCount(h) => {
                atom.hydrogen_count = *h;
                h_given = true;
            }
            _ => {}
        }
    }
    h_given
}

/// Whether a template atom is written aromatic (`c`, `[n:2]`, `[#6;a]`).
fn written_aromatic(expr: &AtomExpr) -> bool {
    expr.conjuncts().into_iter().any(|part| {
        matches!(
            part,
            AtomExpr::Aromatic
                | AtomExpr::Element {
                    aromatic: Some(true),
                    ..
                }
        )
    })
}

/// Turn the Kekulé copies of aromatic reactant bonds back into aromatic
/// bonds, leaving the ones the template wrote explicitly.
fn dearomatize_copied_bonds(
    product: &mut Mol<Atom, SmilesBond>,
    origin: &HashMap<NodeIndex, (usize, NodeIndex)>,
    fixed_order: &HashSet<EdgeIndex>,
    reactants: &[&Mol<Atom, Bond>],
) {
    let edges: Vec<EdgeIndex> = product.bonds().collect();
    for edge in edges {
        if fixed_order.contains(&edge) {
            continue;
        }
        let Some((a, b)) = product.bond_endpoints(edge) else {
            continue;
        };
        let (Some(&(ra, ta)), Some(&(rb, tb))) = (origin.get(&a), origin.get(&b)) else {
            continue;
        };
        let was_aromatic = ra == rb
            && reactants[ra]
                .bond_between(ta, tb)
                .is_some_and(|e| reactants[ra].bond(e).is_aromatic);
        if was_aromatic {
            product.bond_mut(edge).order = SmilesBondOrder::Aromatic;
        }
    }
}

fn touches_aromatic(product: &Mol<Atom, SmilesBond>, node: NodeIndex) -> bool {
    product
        .bonds_of(node)
        .any(|e| product.bond(e).order == SmilesBondOrder::Aromatic)
}

/// Hydrogens on a product atom inside a ring the template aromatizes.
///
/// An atom that was already aromatic keeps its valence counted with
/// aromatic bonds as one, so `[nH]` stays `[nH]`. Anything else gets the
/// default aromatic hydrogen count for its new bonds.
fn aromatic_hydrogens(
    product: &Mol<Atom, SmilesBond>,
    node: NodeIndex,
    source: Option<(usize, NodeIndex)>,
    reactants: &[&Mol<Atom, Bond>],
) -> u8 {
    let atom = product.atom(node);
    let new_sum = bond_order_sum(product, node);

    if let Some((ri, t)) = source {
        let old = reactants[ri].atom(t);
        if old.is_aromatic
            && old.atomic_num == atom.atomic_num
            && old.formal_charge == atom.formal_charge
        {
            let old_sum: i16 = reactants[ri]
                .bonds_of(t)
                .map(|e| {
                    let bond = reactants[ri].bond(e);
                    if bond.is_aromatic {
                        1
                    } else {
                        bond.order.valence() as i16
                    }
                })
                .sum();
            let kept = old.hydrogen_count as i16 + old_sum - new_sum as i16;
            if kept >= 0 {
                return kept as u8;
            }
        }
    }
    implicit_hydrogens(atom.atomic_num, atom.formal_charge, new_sum, true)
}

/// Hydrogens on a product template atom.
///
/// A mapped atom whose element and charge are unchanged keeps its total
/// valence: hydrogens absorb the change in bond order sum. Everything else
/// gets the default for its new environment.
fn product_hydrogens(
    product: &Mol<Atom, SmilesBond>,
    node: NodeIndex,
    source: Option<(usize, NodeIndex)>,
    reactants: &[&Mol<Atom, Bond>],
) -> Result<u8, ReactionError> {
    let atom = product.atom(node);
    let new_sum = bond_order_sum(product, node);

    if let Some((ri, t)) = source {
        let old = reactants[ri].atom(t);
        if old.atomic_num == atom.atomic_num && old.formal_charge == atom.formal_charge {
            let old_sum: i16 = reactants[ri]
                .bonds_of(t)
                .map(|e| reactants[ri].bond(e).order.valence() as i16)
                .sum();
            let kept = old.hydrogen_count as i16 + old_sum - new_sum as i16;
            if kept >= 0 {
                return Ok(kept as u8);
            }
        }
    }

    let aromatic = product
        .bonds_of(node)
        .any(|e| product.bond(e).order == SmilesBondOrder::Aromatic);
    let valences = if atom.formal_charge == 0 {
        Element::from_atomic_num(atom.atomic_num)
            .map(|e| e.default_valences().to_vec())
            .unwrap_or_default()
    } else {
        charged_valences(atom.atomic_num, atom.formal_charge)
    };
    if !valences.is_empty() && valences.iter().all(|&v| v < new_sum) {
        return Err(ReactionError::Valence {
            atomic_num: atom.atomic_num,
            bond_sum: new_sum,
        });
    }
    Ok(implicit_hydrogens(
        atom.atomic_num,
        atom.formal_charge,
        new_sum,
        aromatic,
    ))
}

/// Every combination of one item per set, in order, stopping at `max`.
fn cartesian_product<'a, T>(sets: &'a [Vec<T>], max: usize) -> Vec<Vec<&'a T>> {
    let mut result: Vec<Vec<&'a T>> = vec![vec![]];
    for set in sets {
        let mut new_result = Vec::new();
        'outer: for combo in &result {
            for item in set {
                if new_result.len() == max {
                    tracing::warn!(max, "match combinations truncated");
                    break 'outer;
                }
                let mut new_combo = combo.clone();
                new_combo.push(item);
                new_result.push(new_combo);
            }
        }
        result = new_result;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartesian_product_sizes() {
        let sets = vec![vec![1, 2], vec![3, 4, 5]];
        let combos = cartesian_product(&sets, 100);
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0], vec![&1, &3]);
        assert_eq!(combos[5], vec![&2, &5]);
    }

    #[test]
    fn cartesian_product_truncates_at_limit() {
        let sets = vec![vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10], vec![0; 10]];
        let combos = cartesian_product(&sets, 50);
        assert_eq!(combos.len(), 50);
        assert_eq!(combos[0], vec![&1, &0]);
        assert_eq!(combos[49], vec![&5, &0]);
        assert_eq!(cartesian_product(&sets, 100).len(), 100);
    }

    #[test]
    fn template_primitives_override_atom() {
        let mut atom = Atom {
            atomic_num: 8,
            hydrogen_count: 1,
            ..Atom::default()
        };
        let expr = AtomExpr::And(vec![
            AtomExpr::Element {
                atomic_num: 8,
                aromatic: None,
            },
            AtomExpr::Charge(-1),
        ]);
        assert!(!apply_template(&mut atom, &expr));
        assert_eq!(atom.formal_charge, -1);
        assert!(apply_template(&mut atom, &AtomExpr::TotalHCount(0)));
        assert_eq!(atom.hydrogen_count, 0);
    }

    #[test]
    fn duplicate_maps_rejected() {
        let rxn = super::super::from_reaction_smarts("[C:1].[O:1]>>[C:1]").unwrap();
        assert_eq!(check_unique_maps(&rxn.reactant_templates), Err(ReactionError::DuplicateAtomMap { map_num: 1 }));
    }
}
