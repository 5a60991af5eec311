use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::canonical::canonical_ordering;
use crate::element::Element;
use crate::mol::Mol;
use crate::smiles::builder::implicit_hydrogens;

/// Write fragments in input atom order.
pub fn to_smiles(mol: &Mol<Atom, Bond>) -> String {
    let ranks: Vec<usize> = (0..mol.atom_count()).collect();
    write_components(
        mol,
        &ranks,
        &|node| atom_text(mol, node),
        &|edge| bond_text(mol, edge),
    )
    .join(".")
}

/// Canonical SMILES: one string per fragment, written from canonical
/// ranks, then sorted and joined with `.`.
pub fn to_canonical_smiles(mol: &Mol<Atom, Bond>) -> String {
    let ranks = canonical_ordering(mol);
    let mut parts = write_components(
        mol,
        &ranks,
        &|node| atom_text(mol, node),
        &|edge| bond_text(mol, edge),
    );
    parts.sort();
    parts.join(".")
}

/// Depth-first layout shared by the SMILES and SMARTS writers.
///
/// Each fragment starts at its lowest-ranked atom and visits neighbours in
/// rank order. Ring-closure digits are reused once closed.
pub(crate) fn write_components<A, B>(
    mol: &Mol<A, B>,
    ranks: &[usize],
    atom_text: &dyn Fn(NodeIndex) -> String,
    bond_text: &dyn Fn(EdgeIndex) -> String,
) -> Vec<String> {
    let layout = Layout::build(mol, ranks);
    let mut parts = Vec::with_capacity(layout.roots.len());
    for &root in &layout.roots {
        let mut writer = FragmentWriter {
            layout: &layout,
            atom_text,
            bond_text,
            open_digits: HashMap::new(),
            in_use: Vec::new(),
            out: String::new(),
        };
        writer.write_node(root);
        parts.push(writer.out);
    }
    parts
}

struct Layout {
    roots: Vec<NodeIndex>,
    children: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    ring_opens: Vec<Vec<EdgeIndex>>,
    ring_closes: Vec<Vec<EdgeIndex>>,
}

impl Layout {
    fn build<A, B>(mol: &Mol<A, B>, ranks: &[usize]) -> Self {
        let n = mol.atom_count();
        let mut visited = vec![false; n];
        let mut on_path = vec![false; n];
        let mut children = vec![Vec::new(); n];
        let mut ring_opens = vec![Vec::new(); n];
        let mut ring_closes = vec![Vec::new(); n];
        let mut tree_edge = vec![None::<EdgeIndex>; n];
        let mut roots = Vec::new();

        let sorted_neighbors: Vec<Vec<(NodeIndex, EdgeIndex)>> = mol
            .atoms()
            .map(|node| {
                let mut nbs: Vec<(NodeIndex, EdgeIndex)> = mol
                    .bonds_of(node)
                    .filter_map(|e| {
                        let (a, b) = mol.bond_endpoints(e)?;
                        Some((if a == node { b } else { a }, e))
                    })
                    .collect();
                nbs.sort_by_key(|(nb, _)| ranks[nb.index()]);
                nbs
            })
            .collect();

        let mut by_rank: Vec<NodeIndex> = mol.atoms().collect();
        by_rank.sort_by_key(|node| ranks[node.index()]);

        for start in by_rank {
            if visited[start.index()] {
                continue;
            }
            roots.push(start);
            visited[start.index()] = true;
            on_path[start.index()] = true;
            let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];

            while let Some(&mut (node, ref mut next)) = stack.last_mut() {
                let nbs = &sorted_neighbors[node.index()];
                if *next >= nbs.len() {
                    on_path[node.index()] = false;
                    stack.pop();
                    continue;
                }
                let (nb, edge) = nbs[*next];
                *next += 1;

                if !visited[nb.index()] {
                    visited[nb.index()] = true;
                    on_path[nb.index()] = true;
                    tree_edge[nb.index()] = Some(edge);
                    children[node.index()].push((nb, edge));
                    stack.push((nb, 0));
                } else if on_path[nb.index()] && tree_edge[node.index()] != Some(edge) {
                    ring_opens[nb.index()].push(edge);
                    ring_closes[node.index()].push(edge);
                }
            }
        }

        Self {
            roots,
            children,
            ring_opens,
            ring_closes,
        }
    }
}

struct FragmentWriter<'a> {
    layout: &'a Layout,
    atom_text: &'a dyn Fn(NodeIndex) -> String,
    bond_text: &'a dyn Fn(EdgeIndex) -> String,
    open_digits: HashMap<EdgeIndex, usize>,
    in_use: Vec<bool>,
    out: String,
}

impl FragmentWriter<'_> {
    fn write_node(&mut self, node: NodeIndex) {
        self.out.push_str(&(self.atom_text)(node));

        let mut freed = Vec::new();
        for &edge in &self.layout.ring_closes[node.index()] {
            if let Some(digit) = self.open_digits.remove(&edge) {
                push_ring_digit(digit, &mut self.out);
                freed.push(digit);
            }
        }
        for &edge in &self.layout.ring_opens[node.index()] {
            let digit = self.allocate_digit();
            self.out.push_str(&(self.bond_text)(edge));
            push_ring_digit(digit, &mut self.out);
            self.open_digits.insert(edge, digit);
        }
        for digit in freed {
            self.in_use[digit] = false;
        }

        let kids = &self.layout.children[node.index()];
        let Some(last) = kids.len().checked_sub(1) else {
            return;
        };
        for (i, &(child, edge)) in kids.iter().enumerate() {
            let is_branch = i < last;
            if is_branch {
                self.out.push('(');
            }
            self.out.push_str(&(self.bond_text)(edge));
            self.write_node(child);
            if is_branch {
                self.out.push(')');
            }
        }
    }

    fn allocate_digit(&mut self) -> usize {
        let digit = (1..)
            .find(|&d| !self.in_use.get(d).copied().unwrap_or(false))
            .unwrap_or(1);
        if self.in_use.len() <= digit {
            self.in_use.resize(digit + 1, false);
        }
        self.in_use[digit] = true;
        digit
    }
}

fn push_ring_digit(digit: usize, out: &mut String) {
    if digit <= 9 {
        out.push_str(&digit.to_string());
    } else {
        out.push('%');
        out.push_str(&digit.to_string());
    }
}

fn written_bond_sum(mol: &Mol<Atom, Bond>, node: NodeIndex) -> u8 {
    mol.bonds_of(node)
        .map(|e| {
            let bond = mol.bond(e);
            if bond.is_aromatic {
                1
            } else {
                bond.order.valence()
            }
        })
        .fold(0u8, u8::saturating_add)
}

fn atom_text(mol: &Mol<Atom, Bond>, node: NodeIndex) -> String {
    let atom = mol.atom(node);
    let elem = Element::from_atomic_num(atom.atomic_num);
    let symbol = match elem {
        Some(e) if atom.is_aromatic => e.symbol().to_ascii_lowercase(),
        Some(e) => e.symbol().to_string(),
        None => "*".to_string(),
    };

    if can_write_bare(mol, node, elem) {
        return symbol;
    }

    let mut out = String::from("[");
    if atom.isotope > 0 {
        out.push_str(&atom.isotope.to_string());
    }
    out.push_str(&symbol);
    match atom.hydrogen_count {
        0 => {}
        1 => out.push('H'),
        h => {
            out.push('H');
            out.push_str(&h.to_string());
        }
    }
    match atom.formal_charge {
        0 => {}
        1 => out.push('+'),
        -1 => out.push('-'),
        q if q > 0 => out.push_str(&format!("+{q}")),
        q => out.push_str(&format!("-{}", -(q as i16))),
    }
    if atom.map_num > 0 {
        out.push(':');
        out.push_str(&atom.map_num.to_string());
    }
    out.push(']');
    out
}

fn can_write_bare(mol: &Mol<Atom, Bond>, node: NodeIndex, elem: Option<Element>) -> bool {
    let atom = mol.atom(node);
    if atom.formal_charge != 0 || atom.isotope != 0 || atom.map_num != 0 {
        return false;
    }
    let Some(elem) = elem else {
        return atom.hydrogen_count == 0;
    };
    if !elem.is_organic_subset() {
        return false;
    }
    if atom.is_aromatic && !matches!(elem, Element::B | Element::C | Element::N | Element::O | Element::P | Element::S) {
        return false;
    }
    let implied = implicit_hydrogens(
        atom.atomic_num,
        0,
        written_bond_sum(mol, node),
        atom.is_aromatic,
    );
    implied == atom.hydrogen_count
}

fn bond_text(mol: &Mol<Atom, Bond>, edge: EdgeIndex) -> String {
    let bond = mol.bond(edge);
    if bond.is_aromatic {
        return String::new();
    }
    let both_aromatic = mol
        .bond_endpoints(edge)
        .is_some_and(|(a, b)| mol.atom(a).is_aromatic && mol.atom(b).is_aromatic);
    match bond.order {
        BondOrder::Single if both_aromatic => "-".to_string(),
        BondOrder::Single => String::new(),
        BondOrder::Double => "=".to_string(),
        BondOrder::Triple => "#".to_string(),
    }
}
