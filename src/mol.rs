use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// Molecular graph generic over atom and bond payloads.
///
/// Node and edge indices are stable as long as nothing is removed; removal
/// goes through [`Mol::induced`], which rebuilds the graph and reports the
/// index remapping.
pub struct Mol<A, B> {
    graph: UnGraph<A, B>,
}

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
        }
    }

    pub fn graph(&self) -> &UnGraph<A, B> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &A {
        &self.graph[idx]
    }

    pub fn atom_mut(&mut self, idx: NodeIndex) -> &mut A {
        &mut self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &B {
        &self.graph[idx]
    }

    pub fn bond_mut(&mut self, idx: EdgeIndex) -> &mut B {
        &mut self.graph[idx]
    }

    pub fn add_atom(&mut self, atom: A) -> NodeIndex {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: B) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges(idx).count()
    }

    pub fn bonds_of(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(idx).map(|e| e.id())
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// Convert atom payloads, keeping every index.
    pub fn map_atoms<A2>(&self, mut f: impl FnMut(NodeIndex, &A) -> A2) -> Mol<A2, B>
    where
        B: Clone,
    {
        Mol {
            graph: self
                .graph
                .map(|idx, atom| f(idx, atom), |_, bond| bond.clone()),
        }
    }

    /// Convert bond payloads, keeping every index.
    pub fn map_bonds<B2>(&self, mut f: impl FnMut(EdgeIndex, &B) -> B2) -> Mol<A, B2>
    where
        A: Clone,
    {
        Mol {
            graph: self
                .graph
                .map(|_, atom| atom.clone(), |idx, bond| f(idx, bond)),
        }
    }
}

impl<A: Clone, B: Clone> Mol<A, B> {
    /// Copy of the subgraph induced by the atoms for which `keep` is true.
    ///
    /// Kept atoms retain their relative order. The second value maps each
    /// old node index to its new index.
    pub fn induced(
        &self,
        mut keep: impl FnMut(NodeIndex) -> bool,
    ) -> (Mol<A, B>, Vec<Option<NodeIndex>>) {
        let mut out = Mol::new();
        let mut remap = vec![None; self.atom_count()];
        for idx in self.atoms() {
            if keep(idx) {
                remap[idx.index()] = Some(out.add_atom(self.atom(idx).clone()));
            }
        }
        for edge in self.bonds() {
            if let Some((a, b)) = self.bond_endpoints(edge) {
                if let (Some(na), Some(nb)) = (remap[a.index()], remap[b.index()]) {
                    out.add_bond(na, nb, self.bond(edge).clone());
                }
            }
        }
        (out, remap)
    }
}

/// Connected-component label per atom, numbered in order of each
/// component's lowest atom index.
pub fn component_labels<A, B>(mol: &Mol<A, B>) -> (Vec<usize>, usize) {
    let n = mol.atom_count();
    let mut labels = vec![usize::MAX; n];
    let mut count = 0;
    for start in mol.atoms() {
        if labels[start.index()] != usize::MAX {
            continue;
        }
        labels[start.index()] = count;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for nb in mol.neighbors(node) {
                if labels[nb.index()] == usize::MAX {
                    labels[nb.index()] = count;
                    stack.push(nb);
                }
            }
        }
        count += 1;
    }
    (labels, count)
}

/// Split a molecule into its disconnected fragments.
pub fn fragments<A: Clone, B: Clone>(mol: &Mol<A, B>) -> Vec<Mol<A, B>> {
    let (labels, count) = component_labels(mol);
    if count <= 1 {
        return vec![mol.clone()];
    }
    (0..count)
        .map(|c| mol.induced(|idx| labels[idx.index()] == c).0)
        .collect()
}

impl<A: Clone, B: Clone> Clone for Mol<A, B> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
        }
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        if self.atom_count() != other.atom_count() || self.bond_count() != other.bond_count() {
            return false;
        }
        if self.atoms().any(|idx| self.atom(idx) != other.atom(idx)) {
            return false;
        }
        self.bonds().all(|idx| {
            self.bond(idx) == other.bond(idx)
                && self.bond_endpoints(idx) == other.bond_endpoints(idx)
        })
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .finish()
    }
}
