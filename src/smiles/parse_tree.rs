use crate::smiles::error::SmilesError;
use crate::smiles::tokenizer::{AtomToken, BondToken, Token};

#[derive(Debug, Clone)]
pub struct ParseAtom {
    pub token: AtomToken,
    pub neighbors: Vec<Neighbor>,
}

#[derive(Debug, Clone)]
pub struct Neighbor {
    pub bond: Option<BondToken>,
    pub atom_idx: usize,
}

#[derive(Debug, Clone)]
pub struct ParseTree {
    pub atoms: Vec<ParseAtom>,
}

pub fn build_parse_tree(tokens: &[Token]) -> Result<ParseTree, SmilesError> {
    let mut atoms: Vec<ParseAtom> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending_bond: Option<(BondToken, usize)> = None;
    let mut ring_opens: Vec<Option<(usize, Option<BondToken>)>> = vec![None; 100];

    for (tok_idx, token) in tokens.iter().enumerate() {
        match token {
            Token::Atom(atom_tok) => {
                let idx = atoms.len();
                atoms.push(ParseAtom {
                    token: atom_tok.clone(),
                    neighbors: Vec::new(),
                });

                let bond = pending_bond.take().map(|(b, _)| b);
                if let Some(cur) = current {
                    connect(&mut atoms, cur, idx, bond);
                }
                current = Some(idx);
            }
            Token::Bond(b) => {
                if current.is_none() {
                    return Err(SmilesError::DanglingBond { pos: tok_idx });
                }
                pending_bond = Some((*b, tok_idx));
            }
            Token::RingClosure { bond, digit, pos } => {
                let d = *digit as usize;
                let cur = current.ok_or(SmilesError::UnexpectedChar {
                    pos: *pos,
                    ch: '%',
                })?;
                let this_bond = bond.or(pending_bond.take().map(|(b, _)| b));

                if let Some((open_idx, open_bond)) = ring_opens[d].take() {
                    let ring_bond = match (this_bond, open_bond) {
                        (Some(b1), Some(b2)) if b1 != b2 => {
                            return Err(SmilesError::RingBondConflict { digit: *digit });
                        }
                        (b1, b2) => b1.or(b2),
                    };
                    connect(&mut atoms, open_idx, cur, ring_bond);
                } else {
                    ring_opens[d] = Some((cur, this_bond));
                }
            }
            Token::OpenParen(pos) => {
                let cur = current.ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                stack.push((cur, *pos));
            }
            Token::CloseParen(pos) => {
                let (restored, _) = stack
                    .pop()
                    .ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                current = Some(restored);
                pending_bond = None;
            }
            Token::Dot(_) => {
                current = None;
                pending_bond = None;
            }
        }
    }

    if let Some((_, pos)) = stack.first() {
        return Err(SmilesError::UnmatchedParen { pos: *pos });
    }
    if let Some((_, pos)) = pending_bond {
        return Err(SmilesError::DanglingBond { pos });
    }
    if let Some(digit) = ring_opens.iter().position(Option::is_some) {
        return Err(SmilesError::UnclosedRing {
            digit: digit as u16,
        });
    }

    Ok(ParseTree { atoms })
}

fn connect(atoms: &mut [ParseAtom], a: usize, b: usize, bond: Option<BondToken>) {
    atoms[a].neighbors.push(Neighbor { bond, atom_idx: b });
    atoms[b].neighbors.push(Neighbor { bond, atom_idx: a });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::tokenizer::tokenize;

    fn tree(s: &str) -> Result<ParseTree, SmilesError> {
        build_parse_tree(&tokenize(s).unwrap())
    }

    #[test]
    fn ethane_tree() {
        let tree = tree("CC").unwrap();
        assert_eq!(tree.atoms.len(), 2);
        assert_eq!(tree.atoms[0].neighbors.len(), 1);
        assert_eq!(tree.atoms[0].neighbors[0].atom_idx, 1);
    }

    #[test]
    fn cyclohexane_tree() {
        let tree = tree("C1CCCCC1").unwrap();
        assert_eq!(tree.atoms.len(), 6);
        for atom in &tree.atoms {
            assert_eq!(atom.neighbors.len(), 2);
        }
    }

    #[test]
    fn branch_tree() {
        let tree = tree("CC(C)C").unwrap();
        assert_eq!(tree.atoms.len(), 4);
        assert_eq!(tree.atoms[1].neighbors.len(), 3);
    }

    #[test]
    fn ring_bond_taken_from_either_end() {
        let tree = tree("C=1CCCCC1").unwrap();
        let closure = tree.atoms[5]
            .neighbors
            .iter()
            .find(|n| n.atom_idx == 0)
            .unwrap();
        assert_eq!(closure.bond, Some(BondToken::Double));
    }

    #[test]
    fn conflicting_ring_bonds() {
        assert!(matches!(
            tree("C=1CCCCC#1"),
            Err(SmilesError::RingBondConflict { digit: 1 })
        ));
    }

    #[test]
    fn unclosed_ring_error() {
        assert!(matches!(tree("C1CC"), Err(SmilesError::UnclosedRing { digit: 1 })));
    }

    #[test]
    fn unmatched_paren_error() {
        assert!(tree("C(C").is_err());
        assert!(tree("CC)C").is_err());
    }

    #[test]
    fn trailing_bond_error() {
        assert!(tree("CC=").is_err());
    }

    #[test]
    fn disconnected() {
        let tree = tree("[Na+].[Cl-]").unwrap();
        assert_eq!(tree.atoms.len(), 2);
        assert!(tree.atoms[0].neighbors.is_empty());
        assert!(tree.atoms[1].neighbors.is_empty());
    }
}
