use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::element::Element;
use crate::smiles::write_components;

use super::query::{AtomExpr, BondExpr, QueryMol};

/// Write a query back to SMARTS in input atom order.
pub fn to_smarts(mol: &QueryMol) -> String {
    let ranks: Vec<usize> = (0..mol.atom_count()).collect();
    write_components(
        mol,
        &ranks,
        &|node| atom_text(mol, node),
        &|edge| bond_text(mol, edge),
    )
    .join(".")
}

fn atom_text(mol: &QueryMol, node: NodeIndex) -> String {
    let atom = mol.atom(node);
    if atom.map_num == 0 {
        if let Some(bare) = bare_atom(&atom.expr) {
            return bare;
        }
    }
    bracket_atom(&atom.expr, (atom.map_num > 0).then_some(atom.map_num))
}

fn bond_text(mol: &QueryMol, edge: EdgeIndex) -> String {
    match mol.bond(edge) {
        BondExpr::SingleOrAromatic => String::new(),
        other => bond_expr_text(other),
    }
}

/// `[expr]` or `[expr:map]`.
pub(crate) fn bracket_atom(expr: &AtomExpr, map_num: Option<u16>) -> String {
    let mut out = String::from("[");
    write_expr(expr, Level::Low, &mut out);
    if let Some(map) = map_num {
        out.push(':');
        out.push_str(&map.to_string());
    }
    out.push(']');
    out
}

/// Expression text without brackets or map class.
pub fn atom_expr_text(expr: &AtomExpr) -> String {
    let mut out = String::new();
    write_expr(expr, Level::Low, &mut out);
    out
}

pub fn bond_expr_text(expr: &BondExpr) -> String {
    let mut out = String::new();
    write_bond(expr, Level::Low, &mut out);
    out
}

fn bare_atom(expr: &AtomExpr) -> Option<String> {
    match expr {
        AtomExpr::True => Some("*".into()),
        AtomExpr::Aromatic => Some("a".into()),
        AtomExpr::Aliphatic => Some("A".into()),
        AtomExpr::Element {
            atomic_num,
            aromatic: Some(aromatic),
        } => {
            let elem = Element::from_atomic_num(*atomic_num)?;
            if *aromatic && matches!(atomic_num, 5 | 6 | 7 | 8 | 15 | 16) {
                Some(elem.symbol().to_ascii_lowercase())
            } else if !*aromatic && elem.is_organic_subset() {
                Some(elem.symbol().to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Operator context, loosest first: `;`, `,`, `&`, `!`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Low,
    Or,
    High,
    Not,
}

fn write_expr(expr: &AtomExpr, level: Level, out: &mut String) {
    match expr {
        AtomExpr::And(parts) => {
            let needs_low = parts.iter().any(|p| matches!(p, AtomExpr::Or(_)));
            let (sep, inner) = if needs_low && level == Level::Low {
                (';', Level::Or)
            } else {
                ('&', Level::High)
            };
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    out.push(sep);
                }
                write_expr(p, inner, out);
            }
        }
        AtomExpr::Or(parts) => {
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_expr(p, Level::Or.max(level), out);
            }
        }
        AtomExpr::Not(inner) => match inner.as_ref() {
            AtomExpr::And(parts) => {
                let negated = parts.iter().map(|p| AtomExpr::Not(Box::new(p.clone()))).collect();
                write_expr(&AtomExpr::Or(negated), level, out);
            }
            AtomExpr::Or(parts) => {
                let negated = parts.iter().map(|p| AtomExpr::Not(Box::new(p.clone()))).collect();
                write_expr(&AtomExpr::And(negated), level, out);
            }
            AtomExpr::Not(twice) => write_expr(twice, level, out),
            primitive => {
                out.push('!');
                write_primitive(primitive, out);
            }
        },
        primitive => write_primitive(primitive, out),
    }
}

fn write_primitive(expr: &AtomExpr, out: &mut String) {
    match expr {
        AtomExpr::True => out.push('*'),
        AtomExpr::Element {
            atomic_num,
            aromatic,
        } => match (aromatic, Element::from_atomic_num(*atomic_num)) {
            (Some(true), Some(elem)) => out.push_str(&elem.symbol().to_ascii_lowercase()),
            (Some(false), Some(elem)) if *atomic_num != 1 => out.push_str(elem.symbol()),
            _ => {
                out.push('#');
                out.push_str(&atomic_num.to_string());
            }
        },
        AtomExpr::Aromatic => out.push('a'),
        AtomExpr::Aliphatic => out.push('A'),
        AtomExpr::Isotope(iso) => out.push_str(&iso.to_string()),
        AtomExpr::Degree(d) => push_counted('D', *d, out),
        AtomExpr::Valence(v) => push_counted('v', *v, out),
        AtomExpr::Connectivity(x) => push_counted('X', *x, out),
        AtomExpr::TotalHCount(h) => push_counted('H', *h, out),
        AtomExpr::ImplicitHCount(h) => push_counted('h', *h, out),
        AtomExpr::RingMembership(r) => push_counted('R', *r, out),
        AtomExpr::SmallestRingSize(r) => push_counted('r', *r, out),
        AtomExpr::RingBondCount(x) => push_counted('x', *x, out),
        AtomExpr::Charge(c) => match *c {
            1 => out.push('+'),
            -1 => out.push('-'),
            c if c < 0 => {
                out.push('-');
                out.push_str(&c.unsigned_abs().to_string());
            }
            c => {
                out.push('+');
                out.push_str(&c.to_string());
            }
        },
        AtomExpr::InRing => out.push('R'),
        AtomExpr::NotInRing => out.push_str("R0"),
        AtomExpr::Recursive(inner) => {
            out.push_str("$(");
            out.push_str(&to_smarts(inner));
            out.push(')');
        }
        AtomExpr::And(_) | AtomExpr::Or(_) | AtomExpr::Not(_) => write_expr(expr, Level::Not, out),
    }
}

fn push_counted(symbol: char, n: u8, out: &mut String) {
    out.push(symbol);
    out.push_str(&n.to_string());
}

fn write_bond(expr: &BondExpr, level: Level, out: &mut String) {
    match expr {
        BondExpr::True => out.push('~'),
        BondExpr::Single => out.push('-'),
        BondExpr::Double => out.push('='),
        BondExpr::Triple => out.push('#'),
        BondExpr::Aromatic => out.push(':'),
        BondExpr::Ring => out.push('@'),
        BondExpr::SingleOrAromatic => {
            write_bond(&BondExpr::Or(vec![BondExpr::Single, BondExpr::Aromatic]), level, out)
        }
        BondExpr::And(parts) => {
            let needs_low = parts.iter().any(|p| matches!(p, BondExpr::Or(_) | BondExpr::SingleOrAromatic));
            let (sep, inner) = if needs_low && level == Level::Low {
                (';', Level::Or)
            } else {
                ('&', Level::High)
            };
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    out.push(sep);
                }
                write_bond(p, inner, out);
            }
        }
        BondExpr::Or(parts) => {
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_bond(p, Level::Or.max(level), out);
            }
        }
        BondExpr::Not(inner) => match inner.as_ref() {
            BondExpr::And(parts) => {
                let negated = parts.iter().map(|p| BondExpr::Not(Box::new(p.clone()))).collect();
                write_bond(&BondExpr::Or(negated), level, out);
            }
            BondExpr::Or(parts) => {
                let negated = parts.iter().map(|p| BondExpr::Not(Box::new(p.clone()))).collect();
                write_bond(&BondExpr::And(negated), level, out);
            }
            BondExpr::SingleOrAromatic => write_bond(
                &BondExpr::And(vec![
                    BondExpr::Not(Box::new(BondExpr::Single)),
                    BondExpr::Not(Box::new(BondExpr::Aromatic)),
                ]),
                level,
                out,
            ),
            BondExpr::Not(twice) => write_bond(twice, level, out),
            primitive => {
                out.push('!');
                write_bond(primitive, Level::Not, out);
            }
        },
    }
}
