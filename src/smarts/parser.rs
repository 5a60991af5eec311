use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::element::Element;

use super::error::SmartsError;
use super::query::{AtomExpr, BondExpr, QueryAtom, QueryMol};

const AROMATIC_SYMBOLS: [(&str, u8); 9] = [
    ("se", 34),
    ("as", 33),
    ("te", 52),
    ("b", 5),
    ("c", 6),
    ("n", 7),
    ("o", 8),
    ("p", 15),
    ("s", 16),
];

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            input,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut val: u32 = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            val = val.saturating_mul(10).saturating_add(d);
            self.pos += 1;
        }
        (self.pos > start).then_some(val)
    }

    fn count(&mut self) -> u8 {
        self.parse_number().map_or(1, |n| n.min(u8::MAX as u32) as u8)
    }

    fn parse_smarts(&mut self) -> Result<QueryMol, SmartsError> {
        let mut mol = QueryMol::new();
        let mut stack: Vec<(NodeIndex, usize)> = Vec::new();
        let mut current: Option<NodeIndex> = None;
        let mut pending_bond: Option<BondExpr> = None;
        let mut ring_map: HashMap<u16, (NodeIndex, Option<BondExpr>)> = HashMap::new();

        while let Some(ch) = self.peek() {
            match ch {
                '(' => {
                    let cur = current.ok_or(SmartsError::UnmatchedParen { pos: self.pos })?;
                    stack.push((cur, self.pos));
                    self.pos += 1;
                }
                ')' => {
                    let (prev, _) = stack
                        .pop()
                        .ok_or(SmartsError::UnmatchedParen { pos: self.pos })?;
                    current = Some(prev);
                    pending_bond = None;
                    self.pos += 1;
                }
                '.' => {
                    current = None;
                    pending_bond = None;
                    self.pos += 1;
                }
                '-' | '=' | '#' | '~' | ':' | '/' | '\\' | '@' | '!' => {
                    if pending_bond.is_some() {
                        return Err(SmartsError::InvalidSmarts {
                            pos: self.pos,
                            msg: "consecutive bond expressions".into(),
                        });
                    }
                    pending_bond = Some(self.parse_bond_expr()?);
                }
                '0'..='9' | '%' => {
                    let pos = self.pos;
                    let digit = self.parse_ring_closure()?;
                    let cur = current.ok_or(SmartsError::InvalidSmarts {
                        pos,
                        msg: "ring closure without preceding atom".into(),
                    })?;
                    let this_bond = pending_bond.take();
                    match ring_map.remove(&digit) {
                        Some((other, open_bond)) => {
                            let bond = this_bond.or(open_bond).unwrap_or(BondExpr::SingleOrAromatic);
                            mol.add_bond(other, cur, bond);
                        }
                        None => {
                            ring_map.insert(digit, (cur, this_bond));
                        }
                    }
                }
                _ => {
                    let atom = if ch == '[' {
                        self.parse_bracket_atom()?
                    } else {
                        QueryAtom::new(self.parse_bare_atom()?)
                    };
                    let idx = mol.add_atom(atom);
                    if let Some(prev) = current {
                        let bond = pending_bond.take().unwrap_or(BondExpr::SingleOrAromatic);
                        mol.add_bond(prev, idx, bond);
                    }
                    current = Some(idx);
                }
            }
        }

        if let Some(&(_, pos)) = stack.first() {
            return Err(SmartsError::UnmatchedParen { pos });
        }
        if pending_bond.is_some() {
            return Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: "bond without a following atom".into(),
            });
        }
        if let Some(&digit) = ring_map.keys().min() {
            return Err(SmartsError::UnclosedRing { digit });
        }

        Ok(mol)
    }

    fn parse_ring_closure(&mut self) -> Result<u16, SmartsError> {
        let start = self.pos;
        if self.peek() == Some('%') {
            self.pos += 1;
            match (
                self.peek().and_then(|c| c.to_digit(10)),
                self.peek_at(1).and_then(|c| c.to_digit(10)),
            ) {
                (Some(d1), Some(d2)) => {
                    self.pos += 2;
                    Ok((d1 * 10 + d2) as u16)
                }
                _ => Err(SmartsError::InvalidSmarts {
                    pos: start,
                    msg: "expected two digits after %".into(),
                }),
            }
        } else {
            let d = self.peek().and_then(|c| c.to_digit(10)).ok_or(SmartsError::UnexpectedChar {
                pos: start,
                ch: self.chars[start],
            })?;
            self.pos += 1;
            Ok(d as u16)
        }
    }

    // --- Bonds: `;` < `,` < `&`/implicit < `!` ---

    fn parse_bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = vec![self.parse_bond_or()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            parts.push(self.parse_bond_or()?);
        }
        Ok(flatten_bond_and(parts))
    }

    fn parse_bond_or(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = vec![self.parse_bond_and()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            parts.push(self.parse_bond_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            BondExpr::Or(parts)
        })
    }

    fn parse_bond_and(&mut self) -> Result<BondExpr, SmartsError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some('&') => self.pos += 1,
                Some('-' | '=' | '#' | '~' | ':' | '/' | '\\' | '@' | '!') => {
                    parts.push(self.parse_bond_not()?)
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            return Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: "expected bond primitive".into(),
            });
        }
        Ok(flatten_bond_and(parts))
    }

    fn parse_bond_not(&mut self) -> Result<BondExpr, SmartsError> {
        let Some(ch) = self.peek() else {
            return Err(SmartsError::InvalidSmarts {
                pos: self.pos,
                msg: "expected bond primitive".into(),
            });
        };
        self.pos += 1;
        match ch {
            '!' => Ok(BondExpr::Not(Box::new(self.parse_bond_not()?))),
            '-' | '/' | '\\' => Ok(BondExpr::Single),
            '=' => Ok(BondExpr::Double),
            '#' => Ok(BondExpr::Triple),
            '~' => Ok(BondExpr::True),
            ':' => Ok(BondExpr::Aromatic),
            '@' => Ok(BondExpr::Ring),
            _ => Err(SmartsError::UnexpectedChar {
                pos: self.pos - 1,
                ch,
            }),
        }
    }

    // --- Atoms ---

    fn parse_bare_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmartsError::EmptyInput);
        };
        match ch {
            '*' => {
                self.pos += 1;
                Ok(AtomExpr::True)
            }
            'a' if self.peek_at(1) != Some('s') => {
                self.pos += 1;
                Ok(AtomExpr::Aromatic)
            }
            'A' if !self.peek_at(1).is_some_and(|c| c.is_ascii_lowercase()) => {
                self.pos += 1;
                Ok(AtomExpr::Aliphatic)
            }
            _ => self
                .parse_element()
                .ok_or(SmartsError::UnexpectedChar { pos: start, ch }),
        }
    }

    /// Element symbol at the cursor: aromatic lowercase or a one/two letter
    /// uppercase symbol.
    fn parse_element(&mut self) -> Option<AtomExpr> {
        let ch = self.peek()?;
        if ch.is_ascii_lowercase() {
            for (sym, num) in AROMATIC_SYMBOLS {
                if self.matches_str(sym) {
                    self.pos += sym.len();
                    return Some(AtomExpr::Element {
                        atomic_num: num,
                        aromatic: Some(true),
                    });
                }
            }
            return None;
        }
        if !ch.is_ascii_uppercase() {
            return None;
        }
        if let Some(next) = self.peek_at(1).filter(|c| c.is_ascii_lowercase()) {
            if let Some(elem) = Element::from_symbol(&format!("{ch}{next}")) {
                self.pos += 2;
                return Some(AtomExpr::Element {
                    atomic_num: elem.atomic_num(),
                    aromatic: Some(false),
                });
            }
        }
        let elem = Element::from_symbol(&ch.to_string())?;
        self.pos += 1;
        Some(AtomExpr::Element {
            atomic_num: elem.atomic_num(),
            aromatic: Some(false),
        })
    }

    fn matches_str(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn parse_bracket_atom(&mut self) -> Result<QueryAtom, SmartsError> {
        let bracket_start = self.pos;
        self.pos += 1;

        let mut parts = vec![self.parse_semicolon_expr(bracket_start)?];
        let mut map_num = 0;
        if self.peek() == Some(':') {
            self.pos += 1;
            let n = self
                .parse_number()
                .ok_or(SmartsError::InvalidAtomMap { pos: self.pos })?;
            map_num = u16::try_from(n).map_err(|_| SmartsError::InvalidAtomMap { pos: self.pos })?;
            // Some drawing tools write further primitives after the map class.
            while matches!(self.peek(), Some(';' | '&')) {
                self.pos += 1;
                parts.push(self.parse_semicolon_expr(bracket_start)?);
            }
        }

        if self.peek() != Some(']') {
            return Err(SmartsError::UnclosedBracket { pos: bracket_start });
        }
        self.pos += 1;

        Ok(QueryAtom {
            expr: flatten_and(parts),
            map_num,
        })
    }

    fn parse_semicolon_expr(&mut self, bracket_start: usize) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_comma_expr(bracket_start)?];
        while self.peek() == Some(';') {
            self.pos += 1;
            parts.push(self.parse_comma_expr(bracket_start)?);
        }
        Ok(flatten_and(parts))
    }

    fn parse_comma_expr(&mut self, bracket_start: usize) -> Result<AtomExpr, SmartsError> {
        let mut parts = vec![self.parse_high_and_expr(bracket_start)?];
        while self.peek() == Some(',') {
            self.pos += 1;
            parts.push(self.parse_high_and_expr(bracket_start)?);
        }
        Ok(flatten_or(parts))
    }

    fn parse_high_and_expr(&mut self, bracket_start: usize) -> Result<AtomExpr, SmartsError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                None => return Err(SmartsError::UnclosedBracket { pos: bracket_start }),
                Some(']' | ',' | ';' | ':') => break,
                Some('&') => self.pos += 1,
                Some('@') => self.skip_chirality(),
                Some(_) => {
                    let first = self.pos == bracket_start + 1;
                    parts.push(self.parse_not_expr(first)?);
                }
            }
        }
        Ok(if parts.is_empty() {
            AtomExpr::True
        } else {
            flatten_and(parts)
        })
    }

    /// Chirality marks carry no meaning for matching here.
    fn skip_chirality(&mut self) {
        while self.peek() == Some('@') {
            self.pos += 1;
        }
        if matches!(
            (self.peek(), self.peek_at(1)),
            (Some('T'), Some('H')) | (Some('A'), Some('L')) | (Some('S'), Some('P'))
                | (Some('T'), Some('B')) | (Some('O'), Some('H'))
        ) {
            self.pos += 2;
            self.parse_number();
        }
        if self.peek() == Some('?') {
            self.pos += 1;
        }
    }

    fn parse_not_expr(&mut self, first_in_bracket: bool) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            let inner = self.parse_not_expr(false)?;
            Ok(AtomExpr::Not(Box::new(inner)))
        } else {
            self.parse_primitive(first_in_bracket)
        }
    }

    fn parse_primitive(&mut self, first_in_bracket: bool) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmartsError::InvalidSmarts {
                pos: start,
                msg: "expected atom primitive".into(),
            });
        };

        match ch {
            '*' => {
                self.pos += 1;
                Ok(AtomExpr::True)
            }
            'a' if self.peek_at(1) != Some('s') => {
                self.pos += 1;
                Ok(AtomExpr::Aromatic)
            }
            'A' if !self.peek_at(1).is_some_and(|c| matches!(c, 'c' | 'g' | 'l' | 'm' | 'r' | 's' | 't' | 'u')) => {
                self.pos += 1;
                Ok(AtomExpr::Aliphatic)
            }
            '#' => {
                self.pos += 1;
                let num = self
                    .parse_number()
                    .filter(|n| (1..=118).contains(n))
                    .ok_or(SmartsError::InvalidAtomicNum { pos: start })?;
                Ok(AtomExpr::Element {
                    atomic_num: num as u8,
                    aromatic: None,
                })
            }
            'D' if !self.peek_at(1).is_some_and(|c| matches!(c, 'b' | 's' | 'y')) => {
                self.pos += 1;
                Ok(AtomExpr::Degree(self.count()))
            }
            'X' if self.peek_at(1) != Some('e') => {
                self.pos += 1;
                Ok(AtomExpr::Connectivity(self.count()))
            }
            'v' => {
                self.pos += 1;
                Ok(AtomExpr::Valence(self.count()))
            }
            'H' if first_in_bracket && !self.peek_at(1).is_some_and(|c| c.is_ascii_digit() || c.is_ascii_lowercase()) => {
                self.pos += 1;
                Ok(AtomExpr::Element {
                    atomic_num: 1,
                    aromatic: None,
                })
            }
            'H' if !self.peek_at(1).is_some_and(|c| c.is_ascii_lowercase()) => {
                self.pos += 1;
                Ok(AtomExpr::TotalHCount(self.count()))
            }
            'h' => {
                self.pos += 1;
                Ok(AtomExpr::ImplicitHCount(self.count()))
            }
            'R' if !self.peek_at(1).is_some_and(|c| c.is_ascii_lowercase()) => {
                self.pos += 1;
                Ok(match self.parse_number() {
                    None => AtomExpr::InRing,
                    Some(0) => AtomExpr::NotInRing,
                    Some(n) => AtomExpr::RingMembership(n.min(255) as u8),
                })
            }
            'r' => {
                self.pos += 1;
                Ok(match self.parse_number() {
                    None => AtomExpr::InRing,
                    Some(0) => AtomExpr::NotInRing,
                    Some(n) => AtomExpr::SmallestRingSize(n.min(255) as u8),
                })
            }
            'x' => {
                self.pos += 1;
                Ok(AtomExpr::RingBondCount(self.count()))
            }
            '+' | '-' => self.parse_charge(ch),
            '$' => {
                self.pos += 1;
                if self.peek() != Some('(') {
                    return Err(SmartsError::UnclosedRecursive { pos: self.pos });
                }
                self.pos += 1;
                let inner = self.extract_balanced_parens()?;
                Ok(AtomExpr::Recursive(Box::new(parse(inner)?)))
            }
            '0'..='9' => {
                let n = self.parse_number().unwrap_or(0);
                let iso = u16::try_from(n).map_err(|_| SmartsError::InvalidSmarts {
                    pos: start,
                    msg: "isotope out of range".into(),
                })?;
                let element_follows = self.peek() == Some('H')
                    && !self.peek_at(1).is_some_and(|c| c.is_ascii_lowercase());
                if element_follows {
                    self.pos += 1;
                    return Ok(AtomExpr::And(vec![
                        AtomExpr::Isotope(iso),
                        AtomExpr::Element {
                            atomic_num: 1,
                            aromatic: None,
                        },
                    ]));
                }
                Ok(AtomExpr::Isotope(iso))
            }
            _ => self
                .parse_element()
                .ok_or(SmartsError::UnexpectedChar { pos: start, ch }),
        }
    }

    fn parse_charge(&mut self, sign_char: char) -> Result<AtomExpr, SmartsError> {
        let start = self.pos;
        let sign: i16 = if sign_char == '+' { 1 } else { -1 };
        self.pos += 1;
        let magnitude = match self.parse_number() {
            Some(n) => n as i16,
            None => {
                let mut n = 1;
                while self.peek() == Some(sign_char) {
                    n += 1;
                    self.pos += 1;
                }
                n
            }
        };
        let charge = i8::try_from(sign * magnitude).map_err(|_| SmartsError::InvalidSmarts {
            pos: start,
            msg: "charge out of range".into(),
        })?;
        Ok(AtomExpr::Charge(charge))
    }

    fn extract_balanced_parens(&mut self) -> Result<&'a str, SmartsError> {
        let start_pos = self.pos;
        let begin_byte: usize = self.chars[..start_pos].iter().map(|c| c.len_utf8()).sum();
        let mut depth = 1;

        while let Some(ch) = self.peek() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let len: usize = self.chars[start_pos..self.pos]
                            .iter()
                            .map(|c| c.len_utf8())
                            .sum();
                        self.pos += 1;
                        return Ok(&self.input[begin_byte..begin_byte + len]);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }

        Err(SmartsError::UnclosedRecursive { pos: start_pos })
    }
}

fn flatten_and(parts: Vec<AtomExpr>) -> AtomExpr {
    let mut flattened = Vec::new();
    for p in parts {
        match p {
            AtomExpr::And(inner) => flattened.extend(inner),
            AtomExpr::True => {}
            other => flattened.push(other),
        }
    }
    match flattened.len() {
        0 => AtomExpr::True,
        1 => flattened.remove(0),
        _ => AtomExpr::And(flattened),
    }
}

fn flatten_or(parts: Vec<AtomExpr>) -> AtomExpr {
    let mut flattened = Vec::new();
    for p in parts {
        match p {
            AtomExpr::Or(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    if flattened.len() == 1 {
        flattened.remove(0)
    } else {
        AtomExpr::Or(flattened)
    }
}

fn flatten_bond_and(parts: Vec<BondExpr>) -> BondExpr {
    let mut flattened = Vec::new();
    for p in parts {
        match p {
            BondExpr::And(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    if flattened.len() == 1 {
        flattened.remove(0)
    } else {
        BondExpr::And(flattened)
    }
}

pub fn parse(input: &str) -> Result<QueryMol, SmartsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmartsError::EmptyInput);
    }
    Parser::new(trimmed).parse_smarts()
}
