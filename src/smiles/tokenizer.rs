use crate::element::Element;
use crate::smiles::error::SmilesError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(AtomToken),
    Bond(BondToken),
    RingClosure {
        bond: Option<BondToken>,
        digit: u16,
        pos: usize,
    },
    OpenParen(usize),
    CloseParen(usize),
    Dot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomToken {
    /// `0` for the `*` wildcard.
    pub atomic_num: u8,
    pub is_aromatic: bool,
    pub isotope: u16,
    pub hcount: Option<u8>,
    pub charge: i8,
    pub atom_class: u16,
    pub is_bracket: bool,
    pub pos: usize,
}

/// Directional bonds (`/`, `\`) are read as plain single bonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondToken {
    Single,
    Double,
    Triple,
    Aromatic,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            '[' => {
                let (tok, end) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = end;
            }
            'B' if next == Some('r') => {
                tokens.push(Token::Atom(bare_atom(Element::Br as u8, false, i)));
                i += 2;
            }
            'C' if next == Some('l') => {
                tokens.push(Token::Atom(bare_atom(Element::Cl as u8, false, i)));
                i += 2;
            }
            ch @ ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I') => {
                let elem = organic_element(ch.to_ascii_uppercase());
                tokens.push(Token::Atom(bare_atom(elem, false, i)));
                i += 1;
            }
            ch @ ('b' | 'c' | 'n' | 'o' | 'p' | 's') => {
                let elem = organic_element(ch.to_ascii_uppercase());
                tokens.push(Token::Atom(bare_atom(elem, true, i)));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Atom(bare_atom(0, false, i)));
                i += 1;
            }
            '-' => {
                if looks_like_bond(&tokens) {
                    tokens.push(Token::Bond(BondToken::Single));
                    i += 1;
                } else {
                    return Err(SmilesError::UnexpectedChar { pos: i, ch: '-' });
                }
            }
            '/' | '\\' => {
                tokens.push(Token::Bond(BondToken::Single));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Bond(BondToken::Double));
                i += 1;
            }
            '#' => {
                tokens.push(Token::Bond(BondToken::Triple));
                i += 1;
            }
            ':' => {
                tokens.push(Token::Bond(BondToken::Aromatic));
                i += 1;
            }
            '$' => return Err(SmilesError::UnsupportedBond { pos: i, ch: '$' }),
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot(i));
                i += 1;
            }
            '%' => {
                let digit = parse_percent_ring(&chars, i)?;
                let pending_bond = try_consume_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure {
                    bond: pending_bond,
                    digit,
                    pos: i,
                });
                i += 3;
            }
            d @ '0'..='9' => {
                let pending_bond = try_consume_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure {
                    bond: pending_bond,
                    digit: (d as u16) - b'0' as u16,
                    pos: i,
                });
                i += 1;
            }
            ch => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
        }
    }

    Ok(tokens)
}

fn organic_element(ch: char) -> u8 {
    let elem = match ch {
        'B' => Element::B,
        'C' => Element::C,
        'N' => Element::N,
        'O' => Element::O,
        'P' => Element::P,
        'S' => Element::S,
        'F' => Element::F,
        _ => Element::I,
    };
    elem as u8
}

fn bare_atom(atomic_num: u8, aromatic: bool, pos: usize) -> AtomToken {
    AtomToken {
        atomic_num,
        is_aromatic: aromatic,
        isotope: 0,
        hcount: None,
        charge: 0,
        atom_class: 0,
        is_bracket: false,
        pos,
    }
}

fn looks_like_bond(tokens: &[Token]) -> bool {
    matches!(
        tokens.last(),
        Some(Token::Atom(_))
            | Some(Token::RingClosure { .. })
            | Some(Token::CloseParen(_))
            | Some(Token::OpenParen(_))
            | None
    )
}

fn try_consume_pending_bond(tokens: &mut Vec<Token>) -> Option<BondToken> {
    if let Some(Token::Bond(b)) = tokens.last() {
        let b = *b;
        tokens.pop();
        return Some(b);
    }
    None
}

fn parse_percent_ring(chars: &[char], start: usize) -> Result<u16, SmilesError> {
    let i = start + 1;
    match (chars.get(i), chars.get(i + 1)) {
        (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
            Ok((*a as u16 - b'0' as u16) * 10 + (*b as u16 - b'0' as u16))
        }
        _ => Err(SmilesError::UnexpectedChar {
            pos: start,
            ch: '%',
        }),
    }
}

fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1;

    let isotope = parse_number(chars, &mut i)
        .map(|v| u16::try_from(v).map_err(|_| SmilesError::InvalidIsotope { pos: start }))
        .transpose()?
        .unwrap_or(0);

    let (atomic_num, is_aromatic) = parse_bracket_element(chars, &mut i, start)?;

    skip_chirality(chars, &mut i);

    let hcount = parse_hcount(chars, &mut i);

    let charge = parse_charge(chars, &mut i, start)?;

    let atom_class = if chars.get(i) == Some(&':') {
        i += 1;
        let val = parse_number(chars, &mut i).ok_or(SmilesError::InvalidAtomClass { pos: i })?;
        u16::try_from(val).map_err(|_| SmilesError::InvalidAtomClass { pos: start })?
    } else {
        0
    };

    if chars.get(i) != Some(&']') {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }

    Ok((
        AtomToken {
            atomic_num,
            is_aromatic,
            isotope,
            hcount: Some(hcount.unwrap_or(0)),
            charge,
            atom_class,
            is_bracket: true,
            pos: start,
        },
        i + 1,
    ))
}

fn parse_number(chars: &[char], i: &mut usize) -> Option<u32> {
    let mut val: Option<u32> = None;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        val = Some(val.unwrap_or(0).saturating_mul(10).saturating_add(d));
        *i += 1;
    }
    val
}

fn parse_bracket_element(
    chars: &[char],
    i: &mut usize,
    bracket_start: usize,
) -> Result<(u8, bool), SmilesError> {
    let Some(&first) = chars.get(*i) else {
        return Err(SmilesError::UnclosedBracket { pos: bracket_start });
    };

    if first == '*' {
        *i += 1;
        return Ok((0, false));
    }

    const AROMATIC: [(&str, Element); 10] = [
        ("se", Element::Se),
        ("te", Element::Te),
        ("as", Element::As),
        ("si", Element::Si),
        ("b", Element::B),
        ("c", Element::C),
        ("n", Element::N),
        ("o", Element::O),
        ("p", Element::P),
        ("s", Element::S),
    ];

    for (pat, elem) in AROMATIC {
        let end = *i + pat.len();
        if end <= chars.len() && chars[*i..end].iter().copied().eq(pat.chars()) {
            *i = end;
            return Ok((elem as u8, true));
        }
    }

    if first.is_ascii_uppercase() {
        if let Some(&second) = chars.get(*i + 1) {
            if second.is_ascii_lowercase() {
                let sym: String = [first, second].iter().collect();
                if let Some(e) = Element::from_symbol(&sym) {
                    *i += 2;
                    return Ok((e as u8, false));
                }
            }
        }
        if let Some(e) = Element::from_symbol(&first.to_string()) {
            *i += 1;
            return Ok((e as u8, false));
        }
    }

    Err(SmilesError::InvalidElement {
        pos: *i,
        text: first.to_string(),
    })
}

/// `@`, `@@`, and the `@TH1`/`@AL2`/`@SP3`/`@TB12`/`@OH30` classes.
fn skip_chirality(chars: &[char], i: &mut usize) {
    if chars.get(*i) != Some(&'@') {
        return;
    }
    *i += 1;
    if chars.get(*i) == Some(&'@') {
        *i += 1;
        return;
    }
    let class: String = chars.iter().skip(*i).take(2).collect();
    if matches!(class.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
        *i += 2;
        parse_number(chars, i);
    }
}

fn parse_hcount(chars: &[char], i: &mut usize) -> Option<u8> {
    if chars.get(*i) != Some(&'H') {
        return None;
    }
    *i += 1;
    match chars.get(*i).and_then(|c| c.to_digit(10)) {
        Some(d) => {
            *i += 1;
            Some(d as u8)
        }
        None => Some(1),
    }
}

fn parse_charge(chars: &[char], i: &mut usize, bracket_start: usize) -> Result<i8, SmilesError> {
    let sign: i8 = match chars.get(*i) {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Ok(0),
    };
    let symbol = chars[*i];
    *i += 1;

    if let Some(val) = parse_number(chars, i) {
        let val = i8::try_from(val).map_err(|_| SmilesError::InvalidCharge { pos: bracket_start })?;
        return Ok(sign * val);
    }

    let mut count: i8 = 1;
    while chars.get(*i) == Some(&symbol) {
        count = count
            .checked_add(1)
            .ok_or(SmilesError::InvalidCharge { pos: bracket_start })?;
        *i += 1;
    }
    Ok(sign * count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_atom(s: &str) -> AtomToken {
        match tokenize(s).unwrap().into_iter().next() {
            Some(Token::Atom(a)) => a,
            other => panic!("expected atom, got {other:?}"),
        }
    }

    #[test]
    fn tokenize_methane() {
        let a = first_atom("C");
        assert_eq!(a.atomic_num, 6);
        assert!(!a.is_bracket);
        assert!(!a.is_aromatic);
    }

    #[test]
    fn tokenize_ethene() {
        assert_eq!(tokenize("C=C").unwrap().len(), 3);
    }

    #[test]
    fn tokenize_two_letter_organics() {
        let tokens = tokenize("ClCBr").unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0], Token::Atom(a) if a.atomic_num == 17));
        assert!(matches!(&tokens[2], Token::Atom(a) if a.atomic_num == 35));
    }

    #[test]
    fn tokenize_bracket_atom() {
        let a = first_atom("[NH4+]");
        assert_eq!(a.atomic_num, 7);
        assert!(a.is_bracket);
        assert_eq!(a.hcount, Some(4));
        assert_eq!(a.charge, 1);
    }

    #[test]
    fn tokenize_isotope() {
        let a = first_atom("[13C]");
        assert_eq!(a.isotope, 13);
        assert_eq!(a.atomic_num, 6);
    }

    #[test]
    fn tokenize_ring_closure() {
        let tokens = tokenize("C1CC1").unwrap();
        assert_eq!(tokens.len(), 5);
        assert!(matches!(&tokens[1], Token::RingClosure { digit: 1, .. }));
    }

    #[test]
    fn tokenize_percent_ring_with_bond() {
        let tokens = tokenize("C=%10CC%10").unwrap();
        assert!(matches!(
            &tokens[1],
            Token::RingClosure {
                digit: 10,
                bond: Some(BondToken::Double),
                ..
            }
        ));
    }

    #[test]
    fn chirality_is_skipped() {
        let a = first_atom("[C@@H](F)(Cl)Br");
        assert_eq!(a.hcount, Some(1));
        let a = first_atom("[C@TH2H]");
        assert_eq!(a.hcount, Some(1));
    }

    #[test]
    fn directional_bonds_are_single() {
        let tokens = tokenize("F/C=C\\F").unwrap();
        assert_eq!(tokens[1], Token::Bond(BondToken::Single));
        assert_eq!(tokens[5], Token::Bond(BondToken::Single));
    }

    #[test]
    fn tokenize_aromatic() {
        let tokens = tokenize("c1ccccc1").unwrap();
        assert_eq!(tokens.len(), 8);
        let a = first_atom("c1ccccc1");
        assert!(a.is_aromatic);
        assert_eq!(a.atomic_num, 6);
    }

    #[test]
    fn bracket_aromatic_se() {
        let a = first_atom("[se]");
        assert!(a.is_aromatic);
        assert_eq!(a.atomic_num, 34);
    }

    #[test]
    fn bracket_wildcard() {
        assert_eq!(first_atom("*").atomic_num, 0);
        assert_eq!(first_atom("[*:3]").atom_class, 3);
    }

    #[test]
    fn negative_charge_variants() {
        assert_eq!(first_atom("[O-]").charge, -1);
        assert_eq!(first_atom("[O-2]").charge, -2);
        assert_eq!(first_atom("[O--]").charge, -2);
        assert_eq!(first_atom("[Fe+3]").charge, 3);
    }

    #[test]
    fn atom_class() {
        assert_eq!(first_atom("[C:1]").atom_class, 1);
        assert_eq!(first_atom("[CH3:12]").atom_class, 12);
    }

    #[test]
    fn quadruple_bond_rejected() {
        assert!(matches!(
            tokenize("C$C"),
            Err(SmilesError::UnsupportedBond { pos: 1, .. })
        ));
    }

    #[test]
    fn unknown_character_rejected() {
        assert!(tokenize("C?C").is_err());
        assert!(tokenize("[Xx]").is_err());
        assert!(tokenize("[C").is_err());
    }
}
