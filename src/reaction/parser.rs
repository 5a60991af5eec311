use crate::smarts::{from_smarts, QueryMol};

use super::error::ReactionSmartsError;
use super::Reaction;

pub fn parse_reaction_smarts(s: &str) -> Result<Reaction, ReactionSmartsError> {
    let (reactant_text, agent_text, product_text) = split_reaction(s.trim())?;

    let reactant_templates = parse_section(reactant_text, "reactant")?;
    if reactant_templates.is_empty() {
        return Err(ReactionSmartsError::EmptyReactants);
    }

    let product_templates = parse_section(product_text, "product")?;
    if product_templates.is_empty() {
        return Err(ReactionSmartsError::EmptyProducts);
    }

    // Agents take no part in the transformation; they only have to parse.
    parse_section(agent_text, "agent")?;

    Ok(Reaction {
        reactant_templates,
        product_templates,
    })
}

/// Split at the top-level `>>` (or `>agents>`).
pub(crate) fn split_reaction(s: &str) -> Result<(&str, &str, &str), ReactionSmartsError> {
    let gt_positions = find_gt_positions(s);

    match gt_positions[..] {
        [] | [_] => Err(ReactionSmartsError::MissingSeparator),
        [a, b] => Ok((&s[..a], &s[a + 1..b], &s[b + 1..])),
        _ => Err(ReactionSmartsError::TooManySeparators),
    }
}

fn find_gt_positions(s: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut bracket_depth = 0u32;

    for (i, ch) in s.char_indices() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '>' if bracket_depth == 0 => positions.push(i),
            _ => {}
        }
    }

    positions
}

/// Split on `.` outside brackets and parentheses.
fn split_on_dot(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut bracket_depth = 0u32;
    let mut paren_depth = 0u32;

    for (i, ch) in s.char_indices() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '.' if bracket_depth == 0 && paren_depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Each top-level component is one template. A component written as a
/// parenthesized group `(A.B)` is a single template whose parts must all
/// lie in the same molecule.
fn parse_section(
    text: &str,
    section: &'static str,
) -> Result<Vec<QueryMol>, ReactionSmartsError> {
    let mut mols = Vec::new();
    for comp in split_on_dot(text.trim()) {
        let inner = component_group(comp)?.unwrap_or(comp);
        let mol = from_smarts(inner)
            .map_err(|e| ReactionSmartsError::InvalidComponent { section, detail: e })?;
        mols.push(mol);
    }
    Ok(mols)
}

/// The text inside `(...)` when the whole component is one group.
fn component_group(s: &str) -> Result<Option<&str>, ReactionSmartsError> {
    if !s.starts_with('(') {
        return Ok(None);
    }
    let mut depth = 0i32;
    let mut bracket_depth = 0u32;
    for (i, ch) in s.char_indices() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' if bracket_depth == 0 => depth += 1,
            ')' if bracket_depth == 0 => {
                depth -= 1;
                if depth == 0 {
                    return if i == s.len() - 1 {
                        Ok(Some(&s[1..i]))
                    } else {
                        Err(ReactionSmartsError::UnbalancedGroup)
                    };
                }
            }
            _ => {}
        }
    }
    Err(ReactionSmartsError::UnbalancedGroup)
}
