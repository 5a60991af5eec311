//! Expansion of reaction rules into concrete variants.
//!
//! A bracket atom may list alternatives that share one map number, as in
//! `[Cl,Br:2]`. Each such atom multiplies the number of rule variants by
//! the number of its alternatives.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::reaction::{parse_reaction_smarts, Reaction, ReactionSmartsError};
use crate::smarts::{from_smarts, to_smarts};
use crate::smiles::split_cx;

static MAPPED_ALTERNATIVES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]:]+(?:,[^\]:]+)*):(\d+)\]").expect("valid regex")
});

/// A side written as one parenthesized group is an intramolecular
/// template and is used as written.
static GROUPED_SIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(.+\)|\(.+\)$").expect("valid regex"));

/// Every single-choice spelling of `pattern`.
///
/// Each mapped bracket atom `[a1,a2,...:n]` is rewritten to `[ai:n]`; the
/// result is the cartesian product over all such atoms, the leftmost atom
/// varying slowest. A pattern without alternatives comes back unchanged.
/// Text inside a CX suffix is never rewritten.
pub fn expand_alternatives(pattern: &str) -> Vec<String> {
    let (head, cx) = match split_cx(pattern) {
        (head, Some(cx)) => (head, Some(cx)),
        (_, None) => (pattern, None),
    };

    let tokens: Vec<(std::ops::Range<usize>, Vec<String>)> = MAPPED_ALTERNATIVES
        .captures_iter(head)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let map = &caps[2];
            let options = caps[1]
                .split(',')
                .map(|alt| format!("[{alt}:{map}]"))
                .collect();
            Some((whole.range(), options))
        })
        .collect();

    if tokens.is_empty() {
        return vec![pattern.to_string()];
    }

    let mut variants = vec![String::new()];
    let mut last = 0;
    for (range, options) in &tokens {
        let between = &head[last..range.start];
        variants = variants
            .iter()
            .flat_map(|prefix| options.iter().map(move |opt| format!("{prefix}{between}{opt}")))
            .collect();
        last = range.end;
    }
    let tail = &head[last..];
    variants
        .into_iter()
        .map(|mut v| {
            v.push_str(tail);
            if let Some(cx) = cx {
                v.push(' ');
                v.push_str(cx);
            }
            v
        })
        .collect()
}

/// Concrete spellings of one side of a rule.
///
/// The side is parsed and written back out, which also rejects it when it
/// is not valid SMARTS. Rules carry no CX layer, so a parsed pattern has
/// exactly one structural variant.
fn side_structures(side: &str) -> Result<Vec<String>, ValidationError> {
    if GROUPED_SIDE.is_match(side) {
        return Ok(vec![side.to_string()]);
    }
    let query = from_smarts(side).map_err(|e| ValidationError::invalid_structure(side, e))?;
    Ok(vec![to_smarts(&query)])
}

/// Every concrete reaction a rule stands for, deduplicated by its text.
///
/// Combinations that do not parse as a reaction are dropped.
pub fn reaction_variants(rule: &str) -> Result<Vec<Reaction>, ValidationError> {
    let sides: Vec<&str> = rule.split(">>").collect();
    let [reactants, products] = sides[..] else {
        return Err(ValidationError::invalid_structure(
            rule,
            ReactionSmartsError::MissingSeparator,
        ));
    };

    let reactant_sides = expand_alternatives(reactants)
        .iter()
        .map(|s| side_structures(s))
        .collect::<Result<Vec<_>, _>>()?;
    let product_sides = expand_alternatives(products)
        .iter()
        .map(|s| side_structures(s))
        .collect::<Result<Vec<_>, _>>()?;

    let mut texts = BTreeSet::new();
    for r_set in &reactant_sides {
        for p_set in &product_sides {
            for r in r_set {
                for p in p_set {
                    texts.insert(format!("{r}>>{p}"));
                }
            }
        }
    }

    let mut variants = Vec::with_capacity(texts.len());
    for text in texts {
        match parse_reaction_smarts(&text) {
            Ok(rxn) => variants.push(rxn),
            Err(e) => tracing::debug!(variant = %text, error = %e, "dropping unparsable rule variant"),
        }
    }
    Ok(variants)
}
