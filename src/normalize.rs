//! Repairs for malformed structure and pattern strings.
//!
//! Chemical sketchers export SMILES and SMARTS with a handful of recurring
//! defects: doubled backslashes, `;hN` hydrogen annotations, halogens
//! written without brackets and charge primitives after the map number.
//! The rules here are plain text rewrites applied before any parsing.
//!
//! Rules 3 to 5 only ever touch the part of the string before a CX
//! `|...|` suffix.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::smiles::split_cx;

static H_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r";h\d").expect("valid regex"));

static HALOGEN_MAPPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([FCBI]l?):(\d+)").expect("valid regex"));
// The regex crate has no lookahead: an optional `[` is captured instead and
// a match that has it is written back unchanged.
static HALOGEN_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([FCBI]l)(\[)?").expect("valid regex"));
static HALOGEN_BRANCH_MAPPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(-([FCBI]l?):(\d+)\)").expect("valid regex"));
static HALOGEN_BRANCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(-([FCBI]l)\)").expect("valid regex"));

static AROMATIC_NH_MAPPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[#7:(\d+);h(\d+)\]").expect("valid regex"));
static AROMATIC_NH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[#7;h(\d+)\]").expect("valid regex"));

static CHARGE_AFTER_MAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(#\d+):(\d+);([+-])\]").expect("valid regex"));

/// Apply every repair in order.
pub fn normalize(raw: &str) -> String {
    let s = unescape_backslashes(raw);
    let s = strip_h_annotations(&s);
    repair_head(&s)
}

/// Repairs for molecules: backslashes and `;hN` annotations only.
pub fn normalize_molecule(raw: &str) -> String {
    strip_h_annotations(&unescape_backslashes(raw))
}

/// Repairs for reaction rules. `;hN` annotations are left in place so the
/// aromatic nitrogen rewrite can read them.
pub fn normalize_rule(raw: &str) -> String {
    repair_head(&unescape_backslashes(raw))
}

/// Split a cleaned multi-component SMILES into its components.
pub fn split_smiles(s: &str) -> Vec<String> {
    s.split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn unescape_backslashes(s: &str) -> String {
    s.replace("\\\\", "\\")
}

fn strip_h_annotations(s: &str) -> String {
    H_ANNOTATION.replace_all(s, "").into_owned()
}

/// Rules 3 to 5 on the text before the CX suffix; the suffix is re-attached
/// untouched.
fn repair_head(s: &str) -> String {
    let (head, cx) = split_cx(s);
    let head = if cx.is_some() { head } else { s };
    let mut out = repair_halogens(head);
    out = repair_aromatic_nitrogen(&out);
    out = repair_charges(&out);
    if let Some(cx) = cx {
        out.push(' ');
        out.push_str(cx);
    }
    out
}

fn repair_halogens(s: &str) -> String {
    let s = HALOGEN_MAPPED.replace_all(s, "-[${1}:${2}]");
    let s = HALOGEN_BARE.replace_all(&s, |caps: &Captures| {
        if caps.get(2).is_some() {
            caps[0].to_string()
        } else {
            format!("-[{}]", &caps[1])
        }
    });
    let s = HALOGEN_BRANCH_MAPPED.replace_all(&s, "(-[${1}:${2}])");
    HALOGEN_BRANCH.replace_all(&s, "(-[${1}])").into_owned()
}

fn repair_aromatic_nitrogen(s: &str) -> String {
    let s = AROMATIC_NH_MAPPED.replace_all(s, "[nH${2}:${1}]");
    AROMATIC_NH.replace_all(&s, "[nH${1}]").into_owned()
}

fn repair_charges(s: &str) -> String {
    CHARGE_AFTER_MAP.replace_all(s, "[${1};${3}:${2}]").into_owned()
}
