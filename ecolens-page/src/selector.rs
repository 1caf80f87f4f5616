//! Compiled selectors for the limited CSS grammar the site profiles use
//!
//! Profiles carry selector strings opaquely; this module compiles them into
//! matchers once, at observer construction. Supported forms: tag, `#id`,
//! `.class` (compoundable), `[attr="v"]`, `[attr*="v"]`, and the descendant
//! combinator. Anything else is rejected at compile time, never at match time.

use ego_tree::{NodeRef, Tree};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::page::PageNode;

/// Errors from selector compilation
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unsupported selector syntax in '{selector}': {detail}")]
    Unsupported { selector: String, detail: String },
}

/// Attribute comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    /// `[attr="v"]` - exact match
    Exact,
    /// `[attr*="v"]` - substring match
    Substring,
}

#[derive(Debug, Clone)]
struct AttrPredicate {
    name: String,
    op: AttrOp,
    value: String,
}

/// One compound step: every part must hold on the same element
#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrPredicate>,
}

/// A compiled selector: a descendant chain of compound steps
#[derive(Debug, Clone)]
pub struct Selector {
    raw: String,
    parts: Vec<Compound>,
}

static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\[([A-Za-z][\w-]*)(\*?=)"([^"]*)"\]"#).unwrap());

impl Selector {
    /// Compile a selector string
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let parts = trimmed
            .split_whitespace()
            .map(|step| parse_compound(raw, step))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: trimmed.to_string(),
            parts,
        })
    }

    /// Build a compound selector requiring every one of `classes`.
    ///
    /// This is the derivation used by the overlay builder: composition applies
    /// the classes, lookup requires them all. The two must never diverge.
    pub fn for_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        let raw = classes
            .iter()
            .map(|c| format!(".{c}"))
            .collect::<Vec<_>>()
            .join("");
        Self {
            raw,
            parts: vec![Compound {
                classes,
                ..Compound::default()
            }],
        }
    }

    /// The source text this selector was compiled from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether `node` matches this selector within `tree`.
    ///
    /// Descendant chains match the node against the last step and walk
    /// ancestors for the remaining steps, outermost first.
    pub fn matches(&self, tree: &Tree<PageNode>, node: ego_tree::NodeId) -> bool {
        let Some(node) = tree.get(node) else {
            return false;
        };
        let Some(last) = self.parts.last() else {
            return false;
        };

        if !compound_matches(last, &node) {
            return false;
        }

        let mut remaining = self.parts.len() - 1;
        for ancestor in node.ancestors() {
            if remaining == 0 {
                break;
            }
            if compound_matches(&self.parts[remaining - 1], &ancestor) {
                remaining -= 1;
            }
        }
        remaining == 0
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_compound(selector: &str, step: &str) -> Result<Compound, SelectorError> {
    let unsupported = |detail: &str| SelectorError::Unsupported {
        selector: selector.to_string(),
        detail: detail.to_string(),
    };

    let mut compound = Compound::default();
    let mut rest = step;

    // Leading tag name
    let tag_len = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .count();
    if tag_len > 0 {
        compound.tag = Some(rest[..tag_len].to_ascii_lowercase());
        rest = &rest[tag_len..];
    }

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('.') {
            let len = ident_len(stripped);
            if len == 0 {
                return Err(unsupported("class name expected after '.'"));
            }
            compound.classes.push(stripped[..len].to_string());
            rest = &stripped[len..];
        } else if let Some(stripped) = rest.strip_prefix('#') {
            let len = ident_len(stripped);
            if len == 0 {
                return Err(unsupported("id expected after '#'"));
            }
            if compound.id.is_some() {
                return Err(unsupported("multiple ids in one step"));
            }
            compound.id = Some(stripped[..len].to_string());
            rest = &stripped[len..];
        } else if rest.starts_with('[') {
            let captures = ATTR_RE
                .captures(rest)
                .ok_or_else(|| unsupported("attribute predicate must be [name=\"v\"] or [name*=\"v\"]"))?;
            let op = match &captures[2] {
                "=" => AttrOp::Exact,
                "*=" => AttrOp::Substring,
                _ => return Err(unsupported("unknown attribute operator")),
            };
            compound.attrs.push(AttrPredicate {
                name: captures[1].to_string(),
                op,
                value: captures[3].to_string(),
            });
            rest = &rest[captures[0].len()..];
        } else {
            return Err(unsupported(&format!("unexpected token at '{rest}'")));
        }
    }

    if compound.tag.is_none()
        && compound.id.is_none()
        && compound.classes.is_empty()
        && compound.attrs.is_empty()
    {
        return Err(unsupported("empty compound step"));
    }

    Ok(compound)
}

fn ident_len(s: &str) -> usize {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .count()
}

fn compound_matches(compound: &Compound, node: &NodeRef<'_, PageNode>) -> bool {
    let PageNode::Element(element) = node.value() else {
        return false;
    };

    if let Some(tag) = &compound.tag {
        if element.tag != *tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if element.attr("id").as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|c| element.has_class(c)) {
        return false;
    }
    compound.attrs.iter().all(|predicate| {
        match element.attr(&predicate.name) {
            Some(actual) => match predicate.op {
                AttrOp::Exact => actual == predicate.value,
                AttrOp::Substring => actual.contains(&predicate.value),
            },
            None => false,
        }
    })
}
