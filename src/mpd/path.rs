use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    error::{Error, Result},
    mpd::xml::{Attribute, Document, Name},
};

/// Prefix to namespace URI bindings used to resolve prefixed names in path expressions
pub type Namespaces<'a> = &'a [(&'a str, &'a str)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// `/step`
    Child,
    /// `//step`
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    name: Name,
}

/// A compiled absolute location path, the small XPath subset MPD lookups need:
/// `/` and `//` separated element steps ending in one `@attribute` step.
#[derive(Debug, Clone)]
pub struct Path {
    expr: String,
    elements: Vec<Step>,
    attribute: Step,
}

impl Path {
    /// # Errors
    /// Errors if the expression is not an absolute path, has an empty or
    /// misplaced step, does not end in an attribute, or uses a prefix missing
    /// from `namespaces`
    pub fn compile(expr: &str, namespaces: Namespaces) -> Result<Self> {
        let Some(mut rest) = expr.strip_prefix('/') else {
            return Err(Error::query(expr, "only absolute paths are supported"));
        };

        let mut elements = Vec::new();
        loop {
            let axis = match rest.strip_prefix('/') {
                Some(r) => {
                    rest = r;
                    Axis::Descendant
                }
                None => Axis::Child,
            };

            let (step, remainder) = match rest.split_once('/') {
                Some((step, remainder)) => (step, Some(remainder)),
                None => (rest, None),
            };

            if step.is_empty() {
                return Err(Error::query(expr, "empty step"));
            }

            match (step.strip_prefix('@'), remainder) {
                (Some(attr), None) => {
                    let name = resolve_name(expr, attr, namespaces)?;
                    return Ok(Self {
                        expr: expr.to_string(),
                        elements,
                        attribute: Step { axis, name },
                    });
                }
                (Some(_), Some(_)) => {
                    return Err(Error::query(expr, "an attribute step must be the last step"));
                }
                (None, None) => {
                    return Err(Error::query(expr, "path must end in an attribute step"));
                }
                (None, Some(r)) => {
                    let name = resolve_name(expr, step, namespaces)?;
                    elements.push(Step { axis, name });
                    rest = r;
                }
            }
        }
    }

    /// Evaluates the path from the document root.
    /// Matches come back in document order, each attribute at most once.
    pub fn evaluate<'d>(&self, doc: &'d Document) -> Vec<&'d Attribute> {
        // `None` stands for the document root, which sits above the root element
        let mut context: Vec<Option<usize>> = vec![None];

        for step in &self.elements {
            let mut matched = BTreeSet::new();
            for ctx in &context {
                matched.extend(
                    candidates(doc, step.axis, *ctx)
                        .into_iter()
                        .filter(|&id| doc.element(id).name == step.name),
                );
            }
            context = matched.into_iter().map(Some).collect();
        }

        // (owner element, attribute index) sorts in document order
        let mut matched = BTreeSet::new();
        for ctx in context {
            let owners = match (self.attribute.axis, ctx) {
                (Axis::Child, None) => Vec::new(),
                (Axis::Child, Some(id)) => vec![id],
                (Axis::Descendant, None) => (0..doc.element_count()).collect(),
                (Axis::Descendant, Some(id)) => std::iter::once(id).chain(doc.descendants(id)).collect(),
            };
            for owner in owners {
                let attributes = &doc.element(owner).attributes;
                matched.extend(
                    attributes
                        .iter()
                        .enumerate()
                        .filter(|(_, a)| a.name == self.attribute.name)
                        .map(|(idx, _)| (owner, idx)),
                );
            }
        }

        matched
            .into_iter()
            .map(|(owner, idx)| &doc.element(owner).attributes[idx])
            .collect()
    }
}

fn candidates(doc: &Document, axis: Axis, ctx: Option<usize>) -> Vec<usize> {
    match (axis, ctx) {
        (Axis::Child, None) => doc.roots().to_vec(),
        (Axis::Child, Some(id)) => doc.children(id).to_vec(),
        (Axis::Descendant, None) => (0..doc.element_count()).collect(),
        (Axis::Descendant, Some(id)) => doc.descendants(id).collect(),
    }
}

fn resolve_name(expr: &str, qname: &str, namespaces: Namespaces) -> Result<Name> {
    let (namespace, local) = match qname.split_once(':') {
        Some((prefix, local)) => {
            let Some((_, uri)) = namespaces.iter().find(|(p, _)| *p == prefix) else {
                return Err(Error::query(
                    expr,
                    format!("undefined namespace prefix `{prefix}`"),
                ));
            };
            (Some(*uri), local)
        }
        None => (None, qname),
    };

    let valid = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(Error::query(expr, format!("invalid name `{qname}`")));
    }

    Ok(Name::new(namespace, local))
}

/// Evaluates `expr` and returns every matching attribute in document order
///
/// # Errors
/// Errors if `expr` cannot be compiled
pub fn select_all<'d>(doc: &'d Document, expr: &str, namespaces: Namespaces) -> Result<Vec<&'d Attribute>> {
    let path = Path::compile(expr, namespaces)?;
    let attributes = path.evaluate(doc);
    trace!(expr = %path.expr, count = attributes.len(), "Evaluated path");
    Ok(attributes)
}

/// Evaluates `expr`, requiring exactly one match
///
/// # Errors
/// Errors with [`Error::Cardinality`] when zero or several attributes match
pub fn select_single<'d>(doc: &'d Document, expr: &str, namespaces: Namespaces) -> Result<&'d Attribute> {
    match select_all(doc, expr, namespaces)?.as_slice() {
        [attribute] => Ok(*attribute),
        matches => Err(Error::Cardinality {
            expr: expr.to_string(),
            count: matches.len(),
        }),
    }
}
