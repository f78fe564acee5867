use std::{fmt, ops::Range};

use quick_xml::{
    NsReader,
    events::Event,
    name::{Namespace, ResolveResult},
};

use crate::error::{Error, Result};

/// An expanded XML name: namespace URI (if any) plus local part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub namespace: Option<String>,
    pub local: String,
}

impl Name {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(ToString::to_string),
            local: local.to_string(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug)]
pub struct Attribute {
    pub name: Name,
    pub value: String,
}

#[derive(Debug)]
pub struct Element {
    pub name: Name,
    pub attributes: Vec<Attribute>,
    children: Vec<usize>,
    /// Exclusive end of this element's subtree in the document-order arena
    subtree_end: usize,
}

/// The element and attribute structure of an XML document. Text content is
/// not kept, MPD lookups only ever read attributes.
///
/// Elements live in a flat arena in document order, so an element's index is
/// also its document position and its descendants occupy the contiguous range
/// right after it.
#[derive(Debug, Default)]
pub struct Document {
    elements: Vec<Element>,
    roots: Vec<usize>,
}

impl Document {
    /// Parses XML text, resolving every element and attribute name against the
    /// namespace declarations in scope.
    ///
    /// # Errors
    /// Errors on malformed XML, unknown namespace prefixes or unclosed elements
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        let mut doc = Self::default();
        let mut open: Vec<usize> = Vec::new();

        loop {
            let (ns, event) = reader.read_resolved_event()?;
            let namespace = namespace_uri(ns)?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let name = Name {
                        namespace,
                        local: lossy(e.local_name().as_ref()),
                    };

                    let mut attributes = Vec::new();
                    for attr in e.attributes() {
                        let attr = attr.map_err(quick_xml::Error::from)?;
                        // xmlns declarations are not attributes
                        if attr.key.as_namespace_binding().is_some() {
                            continue;
                        }

                        let (attr_ns, local) = reader.resolve_attribute(attr.key);
                        let name = Name {
                            namespace: namespace_uri(attr_ns)?,
                            local: lossy(local.as_ref()),
                        };
                        attributes.push(Attribute {
                            name,
                            value: attr.unescape_value()?.into_owned(),
                        });
                    }

                    let id = doc.push(name, attributes, open.last().copied());
                    if matches!(event, Event::Start(_)) {
                        open.push(id);
                    } else {
                        doc.close(id);
                    }
                }
                Event::End(_) => {
                    let id = open
                        .pop()
                        .ok_or_else(|| Error::Document("unexpected closing tag".to_string()))?;
                    doc.close(id);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(&id) = open.last() {
            return Err(Error::Document(format!(
                "element <{}> is never closed",
                doc.elements[id].name
            )));
        }
        if doc.roots.is_empty() {
            return Err(Error::Document("document has no root element".to_string()));
        }

        Ok(doc)
    }

    fn push(&mut self, name: Name, attributes: Vec<Attribute>, parent: Option<usize>) -> usize {
        let id = self.elements.len();
        self.elements.push(Element {
            name,
            attributes,
            children: Vec::new(),
            subtree_end: id + 1,
        });

        match parent {
            Some(parent) => self.elements[parent].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn close(&mut self, id: usize) {
        self.elements[id].subtree_end = self.elements.len();
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn element(&self, id: usize) -> &Element {
        &self.elements[id]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, id: usize) -> &[usize] {
        &self.elements[id].children
    }

    /// Every element below `id`, in document order
    pub fn descendants(&self, id: usize) -> Range<usize> {
        id + 1..self.elements[id].subtree_end
    }
}

fn namespace_uri(ns: ResolveResult) -> Result<Option<String>> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Ok(Some(lossy(uri))),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Document(format!(
            "unknown namespace prefix `{}`",
            lossy(&prefix)
        ))),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
