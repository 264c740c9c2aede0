//! Element Query and Methods
//!
//! querySelector, querySelectorAll and matches over a small selector grammar:
//! type, universal, `#id`, `.class`, `[attr]`, `[attr=value]`, compound
//! selectors, descendant and child combinators, and comma-separated lists.
//! Anything else is a syntax error.

use crate::{DomError, DomTree, ElementData, NodeId};
use std::iter::Peekable;
use std::str::Chars;

/// Element query trait
pub trait ElementQuery {
    /// First descendant of `root` matching `selector`, in document order
    fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, DomError>;

    /// All descendants of `root` matching `selector`, in document order
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError>;

    /// Check if element matches selector
    fn matches(&self, element: NodeId, selector: &str) -> Result<bool, DomError>;
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    /// Each compound paired with the combinator linking it to the previous one
    compounds: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq)]
struct Compound {
    parts: Vec<SimpleSelector>,
}

#[derive(Debug, Clone, PartialEq)]
enum SimpleSelector {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

impl Selector {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, DomError> {
        SelectorParser { chars: input.chars().peekable() }
            .selector_list()
            .ok_or_else(|| DomError::InvalidSelector(input.to_string()))
    }

    /// Check whether `element` matches any alternative
    pub fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        self.alternatives.iter().any(|complex| match_at(tree, element, &complex.compounds))
    }
}

fn match_at(tree: &DomTree, element: NodeId, compounds: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = compounds.split_last() else {
        return true;
    };
    let Some(data) = tree.element(element) else {
        return false;
    };
    if !compound.matches(data) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => tree
            .parent(element)
            .is_some_and(|parent| match_at(tree, parent, rest)),
        Combinator::Descendant => tree
            .ancestors(element)
            .any(|ancestor| match_at(tree, ancestor, rest)),
    }
}

impl Compound {
    fn matches(&self, element: &ElementData) -> bool {
        self.parts.iter().all(|part| match part {
            SimpleSelector::Universal => true,
            SimpleSelector::Tag(tag) => element.tag_name.eq_ignore_ascii_case(tag),
            SimpleSelector::Id(id) => element.id() == Some(id.as_str()),
            SimpleSelector::Class(class) => element.class_list().contains(class),
            SimpleSelector::Attr { name, value: None } => element.has_attr(name),
            SimpleSelector::Attr { name, value: Some(value) } => {
                element.get_attr(name) == Some(value.as_str())
            }
        })
    }
}

struct SelectorParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl SelectorParser<'_> {
    fn selector_list(&mut self) -> Option<Selector> {
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.complex()?);
            self.skip_whitespace();
            match self.chars.next() {
                None => break,
                Some(',') => continue,
                Some(_) => return None,
            }
        }
        Some(Selector { alternatives })
    }

    fn complex(&mut self) -> Option<ComplexSelector> {
        self.skip_whitespace();
        let mut compounds = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let had_space = self.skip_whitespace();
            match self.chars.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.chars.next();
                    self.skip_whitespace();
                    compounds.push((Combinator::Child, self.compound()?));
                }
                Some(_) if had_space => compounds.push((Combinator::Descendant, self.compound()?)),
                Some(_) => return None,
            }
        }
        Some(ComplexSelector { compounds })
    }

    fn compound(&mut self) -> Option<Compound> {
        let mut parts = Vec::new();
        while let Some(&c) = self.chars.peek() {
            let part = match c {
                '*' if parts.is_empty() => {
                    self.chars.next();
                    SimpleSelector::Universal
                }
                '#' => {
                    self.chars.next();
                    SimpleSelector::Id(self.ident()?)
                }
                '.' => {
                    self.chars.next();
                    SimpleSelector::Class(self.ident()?)
                }
                '[' => {
                    self.chars.next();
                    self.attribute()?
                }
                c if parts.is_empty() && is_ident_char(c) => {
                    SimpleSelector::Tag(self.ident()?.to_ascii_lowercase())
                }
                _ => break,
            };
            parts.push(part);
        }
        (!parts.is_empty()).then_some(Compound { parts })
    }

    fn attribute(&mut self) -> Option<SimpleSelector> {
        self.skip_whitespace();
        let name = self.ident()?;
        self.skip_whitespace();
        let value = match self.chars.next()? {
            ']' => return Some(SimpleSelector::Attr { name, value: None }),
            '=' => {
                self.skip_whitespace();
                match self.chars.peek()? {
                    '"' | '\'' => self.quoted()?,
                    _ => self.ident()?,
                }
            }
            _ => return None,
        };
        self.skip_whitespace();
        (self.chars.next()? == ']').then_some(SimpleSelector::Attr { name, value: Some(value) })
    }

    fn quoted(&mut self) -> Option<String> {
        let quote = self.chars.next()?;
        let mut out = String::new();
        loop {
            match self.chars.next()? {
                c if c == quote => return Some(out),
                '\\' => out.push(self.chars.next()?),
                c => out.push(c),
            }
        }
    }

    /// Identifier with backslash escapes, so `[class\:in]` names `class:in`
    fn ident(&mut self) -> Option<String> {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\\' {
                self.chars.next();
                out.push(self.chars.next()?);
            } else if is_ident_char(c) {
                out.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        (!out.is_empty()).then_some(out)
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {
            skipped = true;
        }
        skipped
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

impl ElementQuery for DomTree {
    fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.descendants(root).into_iter().find(|&id| selector.matches(self, id)))
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect())
    }

    fn matches(&self, element: NodeId, selector: &str) -> Result<bool, DomError> {
        Ok(Selector::parse(selector)?.matches(self, element))
    }
}
