use serde::{Deserialize, Serialize};

/// How an element is rendered to Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// `<h1>`..`<h6>`; the level is the number of `#` markers.
    Heading(u8),
    Paragraph,
    Link,
    Bold,
    Italic,
    UnorderedList,
    OrderedList,
    Image,
    Div,
    Span,
    LineBreak,
    HorizontalRule,
}

/// Maps one tag name to the kind it renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub tag: String,
    pub kind: NodeKind,
}

/// Ordered tag → kind table consulted by the builtin converter.
///
/// Tags without an entry, and unclosed elements, are transparent: their
/// markup is dropped and their content kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// A table with no rules; every tag is stripped.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Builder form of [`RuleTable::insert`].
    pub fn with_rule(mut self, tag: &str, kind: NodeKind) -> Self {
        self.insert(tag, kind);
        self
    }

    /// Add a rule, or replace the kind of an existing one in place.
    /// Returns the kind that was replaced.
    pub fn insert(&mut self, tag: &str, kind: NodeKind) -> Option<NodeKind> {
        let tag = tag.to_ascii_lowercase();
        match self.rules.iter_mut().find(|rule| rule.tag == tag) {
            Some(rule) => Some(std::mem::replace(&mut rule.kind, kind)),
            None => {
                self.rules.push(Rule { tag, kind });
                None
            }
        }
    }

    pub fn remove(&mut self, tag: &str) -> Option<NodeKind> {
        let tag = tag.to_ascii_lowercase();
        let idx = self.rules.iter().position(|rule| rule.tag == tag)?;
        Some(self.rules.remove(idx).kind)
    }

    pub fn kind_for(&self, tag: &str) -> Option<NodeKind> {
        self.rules
            .iter()
            .find(|rule| rule.tag == tag)
            .map(|rule| rule.kind)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::empty()
            .with_rule("h1", NodeKind::Heading(1))
            .with_rule("h2", NodeKind::Heading(2))
            .with_rule("h3", NodeKind::Heading(3))
            .with_rule("h4", NodeKind::Heading(4))
            .with_rule("h5", NodeKind::Heading(5))
            .with_rule("h6", NodeKind::Heading(6))
            .with_rule("p", NodeKind::Paragraph)
            .with_rule("a", NodeKind::Link)
            .with_rule("strong", NodeKind::Bold)
            .with_rule("b", NodeKind::Bold)
            .with_rule("em", NodeKind::Italic)
            .with_rule("i", NodeKind::Italic)
            .with_rule("ul", NodeKind::UnorderedList)
            .with_rule("ol", NodeKind::OrderedList)
            .with_rule("img", NodeKind::Image)
            .with_rule("div", NodeKind::Div)
            .with_rule("span", NodeKind::Span)
            .with_rule("br", NodeKind::LineBreak)
            .with_rule("hr", NodeKind::HorizontalRule)
    }
}
