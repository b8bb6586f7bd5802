use log::{debug, trace};

use crate::gateway::entities::decode_entities;
use crate::gateway::parser::{Element, HtmlNode, parse_html};
use crate::gateway::rules::{NodeKind, RuleTable};
use crate::gateway::title::{body_interior, extract_title};

/// Bundled HTML to Markdown converter.
///
/// The input is parsed into a tag tree and rendered depth-first; each element
/// is emitted according to the kind its tag maps to in the [`RuleTable`].
/// Conversion never fails: markup it does not understand is stripped and its
/// text kept.
#[derive(Debug, Clone, Default)]
pub struct HtmlConverter {
    rules: RuleTable,
}

impl HtmlConverter {
    /// Create a converter with the default rule table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Convert an HTML document to Markdown.
    ///
    /// Only the `<body>` interior is rendered when one exists; a `<title>`
    /// found anywhere in the document becomes a leading `# ` heading.
    pub fn convert_to_markdown(&self, html: &str) -> String {
        trace!("Starting HTML to Markdown conversion ({} bytes)", html.len());
        let markdown = normalize_whitespace(&self.render_document(html));
        debug!(
            "HTML conversion completed ({} -> {} characters)",
            html.len(),
            markdown.len()
        );
        markdown
    }

    /// Every conversion step except the final whitespace normalization.
    pub fn render_document(&self, html: &str) -> String {
        let content = match body_interior(html) {
            Some(body) => body,
            None => {
                trace!("No <body> element, converting the whole input");
                html
            }
        };

        let mut markdown = match extract_title(html) {
            Some(title) => format!("# {}\n\n", title),
            None => String::new(),
        };

        let rendered = self.transform(content);
        markdown.push_str(&decode_entities(&rendered));
        markdown
    }

    /// Render a fragment with the rule table, stripping unhandled markup.
    /// Entities are left encoded.
    pub fn transform(&self, fragment: &str) -> String {
        let nodes = parse_html(fragment);
        let mut out = String::with_capacity(fragment.len());
        self.render_nodes(&nodes, &mut out);
        out
    }

    fn render_nodes(&self, nodes: &[HtmlNode], out: &mut String) {
        for node in nodes {
            match node {
                HtmlNode::Text(text) => out.push_str(text),
                HtmlNode::Element(elem) => self.render_element(elem, out),
            }
        }
    }

    fn render_element(&self, elem: &Element, out: &mut String) {
        match self.rules.kind_for(&elem.tag) {
            Some(kind) if elem.closed => self.render_kind(kind, elem, out),
            // Tag stripping: keep the content, drop the markup.
            _ => self.render_nodes(&elem.children, out),
        }
    }

    fn render_kind(&self, kind: NodeKind, elem: &Element, out: &mut String) {
        match kind {
            NodeKind::Heading(level) => {
                out.push_str(&"#".repeat(usize::from(level)));
                out.push(' ');
                self.render_nodes(&elem.children, out);
                out.push('\n');
            }
            NodeKind::Paragraph => {
                self.render_nodes(&elem.children, out);
                out.push_str("\n\n");
            }
            NodeKind::Link => match elem.attr("href") {
                Some(href) => {
                    out.push('[');
                    self.render_nodes(&elem.children, out);
                    out.push_str("](");
                    out.push_str(href);
                    out.push(')');
                }
                None => self.render_nodes(&elem.children, out),
            },
            NodeKind::Bold => self.render_enclosed(elem, "**", out),
            NodeKind::Italic => self.render_enclosed(elem, "*", out),
            NodeKind::UnorderedList => self.render_list(elem, false, out),
            NodeKind::OrderedList => self.render_list(elem, true, out),
            NodeKind::Image => {
                if let Some(src) = elem.attr("src") {
                    out.push_str("![");
                    out.push_str(elem.attr("alt").unwrap_or_default());
                    out.push_str("](");
                    out.push_str(src);
                    out.push(')');
                }
            }
            NodeKind::Div => {
                self.render_nodes(&elem.children, out);
                out.push('\n');
            }
            NodeKind::Span => self.render_nodes(&elem.children, out),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::HorizontalRule => out.push_str("\n---\n"),
        }
    }

    fn render_enclosed(&self, elem: &Element, mark: &str, out: &mut String) {
        out.push_str(mark);
        self.render_nodes(&elem.children, out);
        out.push_str(mark);
    }

    /// Only `<li>` children become items; anything else directly inside the
    /// list is dropped. Numbering ignores `start` and `value` attributes.
    fn render_list(&self, elem: &Element, ordered: bool, out: &mut String) {
        out.push('\n');
        let items = elem.children.iter().filter_map(|child| match child {
            HtmlNode::Element(item) if item.tag == "li" => Some(item),
            _ => None,
        });

        for (idx, item) in items.enumerate() {
            let mut inner = String::new();
            self.render_nodes(&item.children, &mut inner);

            if ordered {
                out.push_str(&format!("{}. ", idx + 1));
            } else {
                out.push_str("- ");
            }
            out.push_str(&indent_continuation(inner.trim()));
            out.push('\n');
        }
        out.push('\n');
    }
}

/// Indent every line after the first by two spaces so nested blocks stay
/// attached to their list item.
fn indent_continuation(text: &str) -> String {
    let mut lines = text.split('\n');
    let mut result = lines.next().unwrap_or_default().to_string();
    for line in lines {
        result.push('\n');
        if !line.is_empty() {
            result.push_str("  ");
            result.push_str(line);
        }
    }
    result
}

/// Collapse runs of three or more newlines to two and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut newlines = 0;

    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                result.push(ch);
            }
        } else {
            newlines = 0;
            result.push(ch);
        }
    }

    result.trim().to_string()
}
