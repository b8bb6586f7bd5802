use log::trace;

/// A node of the minimal tag tree built by [`parse_html`].
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlNode {
    Element(Element),
    /// Raw text, entities still encoded.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lower-cased tag name.
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<HtmlNode>,
    /// False when the element was still open at end of input or was
    /// implicitly closed by an end tag of an ancestor.
    pub closed: bool,
}

impl Element {
    fn open(tag: String, attrs: Vec<Attr>) -> Self {
        Self {
            tag,
            attrs,
            children: Vec::new(),
            closed: false,
        }
    }

    /// Value of the first attribute called `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }
}

/// Parse HTML into a forest of [`HtmlNode`]s. Never fails: anything that does
/// not tokenize as markup is kept as text.
pub fn parse_html(html: &str) -> Vec<HtmlNode> {
    TreeBuilder::new(html).build()
}

/// Open elements allowed on the stack. Rendering and dropping the tree both
/// recurse once per level.
pub const MAX_DEPTH: usize = 256;

struct StartTag {
    name: String,
    attrs: Vec<Attr>,
    self_closing: bool,
    /// Byte offset just past the closing `>`.
    end: usize,
}

struct TreeBuilder<'a> {
    input: &'a str,
    pos: usize,
    stack: Vec<Element>,
    root: Vec<HtmlNode>,
}

impl<'a> TreeBuilder<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    fn build(mut self) -> Vec<HtmlNode> {
        while self.pos < self.input.len() {
            self.step();
        }

        while let Some(elem) = self.stack.pop() {
            trace!("Element <{}> left open at end of input", elem.tag);
            self.add_node(HtmlNode::Element(elem));
        }
        self.root
    }

    fn step(&mut self) {
        let input = self.input;
        let rest = &input[self.pos..];
        let Some(lt) = rest.find('<') else {
            self.push_text(rest);
            self.pos = self.input.len();
            return;
        };

        if lt > 0 {
            self.push_text(&rest[..lt]);
            self.pos += lt;
        }

        let markup = &input[self.pos..];
        if markup.starts_with("<!--") {
            self.skip_comment();
        } else if markup.starts_with("<!") || markup.starts_with("<?") {
            self.skip_past_gt();
        } else if markup.starts_with("</") {
            self.parse_end_tag();
        } else if markup[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            match parse_start_tag(self.input, self.pos) {
                Some(tag) => self.handle_start_tag(tag),
                // e.g. an attribute quote that is never closed
                None => self.skip_past_gt(),
            }
        } else {
            self.skip_past_gt();
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // Merge with a preceding text node so a literal `<` does not split runs.
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        if let Some(HtmlNode::Text(previous)) = siblings.last_mut() {
            previous.push_str(text);
        } else {
            siblings.push(HtmlNode::Text(text.to_string()));
        }
    }

    fn push_literal_lt(&mut self) {
        self.push_text("<");
        self.pos += 1;
    }

    fn skip_comment(&mut self) {
        let body_start = self.pos + 4;
        match self.input[body_start..].find("-->") {
            Some(end) => self.pos = body_start + end + 3,
            None => self.skip_past_gt(),
        }
    }

    /// Drop everything up to and including the next `>`; a `<` with no `>`
    /// after it is plain text.
    fn skip_past_gt(&mut self) {
        match self.input[self.pos..].find('>') {
            Some(gt) => self.pos += gt + 1,
            None => self.push_literal_lt(),
        }
    }

    fn parse_end_tag(&mut self) {
        let Some(gt) = self.input[self.pos..].find('>') else {
            self.push_literal_lt();
            return;
        };
        let inner = &self.input[self.pos + 2..self.pos + gt];
        let name = inner
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        self.pos += gt + 1;
        self.close_element(&name);
    }

    fn handle_start_tag(&mut self, tag: StartTag) {
        self.pos = tag.end;

        if tag.name == "li" {
            self.close_open_list_item();
        }

        let mut elem = Element::open(tag.name, tag.attrs);
        if is_void_element(&elem.tag) || tag.self_closing {
            elem.closed = true;
            self.add_node(HtmlNode::Element(elem));
        } else if is_raw_text_element(&elem.tag) {
            self.read_raw_text(elem);
        } else if self.stack.len() >= MAX_DEPTH {
            // Too deep to render recursively: drop the markup, keep the content.
            trace!("Dropping <{}> nested deeper than {} levels", elem.tag, MAX_DEPTH);
        } else {
            self.stack.push(elem);
        }
    }

    /// `script`/`style` bodies become a single text child with any `<...>`
    /// spans inside them removed.
    fn read_raw_text(&mut self, mut elem: Element) {
        let close = format!("</{}", elem.tag);
        let input = self.input;
        let rest = &input[self.pos..];
        let lower = rest.to_ascii_lowercase();

        let (body, next_pos, closed) = match lower.find(&close) {
            Some(start) => {
                let end = lower[start..]
                    .find('>')
                    .map(|gt| start + gt + 1)
                    .unwrap_or(rest.len());
                (&rest[..start], self.pos + end, true)
            }
            None => (rest, self.input.len(), false),
        };

        let body = strip_tag_spans(body);
        if !body.is_empty() {
            elem.children.push(HtmlNode::Text(body));
        }
        elem.closed = closed;
        self.pos = next_pos;
        self.add_node(HtmlNode::Element(elem));
    }

    /// A new `<li>` ends a still-open item of the same list.
    fn close_open_list_item(&mut self) {
        let Some(idx) = self
            .stack
            .iter()
            .rposition(|e| matches!(e.tag.as_str(), "li" | "ul" | "ol"))
        else {
            return;
        };
        if self.stack[idx].tag == "li" {
            self.close_element_at(idx);
        }
    }

    fn close_element(&mut self, tag: &str) {
        match self.stack.iter().rposition(|e| e.tag == tag) {
            Some(idx) => self.close_element_at(idx),
            None => trace!("Dropping stray end tag </{}>", tag),
        }
    }

    /// Close the element at `idx`; everything opened above it ends unclosed.
    fn close_element_at(&mut self, idx: usize) {
        while self.stack.len() > idx + 1 {
            if let Some(orphan) = self.stack.pop() {
                self.add_node(HtmlNode::Element(orphan));
            }
        }
        if let Some(mut elem) = self.stack.pop() {
            elem.closed = true;
            self.add_node(HtmlNode::Element(elem));
        }
    }

    fn add_node(&mut self, node: HtmlNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }
}

/// Tokenize the start tag beginning at `start` (which points at `<`).
/// Returns `None` when the tag never reaches its closing `>`.
fn parse_start_tag(input: &str, start: usize) -> Option<StartTag> {
    let bytes = input.as_bytes();
    let mut pos = start + 1;

    let name_start = pos;
    while pos < bytes.len() && !is_name_terminator(bytes[pos]) {
        pos += 1;
    }
    let name = input[name_start..pos].to_ascii_lowercase();

    let mut attrs = Vec::new();
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => {
                return Some(StartTag {
                    name,
                    attrs,
                    self_closing: false,
                    end: pos + 1,
                });
            }
            b'/' => {
                pos += 1;
                if bytes.get(pos) == Some(&b'>') {
                    return Some(StartTag {
                        name,
                        attrs,
                        self_closing: true,
                        end: pos + 1,
                    });
                }
                continue;
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < bytes.len() && !is_name_terminator(bytes[pos]) && bytes[pos] != b'=' {
            pos += 1;
        }
        let attr_name = input[attr_start..pos].to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let mut value = String::new();
        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos)? {
                quote @ (b'"' | b'\'') => {
                    let value_start = pos + 1;
                    let len = input[value_start..].find(*quote as char)?;
                    value = input[value_start..value_start + len].to_string();
                    pos = value_start + len + 1;
                }
                _ => {
                    let value_start = pos;
                    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                        pos += 1;
                    }
                    value = input[value_start..pos].to_string();
                }
            }
        }

        if !attr_name.is_empty() {
            attrs.push(Attr {
                name: attr_name,
                value,
            });
        } else if pos == attr_start {
            // Stray character such as a lone quote; step over it.
            pos += 1;
        }
    }
}

/// Remove every `<...>` span; a `<` with no `>` after it stays.
fn strip_tag_spans(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        match rest[lt..].find('>') {
            Some(gt) => rest = &rest[lt + gt + 1..],
            None => {
                rest = &rest[lt..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_name_terminator(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == b'>' || byte == b'/'
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}
