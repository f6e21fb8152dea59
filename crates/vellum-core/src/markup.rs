//! The serialized representation exchanged with the host application: a
//! markup string over the fixed block/inline tag set. The writer and reader
//! are not a general HTML engine; they cover exactly the node set this
//! editor produces and read the common aliases for it. Reloading a written
//! string reproduces a structurally identical tree; byte-for-byte equality
//! of the string itself is not promised.

use serde_json::Value;

use crate::core::{Attrs, Document, ElementNode, Marks, Node, TextNode, VoidNode};
use crate::plugin::{
    MAX_HEADING_LEVEL, MIN_HEADING_LEVEL, TABLE_CELL_BORDER, TABLE_CELL_PADDING,
};

/// Links always open in a new tab.
pub const LINK_TARGET: &str = "_blank";
/// Fixed rel so opened pages cannot reach back into the opener.
pub const LINK_REL: &str = "noopener noreferrer";

#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("unterminated tag at byte {0}")]
    UnterminatedTag(usize),
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),
    #[error("unterminated attribute value at byte {0}")]
    UnterminatedAttribute(usize),
}

pub fn to_markup(doc: &Document) -> String {
    let mut out = String::new();
    write_blocks(&doc.children, &mut out);
    out
}

pub fn parse_markup(input: &str) -> Result<Document, MarkupError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, ix: 0 };
    let children = parser.parse_blocks(None);
    Ok(Document { children })
}

fn write_blocks(children: &[Node], out: &mut String) {
    let mut ix = 0usize;
    while ix < children.len() {
        let node = &children[ix];
        match node {
            Node::Element(el) if el.kind == "list_item" => {
                let list_type = list_type_of(el);
                let tag = if list_type == "ordered" { "ol" } else { "ul" };
                out.push('<');
                out.push_str(tag);
                out.push('>');
                while ix < children.len() {
                    let Node::Element(item) = &children[ix] else {
                        break;
                    };
                    if item.kind != "list_item" || list_type_of(item) != list_type {
                        break;
                    }
                    out.push_str("<li>");
                    write_inlines(&item.children, out);
                    out.push_str("</li>");
                    ix += 1;
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            _ => {
                write_block(node, out);
                ix += 1;
            }
        }
    }
}

fn list_type_of(el: &ElementNode) -> String {
    el.attrs
        .get("list_type")
        .and_then(|v| v.as_str())
        .unwrap_or("bulleted")
        .to_string()
}

fn write_block(node: &Node, out: &mut String) {
    match node {
        Node::Element(el) => match el.kind.as_str() {
            "paragraph" => {
                out.push_str("<p>");
                write_inlines(&el.children, out);
                out.push_str("</p>");
            }
            "heading" => {
                let level = el
                    .attrs
                    .get("level")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(MIN_HEADING_LEVEL)
                    .clamp(MIN_HEADING_LEVEL, MAX_HEADING_LEVEL);
                let tag = if level == 1 { "h1" } else { "h2" };
                out.push('<');
                out.push_str(tag);
                out.push('>');
                write_inlines(&el.children, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            "list_item" => {
                // A lone item outside a run still serializes as a one-item list.
                let tag = if list_type_of(el) == "ordered" {
                    "ol"
                } else {
                    "ul"
                };
                out.push('<');
                out.push_str(tag);
                out.push_str("><li>");
                write_inlines(&el.children, out);
                out.push_str("</li></");
                out.push_str(tag);
                out.push('>');
            }
            "blockquote" => {
                out.push_str("<blockquote>");
                write_blocks(&el.children, out);
                out.push_str("</blockquote>");
            }
            "code_block" => {
                out.push_str("<pre><code>");
                for child in &el.children {
                    if let Node::Text(t) = child {
                        push_escaped_text(&t.text, out);
                    }
                }
                out.push_str("</code></pre>");
            }
            "table" => {
                let header = el
                    .attrs
                    .get("header")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                out.push_str("<table>");
                for (row_ix, row) in el.children.iter().enumerate() {
                    let Node::Element(row) = row else {
                        continue;
                    };
                    if row.kind != "table_row" {
                        continue;
                    }
                    out.push_str("<tr>");
                    let cell_tag = if header && row_ix == 0 { "th" } else { "td" };
                    for cell in &row.children {
                        let Node::Element(cell) = cell else {
                            continue;
                        };
                        if cell.kind != "table_cell" {
                            continue;
                        }
                        out.push('<');
                        out.push_str(cell_tag);
                        out.push_str(" style=\"border:");
                        out.push_str(TABLE_CELL_BORDER);
                        out.push_str(";padding:");
                        out.push_str(TABLE_CELL_PADDING);
                        out.push_str("\">");
                        write_blocks(&cell.children, out);
                        out.push_str("</");
                        out.push_str(cell_tag);
                        out.push('>');
                    }
                    out.push_str("</tr>");
                }
                out.push_str("</table>");
            }
            _ => {
                // Unknown container kinds serialize through their children.
                write_blocks(&el.children, out);
            }
        },
        Node::Void(v) if v.kind == "image" => {
            out.push_str("<img");
            for key in ["src", "alt", "width", "height"] {
                if let Some(value) = v.attrs.get(key).and_then(|v| v.as_str()) {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    push_escaped_attr(value, out);
                    out.push('"');
                }
            }
            out.push('>');
        }
        Node::Void(_) => {}
        Node::Text(t) => {
            // A bare text leaf at block level becomes a paragraph.
            out.push_str("<p>");
            write_text_run(t, out);
            out.push_str("</p>");
        }
    }
}

fn write_inlines(children: &[Node], out: &mut String) {
    let mut ix = 0usize;
    while ix < children.len() {
        match &children[ix] {
            Node::Text(t) => match t.marks.link.as_deref() {
                Some(href) => {
                    out.push_str("<a href=\"");
                    push_escaped_attr(href, out);
                    out.push_str("\" target=\"");
                    out.push_str(LINK_TARGET);
                    out.push_str("\" rel=\"");
                    out.push_str(LINK_REL);
                    out.push_str("\">");
                    // Adjacent runs sharing the href collapse into one anchor.
                    while ix < children.len() {
                        let Node::Text(t) = &children[ix] else {
                            break;
                        };
                        if t.marks.link.as_deref() != Some(href) {
                            break;
                        }
                        write_text_run(t, out);
                        ix += 1;
                    }
                    out.push_str("</a>");
                }
                None => {
                    write_text_run(t, out);
                    ix += 1;
                }
            },
            Node::Void(v) if v.kind == "image" => {
                write_block(&Node::Void(v.clone()), out);
                ix += 1;
            }
            _ => {
                ix += 1;
            }
        }
    }
}

fn write_text_run(t: &TextNode, out: &mut String) {
    if t.text.is_empty() {
        return;
    }

    let mut open: Vec<&str> = Vec::new();
    if t.marks.bold {
        open.push("strong");
    }
    if t.marks.italic {
        open.push("em");
    }
    if t.marks.underline {
        open.push("u");
    }
    if t.marks.strikethrough {
        open.push("s");
    }

    for tag in &open {
        out.push('<');
        out.push_str(tag);
        out.push('>');
    }
    push_escaped_text(&t.text, out);
    for tag in open.iter().rev() {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

fn push_escaped_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn push_escaped_attr(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
    },
    EndTag {
        name: String,
    },
    Text(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, MarkupError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut ix = 0usize;
    let mut text_start = 0usize;

    while ix < bytes.len() {
        if bytes[ix] != b'<' {
            ix += 1;
            continue;
        }

        let rest = &bytes[ix + 1..];
        let is_tag_start = matches!(rest.first(), Some(c) if c.is_ascii_alphabetic() || *c == b'/' || *c == b'!');
        if !is_tag_start {
            // A stray '<' is literal text.
            ix += 1;
            continue;
        }

        if text_start < ix {
            push_text_token(&input[text_start..ix], &mut tokens);
        }

        if rest.starts_with(b"!--") {
            let Some(end) = find_subslice(&bytes[ix + 4..], b"-->") else {
                return Err(MarkupError::UnterminatedComment(ix));
            };
            ix = ix + 4 + end + 3;
            text_start = ix;
            continue;
        }
        if rest.first() == Some(&b'!') {
            // Doctype or similar; skip to the closing angle bracket.
            let Some(end) = bytes[ix..].iter().position(|&b| b == b'>') else {
                return Err(MarkupError::UnterminatedTag(ix));
            };
            ix += end + 1;
            text_start = ix;
            continue;
        }

        let tag_start = ix;
        ix += 1;
        let closing = bytes.get(ix) == Some(&b'/');
        if closing {
            ix += 1;
        }

        let name_start = ix;
        while ix < bytes.len() && (bytes[ix].is_ascii_alphanumeric() || bytes[ix] == b'-') {
            ix += 1;
        }
        let name = input[name_start..ix].to_ascii_lowercase();

        let mut attrs: Vec<(String, String)> = Vec::new();
        loop {
            while ix < bytes.len() && bytes[ix].is_ascii_whitespace() {
                ix += 1;
            }
            if ix >= bytes.len() {
                return Err(MarkupError::UnterminatedTag(tag_start));
            }
            if bytes[ix] == b'>' {
                ix += 1;
                break;
            }
            if bytes[ix] == b'/' {
                ix += 1;
                continue;
            }

            let attr_start = ix;
            while ix < bytes.len()
                && !bytes[ix].is_ascii_whitespace()
                && bytes[ix] != b'='
                && bytes[ix] != b'>'
                && bytes[ix] != b'/'
            {
                ix += 1;
            }
            if ix >= bytes.len() {
                return Err(MarkupError::UnterminatedTag(tag_start));
            }
            let attr_name = input[attr_start..ix].to_ascii_lowercase();

            while ix < bytes.len() && bytes[ix].is_ascii_whitespace() {
                ix += 1;
            }
            let mut attr_value = String::new();
            if bytes.get(ix) == Some(&b'=') {
                ix += 1;
                while ix < bytes.len() && bytes[ix].is_ascii_whitespace() {
                    ix += 1;
                }
                match bytes.get(ix) {
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        ix += 1;
                        let value_start = ix;
                        while ix < bytes.len() && bytes[ix] != quote {
                            ix += 1;
                        }
                        if ix >= bytes.len() {
                            return Err(MarkupError::UnterminatedAttribute(tag_start));
                        }
                        attr_value = decode_entities(&input[value_start..ix]);
                        ix += 1;
                    }
                    Some(_) => {
                        let value_start = ix;
                        while ix < bytes.len()
                            && !bytes[ix].is_ascii_whitespace()
                            && bytes[ix] != b'>'
                        {
                            ix += 1;
                        }
                        attr_value = decode_entities(&input[value_start..ix]);
                    }
                    None => return Err(MarkupError::UnterminatedTag(tag_start)),
                }
            }
            if !attr_name.is_empty() {
                attrs.push((attr_name, attr_value));
            }
        }

        if !name.is_empty() {
            if closing {
                tokens.push(Token::EndTag { name });
            } else {
                tokens.push(Token::StartTag { name, attrs });
            }
        }
        text_start = ix;
    }

    if text_start < input.len() {
        push_text_token(&input[text_start..], &mut tokens);
    }

    Ok(tokens)
}

fn push_text_token(raw: &str, tokens: &mut Vec<Token>) {
    let decoded = decode_entities(raw);
    if decoded.is_empty() {
        return;
    }
    tokens.push(Token::Text(decoded));
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&ix| &haystack[ix..ix + needle.len()] == needle)
}

fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();

    while let Some((ix, ch)) = chars.next() {
        if ch != '&' {
            out.push(ch);
            continue;
        }

        let rest = &raw[ix + 1..];
        let Some(end) = rest.find(';').filter(|&e| e <= 10) else {
            out.push('&');
            continue;
        };
        let entity = &rest[..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| {
                    entity
                        .strip_prefix('#')
                        .and_then(|dec| dec.parse::<u32>().ok())
                })
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                for _ in 0..=end {
                    chars.next();
                }
            }
            None => out.push('&'),
        }
    }

    out
}

struct Parser {
    tokens: Vec<Token>,
    ix: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.ix)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.ix).cloned();
        if token.is_some() {
            self.ix += 1;
        }
        token
    }

    /// Parse a run of blocks until `stop` (an end tag name) or end of input.
    fn parse_blocks(&mut self, stop: Option<&str>) -> Vec<Node> {
        let mut blocks: Vec<Node> = Vec::new();
        let mut pending_inlines: Vec<Node> = Vec::new();
        let mut lifted: Vec<Node> = Vec::new();

        loop {
            let Some(token) = self.peek().cloned() else {
                break;
            };

            match token {
                Token::Text(text) => {
                    self.next();
                    if text.trim().is_empty() && pending_inlines.is_empty() {
                        continue;
                    }
                    pending_inlines.push(Node::Text(TextNode {
                        text,
                        marks: Marks::default(),
                    }));
                }
                Token::EndTag { name } => {
                    if Some(name.as_str()) == stop {
                        self.next();
                        break;
                    }
                    // Unmatched end tag; skip it.
                    self.next();
                }
                Token::StartTag { name, attrs } => match name.as_str() {
                    "p" => {
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        self.next();
                        let inlines = self.parse_inline_flow("p", &Marks::default(), &mut lifted);
                        blocks.push(element("paragraph", Attrs::default(), with_text_leaf(inlines)));
                        blocks.append(&mut lifted);
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        self.next();
                        let level = name[1..]
                            .parse::<u64>()
                            .unwrap_or(MIN_HEADING_LEVEL)
                            .clamp(MIN_HEADING_LEVEL, MAX_HEADING_LEVEL);
                        let inlines = self.parse_inline_flow(&name, &Marks::default(), &mut lifted);
                        let mut heading_attrs = Attrs::default();
                        heading_attrs.insert(
                            "level".to_string(),
                            Value::Number(serde_json::Number::from(level)),
                        );
                        blocks.push(element("heading", heading_attrs, with_text_leaf(inlines)));
                        blocks.append(&mut lifted);
                    }
                    "ul" | "ol" => {
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        self.next();
                        let list_type = if name == "ol" { "ordered" } else { "bulleted" };
                        self.parse_list_items(&name, list_type, &mut blocks, &mut lifted);
                    }
                    "blockquote" => {
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        self.next();
                        let children = self.parse_blocks(Some("blockquote"));
                        blocks.push(element("blockquote", Attrs::default(), children));
                    }
                    "pre" => {
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        self.next();
                        blocks.push(self.parse_code_block());
                    }
                    "table" => {
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        self.next();
                        blocks.push(self.parse_table());
                    }
                    "img" => {
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        self.next();
                        if let Some(image) = image_from_attrs(&attrs) {
                            blocks.push(image);
                        }
                    }
                    "br" => {
                        self.next();
                        pending_inlines.push(Node::Text(TextNode {
                            text: "\n".to_string(),
                            marks: Marks::default(),
                        }));
                    }
                    "strong" | "b" | "em" | "i" | "u" | "s" | "del" | "strike" | "a" | "code"
                    | "span" => {
                        // Inline content at block level starts an implicit paragraph.
                        self.next();
                        let marks = marks_for_tag(&name, &attrs, &Marks::default());
                        let inlines = self.parse_inline_flow(&name, &marks, &mut lifted);
                        pending_inlines.extend(inlines);
                    }
                    _ => {
                        // Unknown container; read through it transparently.
                        self.next();
                        let children = self.parse_blocks(Some(name.as_str()));
                        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
                        blocks.extend(children);
                    }
                },
            }
        }

        flush_paragraph(&mut blocks, &mut pending_inlines, &mut lifted);
        blocks
    }

    /// Parse text runs until the end tag named `stop`, applying `marks` to
    /// every run produced. Block-level images found inline are moved into
    /// `lifted` so the caller can reattach them after the enclosing block.
    fn parse_inline_flow(&mut self, stop: &str, marks: &Marks, lifted: &mut Vec<Node>) -> Vec<Node> {
        let mut runs: Vec<Node> = Vec::new();

        loop {
            let Some(token) = self.next() else {
                break;
            };

            match token {
                Token::Text(text) => {
                    runs.push(Node::Text(TextNode {
                        text,
                        marks: marks.clone(),
                    }));
                }
                Token::EndTag { name } => {
                    if name == stop {
                        break;
                    }
                    // Unbalanced inline end tag; ignore.
                }
                Token::StartTag { name, attrs } => match name.as_str() {
                    "strong" | "b" | "em" | "i" | "u" | "s" | "del" | "strike" | "a" | "code"
                    | "span" => {
                        let inner = marks_for_tag(&name, &attrs, marks);
                        runs.extend(self.parse_inline_flow(&name, &inner, lifted));
                    }
                    "img" => {
                        if let Some(image) = image_from_attrs(&attrs) {
                            lifted.push(image);
                        }
                    }
                    "br" => {
                        runs.push(Node::Text(TextNode {
                            text: "\n".to_string(),
                            marks: marks.clone(),
                        }));
                    }
                    _ => {
                        // A block tag inside inline flow: flatten its text.
                        runs.extend(self.parse_inline_flow(&name, marks, lifted));
                    }
                },
            }
        }

        runs
    }

    fn parse_list_items(
        &mut self,
        stop: &str,
        list_type: &str,
        blocks: &mut Vec<Node>,
        lifted: &mut Vec<Node>,
    ) {
        loop {
            let Some(token) = self.next() else {
                break;
            };

            match token {
                Token::EndTag { name } if name == stop => break,
                Token::StartTag { name, .. } if name == "li" => {
                    let inlines = self.parse_inline_flow("li", &Marks::default(), lifted);
                    let mut attrs = Attrs::default();
                    attrs.insert(
                        "list_type".to_string(),
                        Value::String(list_type.to_string()),
                    );
                    blocks.push(element("list_item", attrs, with_text_leaf(inlines)));
                    blocks.append(lifted);
                }
                _ => {}
            }
        }
    }

    fn parse_code_block(&mut self) -> Node {
        let mut text = String::new();

        loop {
            let Some(token) = self.next() else {
                break;
            };

            match token {
                Token::EndTag { name } if name == "pre" => break,
                Token::Text(t) => text.push_str(&t),
                Token::StartTag { name, .. } if name == "br" => text.push('\n'),
                _ => {}
            }
        }

        element(
            "code_block",
            Attrs::default(),
            vec![Node::Text(TextNode {
                text,
                marks: Marks::default(),
            })],
        )
    }

    fn parse_table(&mut self) -> Node {
        let mut rows: Vec<Node> = Vec::new();
        let mut header = false;

        loop {
            let Some(token) = self.next() else {
                break;
            };

            match token {
                Token::EndTag { name } if name == "table" => break,
                Token::StartTag { name, .. } if name == "tr" => {
                    let (row, has_header_cells) = self.parse_table_row();
                    if rows.is_empty() && has_header_cells {
                        header = true;
                    }
                    rows.push(row);
                }
                // thead/tbody/tfoot wrappers are read through transparently.
                _ => {}
            }
        }

        let mut attrs = Attrs::default();
        if header {
            attrs.insert("header".to_string(), Value::Bool(true));
        }
        Node::Element(ElementNode {
            kind: "table".to_string(),
            attrs,
            children: rows,
        })
    }

    fn parse_table_row(&mut self) -> (Node, bool) {
        let mut cells: Vec<Node> = Vec::new();
        let mut has_header_cells = false;

        loop {
            let Some(token) = self.peek().cloned() else {
                break;
            };

            match token {
                Token::EndTag { name } if name == "tr" => {
                    self.next();
                    break;
                }
                Token::StartTag { name, .. } if name == "td" || name == "th" => {
                    self.next();
                    if name == "th" {
                        has_header_cells = true;
                    }
                    let children = self.parse_blocks(Some(name.as_str()));
                    let mut attrs = Attrs::default();
                    attrs.insert(
                        "border".to_string(),
                        Value::String(TABLE_CELL_BORDER.to_string()),
                    );
                    attrs.insert(
                        "padding".to_string(),
                        Value::String(TABLE_CELL_PADDING.to_string()),
                    );
                    cells.push(Node::Element(ElementNode {
                        kind: "table_cell".to_string(),
                        attrs,
                        children,
                    }));
                }
                Token::EndTag { name } if name == "table" => break,
                _ => {
                    self.next();
                }
            }
        }

        (
            Node::Element(ElementNode {
                kind: "table_row".to_string(),
                attrs: Attrs::default(),
                children: cells,
            }),
            has_header_cells,
        )
    }
}

fn flush_paragraph(blocks: &mut Vec<Node>, pending_inlines: &mut Vec<Node>, lifted: &mut Vec<Node>) {
    if !pending_inlines.is_empty() {
        let inlines = std::mem::take(pending_inlines);
        let meaningful = inlines.iter().any(|n| match n {
            Node::Text(t) => !t.text.trim().is_empty(),
            _ => true,
        });
        if meaningful {
            blocks.push(element("paragraph", Attrs::default(), inlines));
        }
    }
    blocks.append(lifted);
}

/// Inline-only blocks always hold at least one text leaf.
fn with_text_leaf(inlines: Vec<Node>) -> Vec<Node> {
    if inlines.is_empty() {
        return vec![Node::Text(TextNode {
            text: String::new(),
            marks: Marks::default(),
        })];
    }
    inlines
}

fn element(kind: &str, attrs: Attrs, children: Vec<Node>) -> Node {
    Node::Element(ElementNode {
        kind: kind.to_string(),
        attrs,
        children,
    })
}

fn marks_for_tag(name: &str, attrs: &[(String, String)], base: &Marks) -> Marks {
    let mut marks = base.clone();
    match name {
        "strong" | "b" => marks.bold = true,
        "em" | "i" => marks.italic = true,
        "u" => marks.underline = true,
        "s" | "del" | "strike" => marks.strikethrough = true,
        "a" => {
            let href = attrs
                .iter()
                .find(|(k, _)| k == "href")
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty());
            if href.is_some() {
                marks.link = href;
            }
        }
        _ => {}
    }
    marks
}

fn image_from_attrs(attrs: &[(String, String)]) -> Option<Node> {
    let get = |key: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.to_string())
    };

    let src = get("src").filter(|s| !s.trim().is_empty())?;
    let mut node_attrs = Attrs::default();
    node_attrs.insert("src".to_string(), Value::String(src));
    for key in ["alt", "width", "height"] {
        if let Some(value) = get(key) {
            node_attrs.insert(key.to_string(), Value::String(value));
        }
    }

    Some(Node::Void(VoidNode {
        kind: "image".to_string(),
        attrs: node_attrs,
    }))
}
