//! Footer text conversion between the stored markdown subset and the
//! editor's rich-text HTML.
//!
//! Both directions parse into one inline tree and serialize from it, so a
//! document produced by the editor survives any number of round trips.

pub mod html;
pub mod markdown;

/// Visible characters the footer editor accepts.
pub const MAX_FOOTER_LEN: usize = 500;

/// Inline content of a footer document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    LineBreak,
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Underline(Vec<Inline>),
    Link { href: String, children: Vec<Inline> },
    Span { style: String, children: Vec<Inline> },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text(text.into())
    }

    pub fn children(&self) -> Option<&[Inline]> {
        match self {
            Inline::Bold(children)
            | Inline::Italic(children)
            | Inline::Underline(children)
            | Inline::Link { children, .. }
            | Inline::Span { children, .. } => Some(children),
            Inline::Text(_) | Inline::LineBreak => None,
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Inline::Bold(children)
            | Inline::Italic(children)
            | Inline::Underline(children)
            | Inline::Link { children, .. }
            | Inline::Span { children, .. } => Some(children),
            Inline::Text(_) | Inline::LineBreak => None,
        }
    }

    fn into_children(self) -> Vec<Inline> {
        match self {
            Inline::Bold(children)
            | Inline::Italic(children)
            | Inline::Underline(children)
            | Inline::Link { children, .. }
            | Inline::Span { children, .. } => children,
            other => vec![other],
        }
    }

    /// Same formatting with the same attributes.
    fn same_container(&self, other: &Inline) -> bool {
        match (self, other) {
            (Inline::Bold(_), Inline::Bold(_))
            | (Inline::Italic(_), Inline::Italic(_))
            | (Inline::Underline(_), Inline::Underline(_)) => true,
            (Inline::Link { href: a, .. }, Inline::Link { href: b, .. }) => a == b,
            (Inline::Span { style: a, .. }, Inline::Span { style: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// A parsed footer text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub nodes: Vec<Inline>,
}

impl Document {
    pub fn new(nodes: Vec<Inline>) -> Self {
        Self { nodes: normalize(nodes) }
    }

    pub fn from_markdown(source: &str) -> Self {
        Self { nodes: markdown::parse(source) }
    }

    pub fn from_html(source: &str) -> Self {
        Self { nodes: html::parse(source) }
    }

    pub fn to_markdown(&self) -> String {
        markdown::write(&self.nodes)
    }

    pub fn to_html(&self) -> String {
        html::write(&self.nodes)
    }

    /// Visible text, with line breaks as `\n`.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    /// Visible character count, as limited by the footer editor.
    pub fn text_len(&self) -> usize {
        self.plain_text().chars().count()
    }

    pub fn fits_footer(&self) -> bool {
        self.text_len() <= MAX_FOOTER_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Stored markdown to editor HTML.
pub fn to_rich_text(markdown: &str) -> String {
    Document::from_markdown(markdown).to_html()
}

/// Editor HTML to stored markdown. Unsupported tags are stripped.
pub fn to_markdown(html: &str) -> String {
    Document::from_html(html).to_markdown().trim().to_string()
}

fn collect_text(nodes: &[Inline], out: &mut String) {
    for node in nodes {
        match node {
            Inline::Text(text) => out.push_str(text),
            Inline::LineBreak => out.push('\n'),
            other => collect_text(other.children().unwrap_or_default(), out),
        }
    }
}

/// Canonical form: no empty text or empty formatting, adjacent text and
/// identical formatting merged, redundant nesting removed, and italic
/// wrapping only bold written as bold wrapping italic.
pub(crate) fn normalize(nodes: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            // A span without style carries nothing; keep its content
            Inline::Span { style, children } if style.trim().is_empty() => {
                for child in normalize(children) {
                    push_merged(&mut out, child);
                }
            }
            node => {
                if let Some(node) = normalize_node(node) {
                    push_merged(&mut out, node);
                }
            }
        }
    }
    out
}

fn normalize_node(node: Inline) -> Option<Inline> {
    let node = match node {
        Inline::Text(text) => return (!text.is_empty()).then_some(Inline::Text(text)),
        Inline::LineBreak => return Some(Inline::LineBreak),
        Inline::Bold(children) => {
            Inline::Bold(splice(normalize(children), |n| matches!(n, Inline::Bold(_))))
        }
        Inline::Italic(children) => {
            let children = splice(normalize(children), |n| matches!(n, Inline::Italic(_)));
            match <[Inline; 1]>::try_from(children) {
                Ok([Inline::Bold(inner)]) => Inline::Bold(normalize(vec![Inline::Italic(inner)])),
                Ok([only]) => Inline::Italic(vec![only]),
                Err(children) => Inline::Italic(children),
            }
        }
        Inline::Underline(children) => {
            Inline::Underline(splice(normalize(children), |n| matches!(n, Inline::Underline(_))))
        }
        Inline::Link { href, children } => Inline::Link {
            href: href.trim().to_string(),
            children: splice(normalize(children), |n| matches!(n, Inline::Link { .. })),
        },
        Inline::Span { style, children } => Inline::Span {
            style: style.trim().to_string(),
            children: normalize(children),
        },
    };

    match node.children() {
        Some(children) if children.is_empty() => None,
        _ => Some(node),
    }
}

/// Lift the children of nested nodes matching `nested` into the parent.
fn splice(children: Vec<Inline>, nested: impl Fn(&Inline) -> bool) -> Vec<Inline> {
    if !children.iter().any(&nested) {
        return children;
    }
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if nested(&child) {
            for inner in child.into_children() {
                push_merged(&mut out, inner);
            }
        } else {
            push_merged(&mut out, child);
        }
    }
    out
}

fn push_merged(out: &mut Vec<Inline>, node: Inline) {
    let mergeable = match (out.last(), &node) {
        (Some(Inline::Text(_)), Inline::Text(_)) => true,
        (Some(prev), node) => prev.same_container(node),
        (None, _) => false,
    };
    if !mergeable {
        out.push(node);
        return;
    }

    if let Some(prev) = out.last_mut() {
        match (prev, node) {
            (Inline::Text(prev), Inline::Text(text)) => prev.push_str(&text),
            (prev, node) => {
                if let Some(children) = prev.children_mut() {
                    children.extend(node.into_children());
                    *children = normalize(std::mem::take(children));
                }
            }
        }
    }
}
