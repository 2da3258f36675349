use super::html::{escape_attr, parse_tag};
use super::{normalize, Inline};
use std::collections::HashSet;

/// Characters a backslash escapes.
const ESCAPABLE: &[char] = &['\\', '*', '[', ']', '(', ')', '<', '>', '_', '`'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Closer {
    Bold,
    Italic,
    LinkText,
    Tag(&'static str),
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Positions already known not to close, so backtracking stays linear
    failed: HashSet<(usize, Closer)>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, failed: HashSet::new() }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Parse until `closer` is consumed. Without a closer, parse to the end.
    /// Returns `None` when the closer never shows up.
    fn parse_inlines(&mut self, closer: Option<Closer>) -> Option<Vec<Inline>> {
        let start = self.pos;
        if let Some(closer) = closer {
            if self.failed.contains(&(start, closer)) {
                return None;
            }
        }

        let mut nodes = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.rest().chars().next() {
            if let Some(closer) = closer {
                if self.try_close(closer) {
                    flush(&mut text, &mut nodes);
                    return Some(nodes);
                }
            }

            let node = match c {
                '\\' => {
                    self.pos += 1;
                    match self.rest().chars().next() {
                        Some(next) if ESCAPABLE.contains(&next) => {
                            text.push(next);
                            self.pos += next.len_utf8();
                        }
                        _ => text.push('\\'),
                    }
                    continue;
                }
                '\r' => {
                    self.pos += 1;
                    continue;
                }
                '\n' => {
                    self.pos += 1;
                    Some(Inline::LineBreak)
                }
                '*' => self.emphasis(),
                '[' => self.link(),
                '<' => self.inline_tag(),
                _ => None,
            };

            match node {
                Some(node) => {
                    flush(&mut text, &mut nodes);
                    nodes.push(node);
                }
                None => {
                    text.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        match closer {
            Some(closer) => {
                self.failed.insert((start, closer));
                self.pos = start;
                None
            }
            None => {
                flush(&mut text, &mut nodes);
                Some(nodes)
            }
        }
    }

    fn try_close(&mut self, closer: Closer) -> bool {
        let rest = self.rest();
        let len = match closer {
            Closer::Bold if rest.starts_with("**") => 2,
            Closer::Italic if rest.starts_with('*') => {
                let run = rest.chars().take_while(|&c| c == '*').count();
                // `**` followed by another `**` opens bold instead
                if run == 2 && rest[2..].contains("**") {
                    return false;
                }
                1
            }
            Closer::LinkText if rest.starts_with(']') => 1,
            Closer::Tag(name) if rest.starts_with("</") => match parse_tag(rest) {
                Some((tag, len)) if tag.closing && tag.name == name => len,
                _ => return false,
            },
            _ => return false,
        };
        self.pos += len;
        true
    }

    /// Run `f` after advancing past an opener, rewinding when it fails or
    /// yields nothing.
    fn attempt(
        &mut self,
        skip: usize,
        f: impl FnOnce(&mut Self) -> Option<Inline>,
    ) -> Option<Inline> {
        let start = self.pos;
        self.pos += skip;
        match f(self) {
            Some(node) if node.children().map_or(true, |c| !c.is_empty()) => Some(node),
            _ => {
                self.pos = start;
                None
            }
        }
    }

    fn emphasis(&mut self) -> Option<Inline> {
        if self.rest().starts_with("**") {
            let bold = self.attempt(2, |p| p.parse_inlines(Some(Closer::Bold)).map(Inline::Bold));
            if bold.is_some() {
                return bold;
            }
        }
        self.attempt(1, |p| p.parse_inlines(Some(Closer::Italic)).map(Inline::Italic))
    }

    fn link(&mut self) -> Option<Inline> {
        self.attempt(1, |p| {
            let children = p.parse_inlines(Some(Closer::LinkText))?;
            let rest = p.rest().strip_prefix('(')?;
            let end = rest.find(|c: char| c == ')' || c == '\n')?;
            if !rest[end..].starts_with(')') {
                return None;
            }
            let href = rest[..end].trim().to_string();
            if href.is_empty() {
                return None;
            }
            p.pos += end + 2;
            Some(Inline::Link { href, children })
        })
    }

    fn inline_tag(&mut self) -> Option<Inline> {
        let (tag, len) = parse_tag(self.rest())?;
        if tag.closing {
            return None;
        }
        match tag.name.as_str() {
            "br" => {
                self.pos += len;
                Some(Inline::LineBreak)
            }
            _ if tag.self_closing => None,
            "u" => self.attempt(len, |p| {
                p.parse_inlines(Some(Closer::Tag("u"))).map(Inline::Underline)
            }),
            "span" => {
                let style = tag.attr("style")?.trim().to_string();
                if style.is_empty() {
                    return None;
                }
                self.attempt(len, |p| {
                    p.parse_inlines(Some(Closer::Tag("span")))
                        .map(|children| Inline::Span { style, children })
                })
            }
            _ => None,
        }
    }
}

fn flush(text: &mut String, nodes: &mut Vec<Inline>) {
    if !text.is_empty() {
        nodes.push(Inline::Text(std::mem::take(text)));
    }
}

/// Parse the stored footer markdown: `**bold**`, `*italic*`, `<u>`,
/// `[text](url)`, `<span style>` and newlines. Anything that does not form
/// a complete construct is kept as literal text.
pub fn parse(source: &str) -> Vec<Inline> {
    let mut parser = Parser::new(source);
    normalize(parser.parse_inlines(None).unwrap_or_default())
}

/// Serialize inline nodes as footer markdown.
pub fn write(nodes: &[Inline]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[Inline], out: &mut String) {
    for node in nodes {
        match node {
            Inline::Text(text) => escape_into(text, out),
            Inline::LineBreak => out.push('\n'),
            Inline::Bold(children) => wrap(out, "**", children, "**"),
            Inline::Italic(children) => wrap(out, "*", children, "*"),
            Inline::Underline(children) => wrap(out, "<u>", children, "</u>"),
            Inline::Link { href, children } => {
                let href: String = href.chars().filter(|c| *c != '\n' && *c != '\r').collect();
                let close = format!("]({})", href.replace(')', "%29"));
                wrap(out, "[", children, &close);
            }
            Inline::Span { style, children } => {
                let open = format!("<span style=\"{}\">", escape_attr(style));
                wrap(out, &open, children, "</span>");
            }
        }
    }
}

fn wrap(out: &mut String, open: &str, children: &[Inline], close: &str) {
    out.push_str(open);
    write_nodes(children, out);
    out.push_str(close);
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
}
