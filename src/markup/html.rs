use super::{normalize, Inline};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref TAG_RE: Regex =
        Regex::new(r#"^<(/?)([A-Za-z][A-Za-z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
            .expect("Invalid tag pattern");
    static ref ATTR_RE: Regex = Regex::new(
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
    )
    .expect("Invalid attribute pattern");
    static ref ENTITY_RE: Regex =
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]+);")
            .expect("Invalid entity pattern");
}

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "tr",
];
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// A single start or end tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Lowercase tag name
    pub name: String,
    pub closing: bool,
    pub self_closing: bool,
    pub attrs: Vec<(String, String)>,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parse a tag at the start of `source`, returning it and its byte length.
pub fn parse_tag(source: &str) -> Option<(Tag, usize)> {
    let caps = TAG_RE.captures(source)?;
    let len = caps.get(0)?.end();

    let mut raw_attrs = caps.get(3).map_or("", |m| m.as_str()).trim_end();
    let self_closing = raw_attrs.ends_with('/');
    if self_closing {
        raw_attrs = &raw_attrs[..raw_attrs.len() - 1];
    }

    let attrs = ATTR_RE
        .captures_iter(raw_attrs)
        .map(|attr| {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map_or("", |m| m.as_str());
            (attr[1].to_ascii_lowercase(), decode_entities(value))
        })
        .collect();

    Some((
        Tag {
            name: caps[2].to_ascii_lowercase(),
            closing: &caps[1] == "/",
            self_closing,
            attrs,
        },
        len,
    ))
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "nbsp" => Some(' '),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[derive(Debug)]
enum Frame {
    Bold,
    Italic,
    Underline,
    Link(String),
    Span(String),
    /// Unsupported element, only its content is kept
    Transparent,
}

impl Frame {
    fn from_tag(tag: &Tag) -> Frame {
        match tag.name.as_str() {
            "strong" | "b" => Frame::Bold,
            "em" | "i" => Frame::Italic,
            "u" => Frame::Underline,
            "a" => match tag.attr("href") {
                Some(href) if !href.trim().is_empty() => Frame::Link(href.to_string()),
                _ => Frame::Transparent,
            },
            "span" => match tag.attr("style") {
                Some(style) if !style.trim().is_empty() => Frame::Span(style.to_string()),
                _ => Frame::Transparent,
            },
            _ => Frame::Transparent,
        }
    }

    fn close(self, children: Vec<Inline>) -> Vec<Inline> {
        match self {
            Frame::Bold => vec![Inline::Bold(children)],
            Frame::Italic => vec![Inline::Italic(children)],
            Frame::Underline => vec![Inline::Underline(children)],
            Frame::Link(href) => vec![Inline::Link { href, children }],
            Frame::Span(style) => vec![Inline::Span { style, children }],
            Frame::Transparent => children,
        }
    }
}

struct TreeBuilder {
    root: Vec<Inline>,
    open: Vec<(String, Frame, Vec<Inline>)>,
    at_line_start: bool,
}

impl TreeBuilder {
    fn new() -> Self {
        Self { root: Vec::new(), open: Vec::new(), at_line_start: true }
    }

    fn current(&mut self) -> &mut Vec<Inline> {
        match self.open.last_mut() {
            Some((_, _, children)) => children,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.soft_break();
            }
            let line = line.replace('\r', "");
            if !line.is_empty() {
                self.current().push(Inline::Text(decode_entities(&line)));
                self.at_line_start = false;
            }
        }
    }

    fn line_break(&mut self) {
        self.current().push(Inline::LineBreak);
        self.at_line_start = true;
    }

    /// Break unless already at the start of a line.
    fn soft_break(&mut self) {
        if !self.at_line_start {
            self.line_break();
        }
    }

    fn open(&mut self, tag: &Tag) {
        self.open.push((tag.name.clone(), Frame::from_tag(tag), Vec::new()));
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self.open.iter().rposition(|(open, _, _)| open == name) else {
            // Stray end tag
            return;
        };
        while self.open.len() > depth {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some((_, frame, children)) = self.open.pop() {
            let nodes = frame.close(children);
            self.current().extend(nodes);
        }
    }

    fn finish(mut self) -> Vec<Inline> {
        while !self.open.is_empty() {
            self.pop();
        }
        normalize(self.root)
    }
}

/// Parse editor HTML into inline nodes. Tags outside the supported set are
/// dropped but their text is kept; block elements become line breaks.
pub fn parse(html: &str) -> Vec<Inline> {
    let mut builder = TreeBuilder::new();
    let mut pos = 0;

    while pos < html.len() {
        let rest = &html[pos..];
        let Some(lt) = rest.find('<') else {
            builder.push_text(rest);
            break;
        };
        if lt > 0 {
            builder.push_text(&rest[..lt]);
            pos += lt;
            continue;
        }

        if rest.starts_with("<!--") {
            pos += rest.find("-->").map_or(rest.len(), |end| end + 3);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos += rest.find('>').map_or(rest.len(), |end| end + 1);
            continue;
        }

        let Some((tag, len)) = parse_tag(rest) else {
            builder.push_text("<");
            pos += 1;
            continue;
        };
        pos += len;

        let name = tag.name.as_str();
        if name == "br" {
            builder.line_break();
        } else if RAW_TEXT_TAGS.contains(&name) {
            if !tag.closing && !tag.self_closing {
                let end = format!("</{}", name);
                let lower = html[pos..].to_ascii_lowercase();
                pos = match lower.find(&end) {
                    Some(at) => {
                        let after = pos + at;
                        after + html[after..].find('>').map_or(html.len() - after, |gt| gt + 1)
                    }
                    None => html.len(),
                };
            }
        } else if BLOCK_TAGS.contains(&name) {
            builder.soft_break();
            if tag.closing {
                builder.close(name);
            } else if !tag.self_closing {
                builder.open(&tag);
            }
        } else if tag.closing {
            builder.close(name);
        } else if !tag.self_closing {
            builder.open(&tag);
        }
    }

    builder.finish()
}

/// Serialize inline nodes as editor HTML.
pub fn write(nodes: &[Inline]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[Inline], out: &mut String) {
    for node in nodes {
        match node {
            Inline::Text(text) => out.push_str(&escape_text(text)),
            Inline::LineBreak => out.push_str("<br>"),
            Inline::Bold(children) => wrap(out, "<strong>", children, "</strong>"),
            Inline::Italic(children) => wrap(out, "<em>", children, "</em>"),
            Inline::Underline(children) => wrap(out, "<u>", children, "</u>"),
            Inline::Link { href, children } => {
                let open = format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">",
                    escape_attr(href)
                );
                wrap(out, &open, children, "</a>");
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

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub(crate) fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        let source = r#"<a href="https://x.y/?a=1&amp;b=2" target='_blank' hidden>rest"#;
        let (tag, len) = parse_tag(source).unwrap();
        assert_eq!(tag.name, "a");
        assert!(!tag.closing);
        assert_eq!(tag.attr("href"), Some("https://x.y/?a=1&b=2"));
        assert_eq!(tag.attr("target"), Some("_blank"));
        assert_eq!(tag.attr("hidden"), Some(""));
        assert_eq!(len, 58);

        let (tag, _) = parse_tag("<BR/>").unwrap();
        assert_eq!(tag.name, "br");
        assert!(tag.self_closing);

        let (tag, _) = parse_tag("</Strong>").unwrap();
        assert!(tag.closing);
        assert_eq!(tag.name, "strong");

        assert!(parse_tag("< b>").is_none());
        assert!(parse_tag("a <b>").is_none());
    }

    #[test]
    fn test_entities() {
        assert_eq!(
            decode_entities("a &lt;b&gt; &amp;&nbsp;&#65;&#x42;&unknown;"),
            "a <b> & AB&unknown;"
        );
    }

    #[test]
    fn test_parse_formatting() {
        let nodes = parse("Hi <b>there</b> <em>you</em><u>!</u>");
        assert_eq!(
            nodes,
            vec![
                Inline::text("Hi "),
                Inline::Bold(vec![Inline::text("there")]),
                Inline::text(" "),
                Inline::Italic(vec![Inline::text("you")]),
                Inline::Underline(vec![Inline::text("!")]),
            ]
        );
    }

    #[test]
    fn test_unsupported_tags_keep_text() {
        let nodes = parse(
            "<font color=red>red</font> <a>plain</a> <span>bare</span>\
             <script>alert(1)</script><!-- c -->",
        );
        assert_eq!(nodes, vec![Inline::text("red plain bare")]);
    }

    #[test]
    fn test_blocks_become_breaks() {
        let nodes = parse("<div>one</div><div>two</div><p>three</p>");
        assert_eq!(
            nodes,
            vec![
                Inline::text("one"),
                Inline::LineBreak,
                Inline::text("two"),
                Inline::LineBreak,
                Inline::text("three"),
                Inline::LineBreak,
            ]
        );

        let nodes = parse("a<br>\nb<br/><br>c");
        assert_eq!(
            nodes,
            vec![
                Inline::text("a"),
                Inline::LineBreak,
                Inline::text("b"),
                Inline::LineBreak,
                Inline::LineBreak,
                Inline::text("c"),
            ]
        );
    }

    #[test]
    fn test_mismatched_tags() {
        // Closing the outer element closes the inner one as well
        let nodes = parse("<b>a<i>b</b>c</i>");
        assert_eq!(
            nodes,
            vec![
                Inline::Bold(vec![Inline::text("a"), Inline::Italic(vec![Inline::text("b")])]),
                Inline::text("c"),
            ]
        );

        assert_eq!(parse("<b>open"), vec![Inline::Bold(vec![Inline::text("open")])]);
        assert_eq!(parse("1 < 2"), vec![Inline::text("1 < 2")]);
    }

    #[test]
    fn test_write_escapes() {
        let html = write(&[
            Inline::text("a < b & c"),
            Inline::Link {
                href: "https://x.y/?q=\"1\"&r=2".to_string(),
                children: vec![Inline::text("go")],
            },
            Inline::LineBreak,
            Inline::Span { style: "color: red".to_string(), children: vec![Inline::text("x")] },
        ]);
        assert_eq!(
            html,
            "a &lt; b &amp; c<a href=\"https://x.y/?q=&quot;1&quot;&amp;r=2\" \
             target=\"_blank\" rel=\"noopener noreferrer\">go</a>\
             <br><span style=\"color: red\">x</span>"
        );
        assert_eq!(parse(&html)[1], Inline::Link {
            href: "https://x.y/?q=\"1\"&r=2".to_string(),
            children: vec![Inline::text("go")],
        });
    }
}
