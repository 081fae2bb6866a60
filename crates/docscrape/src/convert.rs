//! HTML conversion utilities
//!
//! A small forgiving tokenizer feeds two renderers: Markdown (headings,
//! lists, emphasis, code, links, images) and plain text. Neither step can
//! fail; unknown or broken markup is dropped and its text kept.

use serde::{Deserialize, Serialize};

/// Elements whose content is never output
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "head", "template",
];

/// Non-content elements removed in clean mode
const BOILERPLATE_TAGS: &[&str] = &["nav", "footer", "header", "aside"];

/// Block elements that end with a paragraph break
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "table",
    "figure", "dl",
];

/// Target format for converted artifacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Text,
}

impl OutputFormat {
    /// File extension for converted output
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
        }
    }
}

/// Conversion switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Drop nav, footer, header and aside before converting
    pub strip_boilerplate: bool,
}

impl ConvertOptions {
    /// Options with boilerplate stripping enabled
    pub fn clean() -> Self {
        Self {
            strip_boilerplate: true,
        }
    }

    fn skips(&self, name: &str) -> bool {
        SKIP_TAGS.contains(&name) || (self.strip_boilerplate && BOILERPLATE_TAGS.contains(&name))
    }
}

/// Convert HTML using the given format and options
pub fn convert(html: &str, format: OutputFormat, options: ConvertOptions) -> String {
    match format {
        OutputFormat::Markdown => html_to_markdown_with(html, options),
        OutputFormat::Text => html_to_text_with(html, options),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
    raw: String,
}

impl Tag {
    fn parse(inner: &str) -> Self {
        let trimmed = inner.trim();
        let closing = trimmed.starts_with('/');
        let self_closing = trimmed.ends_with('/');
        let name = trimmed
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_lowercase();
        Self {
            name,
            closing,
            self_closing,
            raw: trimmed.to_string(),
        }
    }

    fn attr(&self, name: &str) -> Option<String> {
        extract_attribute(&self.raw, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Tag(Tag),
    Text(String),
}

/// Split HTML into tags and decoded text, dropping skipped regions
fn tokenize(html: &str, options: ConvertOptions) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut skip_stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut rest = html;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map(|end| &after[end + 3..]).unwrap_or("");
            continue;
        }

        if c == '<' && starts_tag(&rest[1..]) {
            let end = rest.find('>').unwrap_or(rest.len());
            let tag = Tag::parse(&rest[1..end]);
            rest = rest.get(end + 1..).unwrap_or("");

            if tag.name.starts_with('!') || tag.name.starts_with('?') || tag.name.is_empty() {
                continue;
            }

            // Raw-text elements: jump straight past the closing tag
            if matches!(tag.name.as_str(), "script" | "style") && !tag.closing && !tag.self_closing
            {
                let close = format!("</{}", tag.name);
                rest = match rest.to_ascii_lowercase().find(&close) {
                    Some(pos) => {
                        let after = &rest[pos..];
                        after.find('>').map(|e| &after[e + 1..]).unwrap_or("")
                    }
                    None => "",
                };
                continue;
            }

            if options.skips(&tag.name) {
                if tag.closing {
                    if let Some(pos) = skip_stack.iter().rposition(|t| *t == tag.name) {
                        skip_stack.truncate(pos);
                    }
                } else if !tag.self_closing {
                    skip_stack.push(tag.name.clone());
                }
                continue;
            }

            if !skip_stack.is_empty() {
                continue;
            }

            if !text.is_empty() {
                tokens.push(Token::Text(std::mem::take(&mut text)));
            }
            tokens.push(Token::Tag(tag));
            continue;
        }

        let (decoded, consumed) = if c == '&' {
            decode_entity(rest)
        } else {
            (c.to_string(), c.len_utf8())
        };
        rest = &rest[consumed..];
        if skip_stack.is_empty() {
            text.push_str(&decoded);
        }
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}

fn starts_tag(s: &str) -> bool {
    s.chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?')
        .unwrap_or(false)
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Convert HTML to markdown, keeping every element
pub fn html_to_markdown(html: &str) -> String {
    html_to_markdown_with(html, ConvertOptions::default())
}

/// Convert HTML to markdown
pub fn html_to_markdown_with(html: &str, options: ConvertOptions) -> String {
    let mut output = String::new();
    let mut list_depth: usize = 0;
    let mut in_pre = false;
    let mut in_blockquote = false;
    let mut links: Vec<Option<String>> = Vec::new();

    for token in tokenize(html, options) {
        let tag = match token {
            Token::Text(text) => {
                if in_blockquote {
                    output.push_str(&text.replace('\n', "\n> "));
                } else {
                    output.push_str(&text);
                }
                continue;
            }
            Token::Tag(tag) => tag,
        };

        if let Some(level) = heading_level(&tag.name) {
            if tag.closing {
                output.push_str("\n\n");
            } else {
                output.push('\n');
                output.push_str(&"#".repeat(level));
                output.push(' ');
            }
            continue;
        }

        match tag.name.as_str() {
            name if BLOCK_TAGS.contains(&name) => {
                if tag.closing {
                    output.push_str("\n\n");
                }
            }
            "tr" => {
                if tag.closing {
                    output.push('\n');
                }
            }
            "td" | "th" => {
                if tag.closing {
                    output.push(' ');
                }
            }
            "br" => output.push('\n'),
            "hr" => output.push_str("\n---\n"),
            "ul" | "ol" => {
                if tag.closing {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        output.push('\n');
                    }
                } else {
                    list_depth += 1;
                }
            }
            "li" => {
                if !tag.closing {
                    output.push('\n');
                    output.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                    output.push_str("- ");
                }
            }
            "strong" | "b" => output.push_str("**"),
            "em" | "i" => output.push('*'),
            "pre" => {
                output.push_str("\n```\n");
                in_pre = !tag.closing;
            }
            "code" => {
                if !in_pre {
                    output.push('`');
                }
            }
            "blockquote" => {
                if tag.closing {
                    in_blockquote = false;
                    output.push('\n');
                } else {
                    in_blockquote = true;
                    output.push_str("\n> ");
                }
            }
            "a" => {
                if tag.closing {
                    if let Some(Some(href)) = links.pop() {
                        output.push_str(&format!("]({})", href));
                    }
                } else if !tag.self_closing {
                    let href = tag.attr("href");
                    if href.is_some() {
                        output.push('[');
                    }
                    links.push(href);
                }
            }
            "img" => {
                if let Some(src) = tag.attr("src") {
                    let alt = tag.attr("alt").unwrap_or_default();
                    output.push_str(&format!("![{}]({})", alt, src));
                }
            }
            _ => {}
        }
    }

    clean_whitespace(&output)
}

/// Convert HTML to plain text, keeping every element
pub fn html_to_text(html: &str) -> String {
    html_to_text_with(html, ConvertOptions::default())
}

/// Convert HTML to plain text
pub fn html_to_text_with(html: &str, options: ConvertOptions) -> String {
    let mut output = String::new();

    for token in tokenize(html, options) {
        match token {
            Token::Text(text) => output.push_str(&text),
            Token::Tag(tag) => {
                let name = tag.name.as_str();
                if heading_level(name).is_some() || name == "p" {
                    output.push('\n');
                } else if name == "br" || (tag.closing && ends_text_line(name)) {
                    output.push('\n');
                } else if name == "img" && !tag.closing {
                    if let Some(alt) = tag.attr("alt") {
                        output.push_str(&alt);
                    }
                }
            }
        }
    }

    clean_whitespace(&output)
}

fn ends_text_line(name: &str) -> bool {
    BLOCK_TAGS.contains(&name) || matches!(name, "li" | "tr")
}

/// Extract attribute value from raw tag text
fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!("{}=", attr);
    let tag_lower = tag.to_ascii_lowercase();

    let mut search_from = 0;
    while let Some(found) = tag_lower[search_from..].find(&pattern) {
        let start = search_from + found;
        search_from = start + pattern.len();

        // Must be a whole attribute name, not a suffix like data-href
        let preceded_ok = tag_lower[..start]
            .chars()
            .next_back()
            .map(char::is_whitespace)
            .unwrap_or(false);
        if !preceded_ok {
            continue;
        }

        let rest = tag[start + pattern.len()..].trim_start();
        let value = if let Some(rest) = rest.strip_prefix('"') {
            rest.find('"').map(|end| &rest[..end])
        } else if let Some(rest) = rest.strip_prefix('\'') {
            rest.find('\'').map(|end| &rest[..end])
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(rest.len());
            Some(rest[..end].trim_end_matches('/'))
        };
        return value.map(decode_entities);
    }
    None
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(c) = rest.chars().next() {
        if c == '&' {
            let (decoded, consumed) = decode_entity(rest);
            out.push_str(&decoded);
            rest = &rest[consumed..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// Decode the entity at the start of `s` (which begins with `&`)
///
/// Returns the decoded text and how many bytes were consumed. Unknown or
/// unterminated entities decode to a literal `&` consuming one byte.
fn decode_entity(s: &str) -> (String, usize) {
    let literal = ("&".to_string(), 1);
    let body = &s[1..];
    let Some(end) = body
        .char_indices()
        .take(12)
        .find(|(_, c)| *c == ';' || c.is_whitespace() || *c == '&' || *c == '<')
        .filter(|(_, c)| *c == ';')
        .map(|(i, _)| i)
    else {
        return literal;
    };
    let entity = &body[..end];

    let decoded = match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "hellip" => Some('…'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        _ => entity.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };

    match decoded {
        Some(ch) => (ch.to_string(), end + 2),
        None => literal,
    }
}

/// Clean whitespace: collapse runs, trim, keep max 2 newlines
///
/// Lines inside ``` fences keep their indentation.
pub fn clean_whitespace(s: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0;

    for line in s.split('\n') {
        let is_fence = line.trim_start().starts_with("```");
        if in_fence && !is_fence {
            lines.push(line.trim_end().to_string());
            continue;
        }
        if is_fence {
            in_fence = !in_fence;
        }

        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(collapsed);
    }

    lines.join("\n").trim().to_string()
}
