//! Text normalisation shared by the matching passes.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::MIN_TOKEN_LEN;

static QUOTES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["'“”‘’]"#).unwrap());

static PUNCTUATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,/#!$%\^&*;:{}=\-_`~()]").unwrap());

/// Elements whose content never contributes text.
const SKIPPED_ELEMENTS: &[&str] = &["img", "script", "style", "head", "noscript"];

/// Elements rendered on their own line.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "thead", "tbody", "h1", "h2", "h3", "h4",
    "h5", "h6", "blockquote", "pre", "section", "article", "hr",
];

/// Table cells stay on the row line, separated by a space.
const CELL_ELEMENTS: &[&str] = &["td", "th"];

/// Legal-entity and listing noise removed from instrument descriptions.
const CORPORATE_SUFFIXES: &[&str] = &[
    "INC",
    "INCORPORATED",
    "CORP",
    "CORPORATION",
    "CO",
    "COMPANY",
    "LTD",
    "LIMITED",
    "PLC",
    "LLC",
    "LP",
    "LLP",
    "ADR",
    "ADS",
    "SPONSORED",
    "UNSPONSORED",
    "NV",
    "SA",
    "AG",
    "SE",
    "AB",
    "ASA",
    "OYJ",
    "SPA",
    "BHD",
    "TBK",
    "KK",
    "ORD",
    "SHS",
    "SHARES",
    "COMMON",
    "STOCK",
    "REG",
];

/// Share-class markers, removed together with the following class letter.
const CLASS_MARKERS: &[&str] = &["CLASS", "CL"];

/// Decode HTML/XML character references. Text with stray `&` is returned unchanged.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    unescape_with(text, resolve_html5_entity).unwrap_or(Cow::Borrowed(text))
}

/// Render an HTML fragment as plain text.
///
/// Entities are decoded first so entity-encoded markup is parsed as markup.
/// Images and scripts are dropped, table cells are kept as space separated text.
pub fn html_to_text(html: &str) -> String {
    let decoded = decode_entities(html);
    let fragment = Html::parse_fragment(&decoded);

    let mut out = String::new();
    render(fragment.root_element(), &mut out);
    out
}

fn render(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                render(child, out);
                if block {
                    out.push('\n');
                } else if CELL_ELEMENTS.contains(&name) {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Strip quotes and punctuation, fold line breaks, split on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    let text = QUOTES_PATTERN.replace_all(text, "");
    let text = PUNCTUATION_PATTERN.replace_all(&text, "");

    text.split_whitespace().map(str::to_string).collect()
}

/// Tokens long enough to be symbols or search terms.
pub fn significant_tokens(tokens: &[String]) -> impl Iterator<Item = &String> {
    tokens.iter().filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
}

/// Upper-cased tokens joined by single spaces.
pub fn canonical_text(tokens: &[String]) -> String {
    tokens.join(" ").to_uppercase()
}

/// Reduce an instrument description to the company name as it would be
/// written in prose: same punctuation rules as the source text, upper-cased,
/// with corporate suffixes and share-class markers removed.
pub fn clean_description(description: &str) -> String {
    let tokens: Vec<String> = tokenize(description)
        .into_iter()
        .map(|t| t.to_uppercase())
        .collect();

    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();

        if CLASS_MARKERS.contains(&token) {
            let next_is_class_letter = tokens
                .get(i + 1)
                .is_some_and(|n| n.chars().count() == 1);
            i += if next_is_class_letter { 2 } else { 1 };
            continue;
        }

        if !CORPORATE_SUFFIXES.contains(&token) {
            kept.push(token);
        }
        i += 1;
    }

    kept.join(" ")
}
