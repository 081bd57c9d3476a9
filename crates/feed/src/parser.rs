use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::models::FeedEntry;
use crate::FeedError;

/// Entry-level element whose text content is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Link,
    Category,
    Date,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"description" | b"summary" | b"content" | b"content:encoded" => {
                Some(Field::Description)
            }
            b"link" => Some(Field::Link),
            b"category" => Some(Field::Category),
            b"pubDate" | b"published" | b"updated" | b"dc:date" => Some(Field::Date),
            _ => None,
        }
    }
}

/// Parse an RSS 2.0, RSS 1.0 (RDF) or Atom document from raw XML bytes.
///
/// Entries without a title are dropped. A document without any recognised
/// feed root element is rejected as a parse error.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedEntry>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    let mut saw_root = false;
    let mut current: Option<EntryBuilder> = None;
    // Field element name and accumulated text
    let mut field: Option<(Vec<u8>, Field)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"rss" | b"feed" | b"rdf:RDF" => saw_root = true,
                    b"item" | b"entry" => {
                        current = Some(EntryBuilder::default());
                        field = None;
                    }
                    _ => {}
                }

                if let Some(ref mut entry) = current {
                    if field.is_none() {
                        if let Some(kind) = Field::from_name(&name) {
                            apply_attributes(entry, kind, &e)?;
                            field = Some((name, kind));
                            text.clear();
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                // Atom carries links and categories as attributes on empty elements
                if let Some(ref mut entry) = current {
                    if field.is_none() {
                        if let Some(kind) = Field::from_name(e.name().as_ref()) {
                            apply_attributes(entry, kind, &e)?;
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if field.is_some() {
                    let value = e
                        .unescape()
                        .map_err(|e| FeedError::Parse(format!("invalid text: {}", e)))?;
                    push_text(&mut text, &value);
                }
            }
            Ok(Event::CData(e)) => {
                if field.is_some() {
                    push_text(&mut text, &String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let name = name.as_ref();

                let closes_field = matches!(&field, Some((open, _)) if open.as_slice() == name);
                if closes_field {
                    if let (Some((_, kind)), Some(entry)) = (field.take(), current.as_mut()) {
                        entry.set(kind, std::mem::take(&mut text));
                    }
                } else if name == b"item" || name == b"entry" {
                    if let Some(builder) = current.take() {
                        if let Some(entry) = builder.build() {
                            entries.push(entry);
                        }
                    }
                    field = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(FeedError::Parse(
            "document is not an RSS or Atom feed".to_string(),
        ));
    }

    Ok(entries)
}

fn push_text(text: &mut String, value: &str) {
    if value.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(value);
}

/// Pick up attribute-carried values (`<link href>`, `<category term>`).
fn apply_attributes(
    entry: &mut EntryBuilder,
    kind: Field,
    e: &BytesStart<'_>,
) -> Result<(), FeedError> {
    let wanted: &[u8] = match kind {
        Field::Link => b"href",
        Field::Category => b"term",
        _ => return Ok(()),
    };

    let mut value = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == wanted || key == b"rel" {
            let v = attr
                .unescape_value()
                .map_err(|e| FeedError::Parse(format!("invalid attribute: {}", e)))?
                .to_string();
            if key == b"rel" {
                rel = Some(v);
            } else {
                value = Some(v);
            }
        }
    }

    let Some(value) = value else {
        return Ok(());
    };

    match kind {
        Field::Link => {
            let alternate = rel.as_deref().map_or(true, |r| r == "alternate");
            if alternate && entry.link.is_none() {
                entry.link = Some(value);
            }
        }
        Field::Category => entry.categories.push(value),
        _ => {}
    }
    Ok(())
}

#[derive(Default)]
struct EntryBuilder {
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    categories: Vec<String>,
    published: Option<DateTime<Utc>>,
}

impl EntryBuilder {
    fn set(&mut self, kind: Field, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        match kind {
            Field::Title => self.title = Some(value),
            // First description-like element wins (RSS description before content:encoded)
            Field::Description => {
                if self.description.is_none() {
                    self.description = Some(value);
                }
            }
            Field::Link => {
                if self.link.is_none() {
                    self.link = Some(value);
                }
            }
            Field::Category => self.categories.push(value),
            Field::Date => {
                if self.published.is_none() {
                    self.published = parse_date(&value);
                }
            }
        }
    }

    fn build(self) -> Option<FeedEntry> {
        Some(FeedEntry {
            title: self.title?,
            description: self.description,
            link: self.link.unwrap_or_default(),
            categories: self.categories,
            published: self.published,
        })
    }
}

/// RFC 2822 (RSS `pubDate`) or RFC 3339 (Atom) timestamps.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
