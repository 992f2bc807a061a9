//! Conversation data loader - parses the rule XML into `Rule` records.
//!
//! Each `<conversation>` block holds one `<type>`, one or more `<pattern>`
//! elements and any number of `<response>` elements; the `id` attribute ties
//! responses to their pattern:
//!
//! ```text
//! <conversation>
//!     <type>greetings</type>
//!     <pattern id="1">\bhi\b|\bhello\b</pattern>
//!     <response id="1">Hello there!</response>
//!     <response id="1">Hi! How are you doing?</response>
//! </conversation>
//! ```
//!
//! Pattern text drops every literal space and newline, so patterns spell
//! whitespace as `\s`. Response text drops the indentation runs (two or
//! more spaces) that pretty-printed XML introduces.

use crate::rules::Rule;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("failed to read conversation data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed conversation data: {0}")]
    Xml(String),
}

/// Which element's text is currently being collected.
enum Field {
    None,
    Type,
    Pattern(String),
    Response(String),
}

/// Read and parse a conversation data file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Rule>, LoaderError> {
    let xml = std::fs::read_to_string(path.as_ref())?;
    let rules = parse_conversations(&xml)?;
    debug!(
        "Loaded {} conversation rules from {}",
        rules.len(),
        path.as_ref().display()
    );
    Ok(rules)
}

/// Parse conversation XML into ordered `Rule` records.
pub fn parse_conversations(xml: &str) -> Result<Vec<Rule>, LoaderError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rules: Vec<Rule> = Vec::new();
    let mut rtype = String::new();
    let mut patterns: Vec<(String, String)> = Vec::new();
    let mut responses: Vec<(String, String)> = Vec::new();
    let mut field = Field::None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"conversation" => {
                    rtype.clear();
                    patterns.clear();
                    responses.clear();
                }
                b"type" => field = Field::Type,
                b"pattern" => field = Field::Pattern(id_attribute(&e)?),
                b"response" => field = Field::Response(id_attribute(&e)?),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let t = t
                    .unescape()
                    .map_err(|err| LoaderError::Xml(err.to_string()))?;
                text.push_str(&t);
            }
            Ok(Event::End(e)) => {
                match std::mem::replace(&mut field, Field::None) {
                    Field::Type => rtype = text.trim().to_string(),
                    Field::Pattern(id) => patterns.push((id, normalize_pattern(&text))),
                    Field::Response(id) => responses.push((id, normalize_response(&text))),
                    Field::None => {}
                }
                text.clear();

                if e.local_name().as_ref() == b"conversation" {
                    flush_conversation(&rtype, &patterns, &responses, &mut rules);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(LoaderError::Xml(err.to_string())),
        }
    }

    Ok(rules)
}

/// Produce one rule per pattern, grouping the responses that share its id
/// in document order.
fn flush_conversation(
    rtype: &str,
    patterns: &[(String, String)],
    responses: &[(String, String)],
    rules: &mut Vec<Rule>,
) {
    for (id, pattern) in patterns {
        let grouped: Vec<String> = responses
            .iter()
            .filter(|(response_id, _)| response_id == id)
            .map(|(_, response)| response.clone())
            .collect();

        rules.push(Rule {
            rtype: rtype.to_string(),
            pattern: pattern.clone(),
            responses: grouped,
        });
    }
}

fn id_attribute(element: &BytesStart<'_>) -> Result<String, LoaderError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| LoaderError::Xml(err.to_string()))?;
        if attribute.key.as_ref() == b"id" {
            let value = attribute
                .unescape_value()
                .map_err(|err| LoaderError::Xml(err.to_string()))?;
            return Ok(value.into_owned());
        }
    }
    Ok(String::new())
}

/// Patterns spell whitespace as `\s`; literal spaces and newlines are
/// formatting only.
fn normalize_pattern(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ' ' && *c != '\n')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Drop runs of two or more spaces (XML indentation); single spaces stay.
fn normalize_response(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_spaces = 0usize;
    for c in text.chars() {
        if c == ' ' {
            pending_spaces += 1;
            continue;
        }
        if pending_spaces == 1 {
            out.push(' ');
        }
        pending_spaces = 0;
        out.push(c);
    }
    if pending_spaces == 1 {
        out.push(' ');
    }
    out.trim().to_string()
}
