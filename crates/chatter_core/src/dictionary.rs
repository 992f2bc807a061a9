//! Dictionary client - word definitions from dictionaryapi.dev.
//!
//! The lookup contract never fails: transport errors, non-array bodies and
//! malformed structures all resolve to a fixed no-definition reply, so a
//! caller always gets printable content back.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Default public dictionary endpoint. The word is appended as a path
/// segment.
pub const DEFAULT_BASE_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en/";

/// Title prefixed to every extracted definition text.
const DEFINITION_TITLE: &str = "Definition: ";

/// Reply used whenever no definition can be produced for a word.
pub fn no_definition_reply(word: &str) -> String {
    format!("Sorry, i could not find the definition for: {word}")
}

/// Asynchronous word lookup: always completes with printable content.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn lookup(&self, word: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("invalid dictionary url: {0}")]
    Url(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP client for the dictionary API.
pub struct DictionaryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DictionaryClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chatter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    async fn fetch(&self, word: &str) -> Result<String, FetchError> {
        let base = Url::parse(&self.base_url).map_err(|err| FetchError::Url(err.to_string()))?;
        let url = base
            .join(word)
            .map_err(|err| FetchError::Url(err.to_string()))?;

        debug!("Fetching definition: {url}");
        let response = self.http.get(url).send().await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DefinitionSource for DictionaryClient {
    async fn lookup(&self, word: &str) -> String {
        match self.fetch(word).await {
            Ok(body) => {
                extract_definitions(&body).unwrap_or_else(|| no_definition_reply(word))
            }
            Err(err) => {
                error!("Error fetching definition for {word:?}: {err}");
                no_definition_reply(word)
            }
        }
    }
}

/// Flatten a dictionary API body into one reply string.
///
/// The body is an array of entries, each holding a `meanings` array, each
/// holding a `definitions` array whose objects carry a `definition` text.
/// All texts are collected in document order, each on its own line behind
/// the definition title. Returns `None` when the body is not shaped that
/// way.
fn extract_definitions(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let entries = value.as_array()?;

    let mut reply = String::new();
    for entry in entries {
        let meanings = entry.get("meanings")?.as_array()?;
        for meaning in meanings {
            let definitions = meaning.get("definitions")?.as_array()?;
            for definition in definitions {
                if let Some(text) = definition.get("definition").and_then(Value::as_str) {
                    reply.push('\n');
                    reply.push_str(DEFINITION_TITLE);
                    reply.push_str(text);
                }
            }
        }
    }
    Some(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAKE_BODY: &str = r#"[
        {
            "word": "cake",
            "meanings": [
                {
                    "partOfSpeech": "noun",
                    "definitions": [
                        {"definition": "A sweet baked food."},
                        {"definition": "A block of solid material."}
                    ]
                }
            ]
        },
        {
            "word": "cake",
            "meanings": [
                {
                    "partOfSpeech": "verb",
                    "definitions": [
                        {"definition": "To coat with a crust."}
                    ]
                }
            ]
        }
    ]"#;

    #[test]
    fn flattens_entries_meanings_and_definitions_in_order() {
        let reply = extract_definitions(CAKE_BODY).unwrap();
        assert_eq!(
            reply,
            "\nDefinition: A sweet baked food.\
             \nDefinition: A block of solid material.\
             \nDefinition: To coat with a crust."
        );
    }

    #[test]
    fn non_array_body_yields_none() {
        // dictionaryapi.dev answers an object with a "title" on unknown words
        let body = r#"{"title": "No Definitions Found"}"#;
        assert_eq!(extract_definitions(body), None);
    }

    #[test]
    fn malformed_body_yields_none() {
        assert_eq!(extract_definitions("not json at all"), None);
        assert_eq!(extract_definitions(r#"[{"word": "x"}]"#), None);
    }

    #[test]
    fn no_definition_reply_names_the_word() {
        assert_eq!(
            no_definition_reply("cake"),
            "Sorry, i could not find the definition for: cake"
        );
    }
}
