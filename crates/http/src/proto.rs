use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{Error, HttpConfig};

// ------------------------------
// Types received from the server
// ------------------------------

/// The answer of the health endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"ok"` when the backend is ready.
    pub status: String,
}

impl HealthStatus {
    /// Returns `true` if the backend reported itself ready.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// The answer of the models endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelList {
    /// The names of the models the backend can use.
    pub models: Vec<String>,
}

// ----------
// URL layout
// ----------

fn parse_endpoint(config: &HttpConfig) -> Result<Url, Error> {
    Url::parse(&config.endpoint).map_err(|err| {
        Error::config(format!("invalid endpoint {:?}: {err}", config.endpoint))
    })
}

/// `POST <endpoint>[?conversation_id=<id>]`
pub fn messages_url(config: &HttpConfig) -> Result<Url, Error> {
    let mut url = parse_endpoint(config)?;
    if let Some(conversation_id) = &config.conversation_id {
        url.query_pairs_mut()
            .append_pair("conversation_id", conversation_id);
    }
    Ok(url)
}

/// `GET /health`, at the root of the endpoint's origin.
pub fn health_url(config: &HttpConfig) -> Result<Url, Error> {
    let mut url = parse_endpoint(config)?;
    url.set_path("/health");
    url.set_query(None);
    Ok(url)
}

/// `GET <base>/models`
pub fn models_url(config: &HttpConfig) -> Result<Url, Error> {
    sibling_url(config, &["models"])
}

/// `DELETE <base>/conversations/<id>`
pub fn conversation_url(
    config: &HttpConfig,
    conversation_id: &str,
) -> Result<Url, Error> {
    sibling_url(config, &["conversations", conversation_id])
}

// Replaces the last path segment of the endpoint, so that
// `/a2a/messages` becomes `/a2a/<segments>`.
fn sibling_url(config: &HttpConfig, segments: &[&str]) -> Result<Url, Error> {
    let mut url = parse_endpoint(config)?;
    url.set_query(None);
    {
        let Ok(mut path) = url.path_segments_mut() else {
            return Err(Error::config(format!(
                "endpoint {:?} cannot be a base",
                config.endpoint
            )));
        };
        path.pop_if_empty().pop().extend(segments);
    }
    Ok(url)
}
