use std::env;

/// Used when neither an explicit endpoint nor an environment variable is
/// given.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/a2a/messages";

const ENDPOINT_VARS: [&str; 2] =
    ["A2A_BACKEND_ENDPOINT", "NEXT_PUBLIC_A2A_ENDPOINT"];
const CONVERSATION_ID_VAR: &str = "A2A_CONVERSATION_ID";

/// Builder for [`HttpConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HttpConfigBuilder {
    endpoint: Option<String>,
    conversation_id: Option<String>,
}

impl HttpConfigBuilder {
    /// Creates a builder with nothing set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from the environment.
    ///
    /// The endpoint is read from `A2A_BACKEND_ENDPOINT`, falling back to
    /// `NEXT_PUBLIC_A2A_ENDPOINT`. The conversation id is read from
    /// `A2A_CONVERSATION_ID`. Empty values are ignored.
    #[inline]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty =
            |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            endpoint: ENDPOINT_VARS.iter().find_map(|key| non_empty(*key)),
            conversation_id: non_empty(CONVERSATION_ID_VAR),
        }
    }

    /// Sets the URL that messages are posted to.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the conversation id that is sent with every request, for
    /// backends that keep the history themselves.
    #[inline]
    pub fn with_conversation_id<S: Into<String>>(
        mut self,
        conversation_id: S,
    ) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> HttpConfig {
        HttpConfig {
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            conversation_id: self.conversation_id,
        }
    }
}

/// Configuration for the HTTP transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpConfig {
    pub(crate) endpoint: String,
    pub(crate) conversation_id: Option<String>,
}

impl HttpConfig {
    /// Shorthand for `HttpConfigBuilder::from_env().build()`.
    #[inline]
    pub fn from_env() -> Self {
        HttpConfigBuilder::from_env().build()
    }

    /// Returns the URL that messages are posted to.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the conversation id, if any.
    #[inline]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }
}

impl Default for HttpConfig {
    #[inline]
    fn default() -> Self {
        HttpConfigBuilder::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_in<'a>(
        vars: &'a [(&'a str, &'a str)],
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn test_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.conversation_id(), None);
    }

    #[test]
    fn test_env_precedence() {
        let config = HttpConfigBuilder::from_lookup(lookup_in(&[
            ("NEXT_PUBLIC_A2A_ENDPOINT", "http://fallback/a2a/messages"),
            ("A2A_BACKEND_ENDPOINT", "http://primary/a2a/messages"),
            ("A2A_CONVERSATION_ID", "abc"),
        ]))
        .build();
        assert_eq!(config.endpoint(), "http://primary/a2a/messages");
        assert_eq!(config.conversation_id(), Some("abc"));

        let config = HttpConfigBuilder::from_lookup(lookup_in(&[
            ("A2A_BACKEND_ENDPOINT", " "),
            ("NEXT_PUBLIC_A2A_ENDPOINT", "http://fallback/a2a/messages"),
        ]))
        .build();
        assert_eq!(config.endpoint(), "http://fallback/a2a/messages");
        assert_eq!(config.conversation_id(), None);

        let config = HttpConfigBuilder::from_lookup(lookup_in(&[])).build();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_explicit_values_win() {
        let config = HttpConfigBuilder::from_lookup(lookup_in(&[(
            "A2A_BACKEND_ENDPOINT",
            "http://env/a2a/messages",
        )]))
        .with_endpoint("http://explicit/messages")
        .with_conversation_id("c1")
        .build();
        assert_eq!(config.endpoint(), "http://explicit/messages");
        assert_eq!(config.conversation_id(), Some("c1"));
    }
}
