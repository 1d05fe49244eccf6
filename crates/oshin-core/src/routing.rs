//! Routing configuration: the ordered list of fan-out and digest targets.
//!
//! Loaded once at startup from a JSON descriptor and shared read-only for
//! the rest of the process. Accepted shapes:
//!
//! ```json
//! [{"channel": "#eng", "tags": ["#bugfix"], "token": "$ENG_TOKEN"}]
//! {"items": [{"channel": "#eng", "tags": ["#bugfix"], "token": "xoxb-..."}]}
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OshinError, Result};

/// Opaque delivery credential. `Debug` masks the value so it never leaks
/// into logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// `xoxb-1234…` style preview for operator output.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        if self.0.chars().count() <= 8 {
            "****".into()
        } else {
            format!("{prefix}****")
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// One configured destination with an optional tag filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub destination: String,
    pub tags: Vec<String>,
    pub credential: Credential,
}

impl RoutingRule {
    pub fn new(destination: impl Into<String>, tags: &[&str], credential: Credential) -> Self {
        Self {
            destination: destination.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            credential,
        }
    }

    /// True when any tag is a literal, case-sensitive substring of `text`.
    /// A rule without tags never matches.
    pub fn matches(&self, text: &str) -> bool {
        self.tags.iter().any(|tag| text.contains(tag.as_str()))
    }

    /// Digest filter: rules without tags admit everything.
    pub fn admits(&self, text: &str) -> bool {
        self.tags.is_empty() || self.matches(text)
    }
}

/// Immutable, ordered set of routing rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingConfig {
    rules: Vec<RoutingRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    channel: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDescriptor {
    List(Vec<RawRule>),
    Wrapped { items: Vec<RawRule> },
}

impl RoutingConfig {
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self { rules }
    }

    /// Load the descriptor at `path`, resolving `$VAR` tokens from the
    /// process environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OshinError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, |name| std::env::var(name).ok())?;
        tracing::info!(
            "Loaded {} routing rule(s) from {}",
            config.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse a descriptor. `lookup` resolves `$NAME` / `${NAME}` tokens.
    pub fn parse<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawDescriptor = serde_json::from_str(content)
            .map_err(|e| OshinError::config(format!("Cannot parse routing descriptor: {e}")))?;
        let items = match raw {
            RawDescriptor::List(items) => items,
            RawDescriptor::Wrapped { items } => items,
        };

        let mut rules = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let destination = item.channel.trim().to_string();
            if destination.is_empty() {
                return Err(OshinError::config(format!(
                    "Routing rule #{idx} has an empty channel"
                )));
            }
            let credential = resolve_token(&item.token, &lookup).map_err(|e| {
                OshinError::config(format!("Routing rule #{idx} ({destination}): {e}"))
            })?;
            // An empty-string tag is kept: it is a substring of every text.
            let tags = item.tags.unwrap_or_default();
            rules.push(RoutingRule {
                destination,
                tags,
                credential,
            });
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Rules that receive an immediate copy of `text`, in descriptor order.
    pub fn matching<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a RoutingRule> + 'a {
        self.rules.iter().filter(move |r| r.matches(text))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn resolve_token<F>(token: &str, lookup: &F) -> std::result::Result<Credential, String>
where
    F: Fn(&str) -> Option<String>,
{
    let token = token.trim();
    let var = token
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| token.strip_prefix('$'));

    let credential = match var {
        Some(name) if !name.is_empty() => {
            let value = lookup(name).ok_or_else(|| format!("environment variable {name} is not set"))?;
            Credential::new(value)
        }
        _ => Credential::new(token),
    };
    if credential.is_empty() {
        return Err("token is empty".into());
    }
    Ok(credential)
}
