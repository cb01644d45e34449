//! Filename tokens identifying an artifact's files.

/// Shorter tokens match too much to be useful.
pub const MIN_TOKEN_LEN: usize = 3;

/// Ordered, deduplicated set of identifying tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: Vec<String>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` with spaces underscored. Short and duplicate tokens are
    /// ignored.
    pub fn add(&mut self, value: &str) {
        let token = value.trim().replace(' ', "_");
        if token.chars().count() < MIN_TOKEN_LEN || self.tokens.contains(&token) {
            return;
        }
        self.tokens.push(token);
    }

    pub fn extend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in values {
            self.add(value.as_ref());
        }
    }

    /// Case-sensitive containment.
    pub fn matches(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| name.contains(t.as_str()))
    }

    /// Case-insensitive containment.
    pub fn matches_ignore_case(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.tokens
            .iter()
            .any(|t| name.contains(t.to_lowercase().as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tokens
    }
}
