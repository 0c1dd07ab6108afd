//! Configuration for decoding.

use serde::Deserialize;

/// Nesting depth at which decoding gives up, same as the reference protobuf
/// runtimes.
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// Configuration for a [`crate::Decoder`].
///
/// Can be built in code or deserialized, missing keys take their default:
///
/// ```
/// let config: protolens::DecoderConfig =
///     serde_json::from_str(r#"{ "warn_on_unknown_field": true }"#).unwrap();
/// assert!(config.warns_on_unknown_field());
/// assert_eq!(config.max_depth(), 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Emit a warning for field numbers the current host type does not declare.
    pub(crate) warn_on_unknown_field: bool,

    /// Maximum nesting of messages and groups.
    pub(crate) recursion_limit: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            warn_on_unknown_field: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl DecoderConfig {
    /// Create a new DecoderConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning whenever a field cannot be resolved against its host type.
    pub fn warn_on_unknown_field(&mut self, warn: bool) -> &mut Self {
        self.warn_on_unknown_field = warn;
        self
    }

    /// Set the maximum nesting depth of messages and groups.
    pub fn recursion_limit(&mut self, limit: usize) -> &mut Self {
        self.recursion_limit = limit;
        self
    }

    pub fn warns_on_unknown_field(&self) -> bool {
        self.warn_on_unknown_field
    }

    pub fn max_depth(&self) -> usize {
        self.recursion_limit
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::new();
        assert!(!config.warns_on_unknown_field());
        assert_eq!(config.max_depth(), DEFAULT_RECURSION_LIMIT);
    }

    #[test]
    fn test_builder() {
        let mut config = DecoderConfig::new();
        config.warn_on_unknown_field(true).recursion_limit(8);
        assert!(config.warns_on_unknown_field());
        assert_eq!(config.max_depth(), 8);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DecoderConfig = serde_json::from_str(r#"{ "recursion_limit": 3 }"#).unwrap();
        assert!(!config.warns_on_unknown_field());
        assert_eq!(config.max_depth(), 3);

        let config: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DecoderConfig::default());
    }
}
