//! Pre-flight checks before talking to the hosted model.
//!
//! Fails early with a readable message instead of letting the first
//! request come back unauthorized.

use crate::config::Settings;
use crate::error::{Result, ScoutError};

/// Resolve the API key from the command line, environment, or config file.
///
/// The key itself never appears in the error.
pub fn require_api_key(settings: &Settings, override_key: Option<&str>) -> Result<String> {
    settings.api_key(override_key).ok_or_else(|| {
        ScoutError::InvalidInput(
            "No API key configured. Pass --api-key, set GROQ_API_KEY, or set llm.api_key in the config file"
                .to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key() {
        let settings = Settings::default();
        let err = require_api_key(&settings, None).unwrap_err();
        assert!(matches!(err, ScoutError::InvalidInput(_)));
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_override_key() {
        let settings = Settings::default();
        assert_eq!(require_api_key(&settings, Some("gsk_x")).unwrap(), "gsk_x");
    }
}
