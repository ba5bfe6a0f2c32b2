//! Session configuration.
//!
//! Read once at initialization and treated as immutable for the session.

use std::env;

use tracing_subscriber::EnvFilter;

/// Environment-driven settings for a wizard session
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Base path of the wizard endpoints, trailing slash enforced
    pub wizard_root: String,
    /// Root URL for static assets (e.g. the wizard template)
    pub static_root: String,
    /// Emit per-request debug logging
    pub verbose: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            wizard_root: "/wizard/".to_string(),
            static_root: "/static/".to_string(),
            verbose: false,
        }
    }
}

impl WizardConfig {
    /// Read the session settings from the environment, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            wizard_root: env::var("WIZARD_ROOT").unwrap_or_else(|_| "/wizard/".to_string()),
            static_root: env::var("WIZARD_STATIC_ROOT").unwrap_or_else(|_| "/static/".to_string()),
            verbose: env::var("WIZARD_VERBOSE")
                .map(|value| value == "1")
                .unwrap_or(false),
        }
    }

    /// Join `path` onto the wizard root, enforcing the trailing slash.
    pub fn wizard_url(&self, path: &str) -> String {
        let mut result = format!("{}{}", self.wizard_root, path);
        if !result.ends_with('/') {
            result.push('/');
        }
        result
    }

    /// Resolve a static asset against the asset root.
    pub fn asset_url(&self, relative: &str) -> String {
        format!("{}{}", self.static_root, relative)
    }
}

/// Install the global tracing subscriber. The verbose toggle lowers the
/// default filter to `debug`; `RUST_LOG` still wins when set.
pub fn init_tracing(config: &WizardConfig) {
    let default_filter = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wizard_url_enforces_trailing_slash() {
        let config = WizardConfig::default();
        assert_eq!(config.wizard_url("data"), "/wizard/data/");
        assert_eq!(config.wizard_url("goto/b|x"), "/wizard/goto/b|x/");
        assert_eq!(config.wizard_url("commit/"), "/wizard/commit/");
    }

    #[test]
    fn test_defaults() {
        let config = WizardConfig::default();
        assert_eq!(config.wizard_root, "/wizard/");
        assert_eq!(config.static_root, "/static/");
        assert!(!config.verbose);
    }

    #[test]
    fn test_asset_url() {
        let config = WizardConfig::default();
        assert_eq!(
            config.asset_url("wizard/wizard.html"),
            "/static/wizard/wizard.html"
        );
    }
}
