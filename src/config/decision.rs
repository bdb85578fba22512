//! Player decision inputs: cache TTLs, locale pattern, metrics selectors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionConfig {
    /// How long a metrics snapshot is reused. Damps oscillation while the
    /// counters are still being rendered.
    pub metrics_ttl_ms: f64,

    /// How long a locale snapshot is reused.
    pub locale_ttl_ms: f64,

    /// Case-insensitive pattern for the target region's language codes and
    /// native-script tokens.
    pub regional_locale_pattern: String,

    /// Element holding the view counter text.
    pub views_selector: String,

    /// Element holding the comment counter text.
    pub comments_selector: String,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            metrics_ttl_ms: 2000.0,
            locale_ttl_ms: 5000.0,
            regional_locale_pattern: r"(?i)^(ja|jp)([-_].*)?$|[-_]jp$|日本".into(),
            views_selector: r#"[data-name="view-counter"] [data-name="value"]"#.into(),
            comments_selector: r#"[data-name="comment-counter"] [data-name="value"]"#.into(),
        }
    }
}

impl DecisionConfig {
    pub fn validate(&mut self) {
        self.metrics_ttl_ms = self.metrics_ttl_ms.clamp(0.0, 60_000.0);
        self.locale_ttl_ms = self.locale_ttl_ms.clamp(0.0, 60_000.0);
    }
}
