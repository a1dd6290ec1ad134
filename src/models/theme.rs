//! Blog theme model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Colour theme expressed as CSS custom properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: i64,
    pub theme_name: String,
    /// CSS variable name (`--accent-color1`) to value
    pub css_rules: BTreeMap<String, String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

impl Theme {
    /// Render the rules as a `:root` block
    pub fn to_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (name, value) in &self.css_rules {
            css.push_str(&format!("    {}: {};\n", name, value));
        }
        css.push_str("}\n");
        css
    }
}

/// Input for creating a user theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeInput {
    pub theme_name: String,
    pub css_rules: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_css() {
        let mut rules = BTreeMap::new();
        rules.insert("--accent-color1".to_string(), "#2a579a".to_string());
        rules.insert("--accent-color2".to_string(), "#1a365f".to_string());
        let theme = Theme {
            id: 1,
            theme_name: "Word Blue".to_string(),
            css_rules: rules,
            is_system: true,
            created_at: Utc::now(),
        };
        assert_eq!(
            theme.to_css(),
            ":root {\n    --accent-color1: #2a579a;\n    --accent-color2: #1a365f;\n}\n"
        );
    }
}
