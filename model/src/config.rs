use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Feature switches, by name.
pub type Toggles = BTreeMap<String, bool>;

/// Site-wide singleton holding feature toggles and free-form properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub toggles: Toggles,
    pub properties: BTreeMap<String, String>,
}

/// A single entry of the [`ApplicationConfig`], written on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppConfigProperty {
    Toggle { name: String, enabled: bool },
    Text { name: String, value: String },
}

impl ApplicationConfig {
    /// Unknown toggles are off.
    pub fn is_enabled(&self, toggle: &str) -> bool {
        self.toggles.get(toggle).copied().unwrap_or(false)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn apply(&mut self, property: AppConfigProperty) {
        match property {
            AppConfigProperty::Toggle { name, enabled } => {
                self.toggles.insert(name, enabled);
            }
            AppConfigProperty::Text { name, value } => {
                self.properties.insert(name, value);
            }
        }
    }
}

impl AppConfigProperty {
    pub fn name(&self) -> &str {
        match self {
            AppConfigProperty::Toggle { name, .. } | AppConfigProperty::Text { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overwrites_single_entry() {
        let mut config = ApplicationConfig::default();
        config.apply(AppConfigProperty::Toggle {
            name: "searchable".into(),
            enabled: true,
        });
        config.apply(AppConfigProperty::Text {
            name: "motd".into(),
            value: "hello".into(),
        });
        config.apply(AppConfigProperty::Toggle {
            name: "searchable".into(),
            enabled: false,
        });

        assert!(!config.is_enabled("searchable"));
        assert!(!config.is_enabled("never-set"));
        assert_eq!(config.property("motd"), Some("hello"));
    }

    #[test]
    fn json_shape_is_stable() {
        let property = AppConfigProperty::Toggle {
            name: "writable".into(),
            enabled: true,
        };
        let json = serde_json::to_value(&property).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Toggle": { "name": "writable", "enabled": true } })
        );
    }
}
