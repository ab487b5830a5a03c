//! Query outcome type

use serde::Serialize;
use serde_json::Value;

use crate::filter::filter_attributes;

/// The immutable outcome of a permission query
///
/// Carries the unioned attribute patterns of every accepted grant;
/// `granted` is true exactly when at least one pattern was collected.
/// [`filter`](Permission::filter) projects a data object down to the
/// permitted fields.
#[derive(Debug, Clone, Serialize)]
pub struct Permission {
    granted: bool,
    attributes: Vec<String>,
}

impl Permission {
    pub(crate) fn new(attributes: Vec<String>) -> Self {
        Self {
            granted: !attributes.is_empty(),
            attributes,
        }
    }

    pub fn granted(&self) -> bool {
        self.granted
    }

    /// Attribute glob patterns unioned across all accepted grants
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Projects `data` down to the fields these attributes admit
    pub fn filter(&self, data: &Value) -> Value {
        filter_attributes(data, &self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_granted_follows_attributes() {
        assert!(!Permission::new(vec![]).granted());
        assert!(Permission::new(vec!["*".to_string()]).granted());
    }

    #[test]
    fn test_filter_delegates_to_attribute_patterns() {
        let permission =
            Permission::new(vec!["*".to_string(), "!password".to_string()]);
        let data = json!({"name": "x", "password": "y"});
        assert_eq!(permission.filter(&data), json!({"name": "x"}));
    }

    #[test]
    fn test_denied_permission_filters_to_empty() {
        let permission = Permission::new(vec![]);
        assert_eq!(permission.filter(&json!({"a": 1})), json!({}));
    }
}
