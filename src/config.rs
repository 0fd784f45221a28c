//! Tree configuration.
//!
//! [`TreeConfig`] is the runtime configuration shared by a builder and every
//! node it produces: the children field name and an optional comparator.
//!
//! [`Settings`] is its declarative, serializable counterpart with layered
//! loading. Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML file (optional path)
//! 3. Environment variables: `RSTREE_*` prefix

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::errors::{TreeError, TreeResult};
use crate::record::Record;

pub const DEFAULT_CHILDREN_FIELD_NAME: &str = "children";

/// Three-way ordering of two records.
pub type Comparator<R> = Rc<dyn Fn(&R, &R) -> Ordering>;

/// Runtime configuration of a builder and the nodes it creates.
pub struct TreeConfig<R> {
    children_field_name: String,
    comparator: Option<Comparator<R>>,
}

impl<R> Default for TreeConfig<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for TreeConfig<R> {
    fn clone(&self) -> Self {
        Self {
            children_field_name: self.children_field_name.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<R> fmt::Debug for TreeConfig<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeConfig")
            .field("children_field_name", &self.children_field_name)
            .field("comparator", &self.comparator.as_ref().map(|_| "Fn"))
            .finish()
    }
}

impl<R> TreeConfig<R> {
    pub fn new() -> Self {
        Self {
            children_field_name: DEFAULT_CHILDREN_FIELD_NAME.to_string(),
            comparator: None,
        }
    }

    pub fn with_children_field_name(mut self, name: impl Into<String>) -> Self {
        self.children_field_name = name.into();
        self
    }

    /// Keep children ordered by `comparator` (`Less` means `a` goes first).
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&R, &R) -> Ordering + 'static,
    {
        self.comparator = Some(Rc::new(comparator));
        self
    }

    pub fn children_field_name(&self) -> &str {
        &self.children_field_name
    }

    pub fn comparator(&self) -> Option<&Comparator<R>> {
        self.comparator.as_ref()
    }

    pub fn has_comparator(&self) -> bool {
        self.comparator.is_some()
    }
}

/// Direction of a declarative sort.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(TreeError::Config {
                message: format!("invalid sort order '{other}', expected 'asc' or 'desc'"),
            }),
        }
    }
}

/// Order children by a scalar field of their records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortSettings {
    pub key: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSettings {
    /// Comparator over records.
    ///
    /// Records missing the key sort after the ones carrying it, in either order.
    pub fn comparator<R: Record>(&self) -> impl Fn(&R, &R) -> Ordering + 'static {
        let key = self.key.clone();
        let order = self.order;
        move |a: &R, b: &R| match (a.sort_key(&key), b.sort_key(&key)) {
            (Some(x), Some(y)) => match order {
                SortOrder::Asc => x.cmp(&y),
                SortOrder::Desc => y.cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Declarative tree settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Record field holding nested children (default: "children")
    pub children_field_name: String,
    /// Optional field based ordering of children
    pub sort: Option<SortSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            children_field_name: DEFAULT_CHILDREN_FIELD_NAME.to_string(),
            sort: None,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub children_field_name: Option<String>,
    pub sort: Option<SortSettings>,
}

fn load_raw_settings(path: &Path) -> TreeResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| TreeError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| TreeError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Runtime configuration for records of type `R`.
    pub fn tree_config<R: Record>(&self) -> TreeConfig<R> {
        let config = TreeConfig::new().with_children_field_name(&self.children_field_name);
        match &self.sort {
            Some(sort) => config.with_comparator(sort.comparator::<R>()),
            None => config,
        }
    }

    /// Parse settings from TOML text, unspecified fields keep their defaults.
    pub fn from_toml_str(content: &str) -> TreeResult<Self> {
        let raw: RawSettings = toml::from_str(content).map_err(|e| TreeError::Config {
            message: format!("parse settings: {e}"),
        })?;
        Ok(Self::default().merge_with(&raw))
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            children_field_name: overlay
                .children_field_name
                .clone()
                .unwrap_or_else(|| self.children_field_name.clone()),
            sort: overlay.sort.clone().or_else(|| self.sort.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. `path`, when given and existing
    /// 3. Environment variables: `RSTREE_CHILDREN_FIELD_NAME`, `RSTREE_SORT__KEY`,
    ///    `RSTREE_SORT__ORDER`
    pub fn load(path: Option<&Path>) -> TreeResult<Self> {
        let mut current = Self::default();

        if let Some(path) = path {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        tracing::debug!(?current, "settings loaded");
        Ok(current)
    }

    /// Apply RSTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> TreeResult<Self> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("RSTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("children_field_name") {
            settings.children_field_name = val;
        }

        let key = config.get_string("sort.key").ok();
        let order = config
            .get_string("sort.order")
            .ok()
            .map(|o| o.parse::<SortOrder>())
            .transpose()?;

        match (key, order, settings.sort.as_mut()) {
            (Some(key), order, Some(sort)) => {
                sort.key = key;
                if let Some(order) = order {
                    sort.order = order;
                }
            }
            (Some(key), order, None) => {
                settings.sort = Some(SortSettings {
                    key,
                    order: order.unwrap_or_default(),
                });
            }
            (None, Some(order), Some(sort)) => sort.order = order,
            (None, Some(_), None) => {
                return Err(TreeError::Config {
                    message: "sort order given without a sort key".to_string(),
                });
            }
            (None, None, _) => {}
        }

        Ok(settings)
    }

    /// Show the effective settings as TOML.
    pub fn to_toml(&self) -> TreeResult<String> {
        toml::to_string_pretty(self).map_err(|e| TreeError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template settings file.
    pub fn template() -> String {
        r#"# rstree configuration
#
# Precedence (lowest to highest):
#   compiled defaults, this file, RSTREE_* environment variables
#   (RSTREE_CHILDREN_FIELD_NAME, RSTREE_SORT__KEY, RSTREE_SORT__ORDER)

# Record field holding nested children
# children_field_name = "children"

# Keep children ordered by a scalar record field
# [sort]
# key = "id"
# order = "asc"  # or "desc"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> TreeError {
    TreeError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_no_options_when_creating_config_then_uses_defaults() {
        let config: TreeConfig<serde_json::Value> = TreeConfig::default();
        assert_eq!(config.children_field_name(), "children");
        assert!(!config.has_comparator());
    }

    #[test]
    fn given_template_when_parsed_then_yields_defaults() {
        let settings = Settings::from_toml_str(&Settings::template()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn given_partial_toml_when_parsed_then_missing_fields_keep_defaults() {
        let settings = Settings::from_toml_str("[sort]\nkey = \"id\"\n").unwrap();
        assert_eq!(settings.children_field_name, "children");
        assert_eq!(
            settings.sort,
            Some(SortSettings {
                key: "id".into(),
                order: SortOrder::Asc
            })
        );
    }

    #[test]
    fn given_invalid_toml_when_parsed_then_returns_config_error() {
        let err = Settings::from_toml_str("children_field_name = [").unwrap_err();
        assert!(matches!(err, TreeError::Config { .. }));
    }

    #[test]
    fn given_desc_sort_when_comparing_then_missing_keys_sort_last() {
        let sort = SortSettings {
            key: "id".into(),
            order: SortOrder::Desc,
        };
        let cmp = sort.comparator::<serde_json::Value>();
        assert_eq!(cmp(&json!({"id": 2}), &json!({"id": 1})), Ordering::Less);
        assert_eq!(cmp(&json!({"id": 1}), &json!({})), Ordering::Less);
        assert_eq!(cmp(&json!({}), &json!({"id": 1})), Ordering::Greater);
    }

    #[test]
    fn given_settings_when_serialized_then_round_trips_through_toml() {
        let settings = Settings {
            children_field_name: "deps".into(),
            sort: Some(SortSettings {
                key: "name".into(),
                order: SortOrder::Desc,
            }),
        };
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn given_sort_order_strings_when_parsed_then_accepts_known_values() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
