// src/models.rs

use crate::constants::{
    DEFAULT_GROUP_NAME, DEFAULT_LOOKUP_PATH, DEFAULT_LOOKUP_TIMEOUT_SECS, DEFAULT_SCRIPT_ROOT, PLACEHOLDER_VALUE,
    ROOT_INDEX,
};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

// --- `chain.toml` MODELS (What is read from the configuration file) ---

/// Declares one selector of the chain: where it sits and which backend columns feed it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SelectorDecl {
    /// Form field name. Used to address the selector from the CLI and the API.
    pub name: String,
    /// Rank in the chain. `0` marks an independent root, `1..` the dependent sequence.
    pub index: usize,
    /// Backend column supplying option values (and the filter key for downstream lookups).
    pub value_field: String,
    /// Backend column supplying human-readable labels.
    pub display_field: String,
    /// Lookup table queried for options.
    pub table: String,
    /// Optional prompt shown by interactive front ends. Falls back to `name`.
    #[serde(default)]
    pub label: Option<String>,
}

impl SelectorDecl {
    /// A declaration without a label.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        value_field: impl Into<String>,
        display_field: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            value_field: value_field.into(),
            display_field: display_field.into(),
            table: table.into(),
            label: None,
        }
    }

    /// Roots have no upstream dependency and never contribute to filters.
    pub fn is_root(&self) -> bool {
        self.index == ROOT_INDEX
    }

    /// Text to prompt with: the label, else the name.
    pub fn prompt(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

fn default_script_root() -> String {
    DEFAULT_SCRIPT_ROOT.to_string()
}

fn default_lookup_path() -> String {
    DEFAULT_LOOKUP_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_SECS
}

/// The `[lookup]` table: how to reach the backend lookup endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LookupSettings {
    /// Scheme, host and port, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Application prefix mounted in front of the route.
    #[serde(default = "default_script_root")]
    pub script_root: String,
    /// The lookup route itself.
    #[serde(default = "default_lookup_path")]
    pub path: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LookupSettings {
    /// Settings for `base_url` with every other field at its default.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            script_root: default_script_root(),
            path: default_lookup_path(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Full URL of the lookup route, e.g. `http://host:5000/checker/login_values`.
    /// Empty segments are skipped so an unset `script_root` does not produce `//`.
    pub fn endpoint_url(&self) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        for segment in [&self.script_root, &self.path] {
            let segment = segment.trim_matches('/');
            if !segment.is_empty() {
                url.push('/');
                url.push_str(segment);
            }
        }
        url
    }
}

/// A `[[group]]` table: one form group, whose selectors form a chain of their own.
/// Successors are only ever looked for inside the same group.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupDecl {
    /// Identifier used by `--group`.
    pub name: String,
    /// Heading shown instead of the name.
    #[serde(default)]
    pub label: Option<String>,
    /// The group's `[[group.selector]]` entries.
    #[serde(default, rename = "selector")]
    pub selectors: Vec<SelectorDecl>,
}

impl GroupDecl {
    /// An unlabelled group.
    pub fn new(name: impl Into<String>, selectors: Vec<SelectorDecl>) -> Self {
        Self {
            name: name.into(),
            label: None,
            selectors,
        }
    }

    /// The heading to show for this group.
    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Represents the deserialized structure of a `chain.toml` file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Where lookups are sent.
    pub lookup: LookupSettings,
    /// Top-level `[[selector]]` entries, shorthand for a single group. Emptied by
    /// [`ChainConfig::normalize`].
    #[serde(default, rename = "selector", skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<SelectorDecl>,
    /// Independent form groups, in declaration order.
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupDecl>,
}

impl ChainConfig {
    /// Moves top-level selectors into a leading group named `default`.
    pub fn normalize(&mut self) {
        if !self.selectors.is_empty() {
            let selectors = std::mem::take(&mut self.selectors);
            self.groups
                .insert(0, GroupDecl::new(DEFAULT_GROUP_NAME, selectors));
        }
    }

    /// Looks a group up by name.
    pub fn group(&self, name: &str) -> Option<&GroupDecl> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Group names in declaration order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }
}

// --- RUNTIME MODELS ---

/// One entry of a selector's option list.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// Submitted value (`actualvalue`).
    pub value: String,
    /// Shown text (`displayvalue`).
    pub label: String,
    /// The leading hidden/disabled entry. Never selectable.
    pub placeholder: bool,
}

impl SelectOption {
    /// The leading hidden entry of a populated list.
    pub fn placeholder() -> Self {
        Self {
            value: PLACEHOLDER_VALUE.to_string(),
            label: String::new(),
            placeholder: true,
        }
    }

    /// A selectable option.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            placeholder: false,
        }
    }
}

impl From<LookupRecord> for SelectOption {
    fn from(record: LookupRecord) -> Self {
        Self::new(record.actual, record.display)
    }
}

/// Where a selector's option list currently stands.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub enum OptionsState {
    /// Never loaded, or invalidated by an upstream change.
    Empty,
    /// A lookup carrying `token` is in flight.
    Loading {
        /// Token of the pending lookup.
        token: u64,
    },
    /// Options hold the placeholder followed by the latest lookup result.
    Ready,
    /// A lookup was requested while upstream selections were still unset.
    Blocked {
        /// Unset upstream nodes, in index order.
        missing: Vec<String>,
    },
    /// The last lookup failed; the list is empty, the selection is dropped and `reason`
    /// is shown inline.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// A selector of the chain together with its mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorNode {
    /// The declaration the node was built from.
    pub decl: SelectorDecl,
    /// The confirmed value; `None` while unset.
    pub selected: Option<String>,
    /// Placeholder first, then the last lookup's records. Empty until loaded.
    pub options: Vec<SelectOption>,
    /// Where the option list stands.
    pub state: OptionsState,
    pub(crate) token: u64,
}

impl SelectorNode {
    /// A fresh node: nothing selected, nothing loaded.
    pub fn new(decl: SelectorDecl) -> Self {
        Self {
            decl,
            selected: None,
            options: Vec::new(),
            state: OptionsState::Empty,
            token: 0,
        }
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// The declared index.
    pub fn index(&self) -> usize {
        self.decl.index
    }

    /// Whether this is an independent root.
    pub fn is_root(&self) -> bool {
        self.decl.is_root()
    }

    /// The token of the most recent lookup issued for this node.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Options a user may actually pick (placeholder excluded).
    pub fn choices(&self) -> impl Iterator<Item = &SelectOption> {
        self.options.iter().filter(|o| !o.placeholder)
    }

    /// Whether `value` is currently selectable.
    pub fn has_choice(&self, value: &str) -> bool {
        self.choices().any(|o| o.value == value)
    }

    /// Drops the selection and options. Bumping the token turns any in-flight lookup stale.
    pub(crate) fn invalidate(&mut self) {
        self.token += 1;
        self.selected = None;
        self.options.clear();
        self.state = OptionsState::Empty;
    }
}

// --- LOOKUP WIRE MODELS ---

/// A single query against the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    /// Sent as `valuefield`.
    pub value_field: String,
    /// Sent as `displayfield`.
    pub display_field: String,
    /// Sent as `table`.
    pub table: String,
    /// `(field, value)` pairs from upstream selectors, in ascending chain order.
    pub filter: Vec<(String, String)>,
}

impl LookupRequest {
    /// A request for `decl`'s options narrowed by `filter`.
    pub fn for_selector(decl: &SelectorDecl, filter: Vec<(String, String)>) -> Self {
        Self {
            value_field: decl.value_field.clone(),
            display_field: decl.display_field.clone(),
            table: decl.table.clone(),
            filter,
        }
    }

    /// Renders the filter as `field=value` pairs joined by `&`.
    pub fn filter_string(&self) -> String {
        self.filter
            .iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// The complete ordered query: the three fixed parameters, then the filter pairs.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("valuefield".to_string(), self.value_field.clone()),
            ("displayfield".to_string(), self.display_field.clone()),
            ("table".to_string(), self.table.clone()),
        ];
        pairs.extend(self.filter.iter().cloned());
        pairs
    }
}

/// One `{ actualvalue, displayvalue }` row of a lookup response.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LookupRecord {
    /// The value an option submits.
    #[serde(rename = "actualvalue", deserialize_with = "scalar_as_string")]
    pub actual: String,
    /// The text an option shows.
    #[serde(rename = "displayvalue", deserialize_with = "scalar_as_string")]
    pub display: String,
}

impl LookupRecord {
    /// A record from its two values.
    pub fn new(actual: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            actual: actual.into(),
            display: display.into(),
        }
    }
}

/// The body returned by the lookup endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LookupResponse {
    /// Records in the order the backend returned them.
    pub data: Vec<LookupRecord>,
}

/// Lookup tables hand back text, integer or boolean keys. All of them become option strings.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string, number or boolean, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_segments() {
        let settings = LookupSettings::new("http://localhost:5000/");
        assert_eq!(
            settings.endpoint_url(),
            "http://localhost:5000/checker/login_values"
        );

        let bare = LookupSettings {
            script_root: String::new(),
            path: "/lookup/".to_string(),
            ..LookupSettings::new("http://example.org")
        };
        assert_eq!(bare.endpoint_url(), "http://example.org/lookup");
    }

    #[test]
    fn test_query_pairs_keep_filter_order() {
        let decl = SelectorDecl::new("login_station", 3, "stationid", "stationname", "lu_station");
        let request = LookupRequest::for_selector(
            &decl,
            vec![
                ("agency".to_string(), "SCCWRP".to_string()),
                ("datatype".to_string(), "trawl".to_string()),
            ],
        );

        assert_eq!(request.filter_string(), "agency=SCCWRP&datatype=trawl");

        let keys: Vec<_> = request.query_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["valuefield", "displayfield", "table", "agency", "datatype"]
        );
    }

    #[test]
    fn test_empty_filter_renders_empty_string() {
        let decl = SelectorDecl::new("login_agency", 1, "agency", "agencyname", "lu_agency");
        let request = LookupRequest::for_selector(&decl, Vec::new());
        assert_eq!(request.filter_string(), "");
        assert_eq!(request.query_pairs().len(), 3);
    }

    #[test]
    fn test_response_accepts_numeric_and_text_values() {
        let body = r#"{"data": [
            {"actualvalue": "a1", "displayvalue": "A One"},
            {"actualvalue": 42, "displayvalue": "Station 42"},
            {"actualvalue": true, "displayvalue": "Yes"}
        ]}"#;
        let response: LookupResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response.data,
            vec![
                LookupRecord::new("a1", "A One"),
                LookupRecord::new("42", "Station 42"),
                LookupRecord::new("true", "Yes"),
            ]
        );
    }

    #[test]
    fn test_response_rejects_null_values_and_missing_data() {
        let null_value = r#"{"data": [{"actualvalue": null, "displayvalue": "x"}]}"#;
        assert!(serde_json::from_str::<LookupResponse>(null_value).is_err());

        let no_data = r#"{"rows": []}"#;
        assert!(serde_json::from_str::<LookupResponse>(no_data).is_err());
    }

    #[test]
    fn test_choices_skip_placeholder() {
        let mut node = SelectorNode::new(SelectorDecl::new("a", 1, "f", "d", "t"));
        node.options = vec![SelectOption::placeholder(), SelectOption::new("a1", "A One")];

        assert!(node.has_choice("a1"));
        assert!(!node.has_choice(PLACEHOLDER_VALUE));
        assert_eq!(node.choices().count(), 1);
    }
}
