//! Decoding of lock command output
//!
//! Raw output is matched with a configured regex. JSON output is recognized
//! by shape, trying in order:
//!
//! 1. flat object: `{"pkg": "1.0.0"}` (only when no value is an object or array)
//! 2. array of objects: `[{"name": "pkg", "version": "1.0.0", "dependencies": {...}}]`
//!    (pnpm ls), with configurable name/version keys
//! 3. dependency tree: `{"dependencies": {...}}` (npm ls), `{"packages": {...}}`
//!    (package-lock v3) and `{"data": {"trees": [{"name": "pkg@1.0.0"}]}}` (yarn list)

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::LockCommandExtractionCfg;
use crate::lock::error::LockError;
use crate::lock::extract::PatternExtractor;

const DEFAULT_NAME_KEY: &str = "name";
const DEFAULT_VERSION_KEY: &str = "version";

/// Output format of a lock command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Raw,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Raw => "raw",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Ok(OutputFormat::Json),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(LockError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Decode command output into a name to version map.
///
/// Blank output decodes to an empty map.
pub fn decode_command_output(
    output: &[u8],
    extraction: Option<&LockCommandExtractionCfg>,
) -> Result<IndexMap<String, String>, LockError> {
    decode_with(&PatternExtractor::new(), output, extraction)
}

pub(crate) fn decode_with(
    extractor: &PatternExtractor,
    output: &[u8],
    extraction: Option<&LockCommandExtractionCfg>,
) -> Result<IndexMap<String, String>, LockError> {
    let text = String::from_utf8_lossy(output);
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Ok(IndexMap::new());
    }

    let format: OutputFormat = extraction
        .and_then(|e| e.format.as_deref())
        .unwrap_or_default()
        .parse()?;

    match format {
        OutputFormat::Json => {
            let name_key = extraction
                .and_then(|e| e.json_name_key.as_deref())
                .filter(|k| !k.is_empty())
                .unwrap_or(DEFAULT_NAME_KEY);
            let version_key = extraction
                .and_then(|e| e.json_version_key.as_deref())
                .filter(|k| !k.is_empty())
                .unwrap_or(DEFAULT_VERSION_KEY);
            decode_json(text, name_key, version_key)
        }
        OutputFormat::Raw => {
            let pattern = extraction
                .and_then(|e| e.pattern.as_deref())
                .filter(|p| !p.is_empty())
                .ok_or(LockError::MissingRawPattern)?;
            extractor.extract_raw(text, pattern)
        }
    }
}

fn decode_json(
    text: &str,
    name_key: &str,
    version_key: &str,
) -> Result<IndexMap<String, String>, LockError> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        debug!("Lock command output is not valid JSON: {}", e);
        LockError::UnrecognizedOutput
    })?;

    if let Value::Object(map) = &value
        && let Some(flat) = decode_flat(map)
    {
        debug!("Decoded lock command output as flat object");
        return Ok(flat);
    }

    if let Value::Array(items) = &value
        && items.iter().all(|item| item.is_object() || item.is_null())
    {
        debug!("Decoded lock command output as array of objects");
        return Ok(decode_array(items, name_key, version_key));
    }

    if let Value::Object(map) = &value {
        let tree = decode_tree(map);
        if !tree.is_empty() {
            debug!("Decoded lock command output as dependency tree");
            return Ok(tree);
        }
    }

    Err(LockError::UnrecognizedOutput)
}

/// `{"pkg": "1.0.0"}`; `None` when any value is nested or nothing usable is found
fn decode_flat(map: &Map<String, Value>) -> Option<IndexMap<String, String>> {
    if map.values().any(|v| v.is_object() || v.is_array()) {
        return None;
    }

    let results: IndexMap<String, String> = map
        .iter()
        .filter_map(|(name, value)| non_empty_str(value).map(|v| (name.clone(), v.to_string())))
        .collect();

    (!results.is_empty()).then_some(results)
}

fn decode_array(items: &[Value], name_key: &str, version_key: &str) -> IndexMap<String, String> {
    let mut results = IndexMap::new();

    for item in items.iter().filter_map(Value::as_object) {
        if let (Some(name), Some(version)) = (
            item.get(name_key).and_then(non_empty_str),
            item.get(version_key).and_then(non_empty_str),
        ) {
            results.insert(name.to_string(), version.to_string());
        }

        for key in ["dependencies", "devDependencies"] {
            if let Some(deps) = item.get(key).and_then(Value::as_object) {
                collect_nested_dependencies(deps, &mut results);
            }
        }
    }

    results
}

fn decode_tree(map: &Map<String, Value>) -> IndexMap<String, String> {
    let mut results = IndexMap::new();

    if let Some(deps) = map.get("dependencies").and_then(Value::as_object) {
        collect_nested_dependencies(deps, &mut results);
    }

    if let Some(packages) = map.get("packages").and_then(Value::as_object) {
        for (key, info) in packages {
            let name = key.strip_prefix("node_modules/").unwrap_or(key);
            if name.is_empty() {
                // the root project is keyed ""
                continue;
            }
            if let Some(version) = info.get("version").and_then(non_empty_str) {
                results.insert(name.to_string(), version.to_string());
            }
        }
    }

    if let Some(trees) = map
        .get("data")
        .and_then(|data| data.get("trees"))
        .and_then(Value::as_array)
    {
        for name_at_version in trees
            .iter()
            .filter_map(|tree| tree.get("name"))
            .filter_map(non_empty_str)
        {
            if let (name, Some(version)) = split_name_at_version(name_at_version)
                && !version.is_empty()
            {
                results.insert(name.to_string(), version.to_string());
            }
        }
    }

    results
}

/// npm ls style `{"pkg": {"version": "1.0.0", "dependencies": {...}}}`, recursively
pub fn collect_nested_dependencies(deps: &Map<String, Value>, results: &mut IndexMap<String, String>) {
    for (name, info) in deps {
        let Some(info) = info.as_object() else {
            continue;
        };

        if let Some(version) = info.get("version").and_then(non_empty_str) {
            results.insert(name.clone(), version.to_string());
        }

        if let Some(nested) = info.get("dependencies").and_then(Value::as_object) {
            collect_nested_dependencies(nested, results);
        }
    }
}

/// Split yarn's `name@version`, keeping the `@` that opens a scoped name.
///
/// - `lodash@4.17.21` -> (`lodash`, Some(`4.17.21`))
/// - `@babel/core@7.26.0` -> (`@babel/core`, Some(`7.26.0`))
/// - `@babel/core` -> (`@babel/core`, None)
pub fn split_name_at_version(name_at_version: &str) -> (&str, Option<&str>) {
    let Some(last_at) = name_at_version.rfind('@').filter(|at| *at > 0) else {
        return (name_at_version, None);
    };

    if name_at_version.starts_with('@') {
        match name_at_version.find('/') {
            Some(slash) if last_at > slash => {}
            _ => return (name_at_version, None),
        }
    }

    (&name_at_version[..last_at], Some(&name_at_version[last_at + 1..]))
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}
