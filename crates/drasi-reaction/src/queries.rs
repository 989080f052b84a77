//! Query configuration discovery
//!
//! A reaction learns which continuous queries it serves from a directory of
//! per-query files: each regular file maps to one query, the file stem is
//! the query id, and the file contents are an optional, caller-defined
//! configuration payload.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ReactionError, ReactionResult};

/// Strategy for turning a query configuration file into a typed value.
///
/// Returning `Ok(None)` means the file carries no configuration (for
/// example an empty file used purely to declare the query).
pub trait QueryConfigParser<Q>: Send + Sync {
    fn parse(&self, raw: &[u8]) -> ReactionResult<Option<Q>>;
}

impl<Q, F> QueryConfigParser<Q> for F
where
    F: Fn(&[u8]) -> ReactionResult<Option<Q>> + Send + Sync,
{
    fn parse(&self, raw: &[u8]) -> ReactionResult<Option<Q>> {
        self(raw)
    }
}

/// Parses query configuration files as YAML.
///
/// Empty files and files containing only `null` yield no configuration.
pub struct YamlQueryConfigParser;

impl<Q: DeserializeOwned> QueryConfigParser<Q> for YamlQueryConfigParser {
    fn parse(&self, raw: &[u8]) -> ReactionResult<Option<Q>> {
        serde_yaml::from_slice::<Option<Q>>(raw)
            .map_err(|e| ReactionError::QueryConfig(format!("YAML error: {}", e)))
    }
}

/// Parses query configuration files as JSON. Empty files yield no
/// configuration.
pub struct JsonQueryConfigParser;

impl<Q: DeserializeOwned> QueryConfigParser<Q> for JsonQueryConfigParser {
    fn parse(&self, raw: &[u8]) -> ReactionResult<Option<Q>> {
        let trimmed = raw
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map(|start| &raw[start..])
            .unwrap_or_default();
        if trimmed.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice::<Option<Q>>(trimmed)
            .map_err(|e| ReactionError::QueryConfig(format!("JSON error: {}", e)))
    }
}

/// Scans `directory` and builds the query id to configuration map.
///
/// Hidden files (leading `.`) and anything that is not a regular file are
/// skipped. Without a parser every discovered query maps to `None`. A
/// missing directory is not an error; it logs a warning and yields an
/// empty map, so the reaction starts with zero subscriptions.
///
/// Any unreadable or unparsable file fails the whole scan. Queries are
/// wired up once at startup, so a partially applied configuration would
/// silently drop subscriptions.
pub fn load_query_configs<Q>(
    directory: &Path,
    parser: Option<&dyn QueryConfigParser<Q>>,
) -> ReactionResult<HashMap<String, Option<Arc<Q>>>> {
    let mut configs = HashMap::new();

    if !directory.is_dir() {
        warn!(
            "Query configuration directory `{}` does not exist; no queries will be subscribed",
            directory.display()
        );
        return Ok(configs);
    }

    let entries = fs::read_dir(directory).map_err(|e| {
        ReactionError::QueryConfig(format!(
            "Failed to read query configuration directory `{}`: {}",
            directory.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            ReactionError::QueryConfig(format!(
                "Failed to read query configuration directory `{}`: {}",
                directory.display(),
                e
            ))
        })?;
        let path = entry.path();

        let file_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => {
                debug!("Skipping non-UTF-8 file name in `{}`", directory.display());
                continue;
            }
        };
        if file_name.starts_with('.') || !path.is_file() {
            continue;
        }

        let query_id = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };

        let config = match parser {
            Some(parser) => {
                let raw = fs::read(&path).map_err(|e| {
                    ReactionError::QueryConfig(format!(
                        "Failed to read query configuration `{}`: {}",
                        path.display(),
                        e
                    ))
                })?;
                parser.parse(&raw).map_err(|e| {
                    let detail = match e {
                        ReactionError::QueryConfig(message) => message,
                        other => other.to_string(),
                    };
                    ReactionError::QueryConfig(format!(
                        "Failed to parse query configuration `{}`: {}",
                        path.display(),
                        detail
                    ))
                })?
            }
            None => None,
        };

        debug!(
            "Discovered query `{}` from `{}` (configured: {})",
            query_id,
            path.display(),
            config.is_some()
        );
        configs.insert(query_id, config.map(Arc::new));
    }

    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Write as _;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn yaml_parser_reads_mappings_and_empty_files() {
        let parser = YamlQueryConfigParser;
        let parsed: Option<Value> =
            QueryConfigParser::parse(&parser, b"threshold: 5\n").unwrap();
        assert_eq!(parsed.unwrap()["threshold"], Value::from(5));

        let empty: Option<Value> = QueryConfigParser::parse(&parser, b"").unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn json_parser_reads_objects_and_blank_files() {
        let parser = JsonQueryConfigParser;
        let parsed: Option<Value> =
            QueryConfigParser::parse(&parser, br#"{"threshold": 5}"#).unwrap();
        assert_eq!(parsed.unwrap()["threshold"], Value::from(5));

        let blank: Option<Value> = QueryConfigParser::parse(&parser, b"  \n").unwrap();
        assert!(blank.is_none());
    }

    #[test]
    fn scan_skips_hidden_files_and_uses_file_stems() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "query1.yaml", "threshold: 5\n");
        write_file(dir.path(), "query2", "");
        write_file(dir.path(), ".hidden", "threshold: 9\n");

        let configs =
            load_query_configs::<Value>(dir.path(), Some(&YamlQueryConfigParser)).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(
            configs["query1"].as_deref().unwrap()["threshold"],
            Value::from(5)
        );
        assert!(configs["query2"].is_none());
        assert!(!configs.contains_key(".hidden"));
        assert!(!configs.contains_key("hidden"));
    }

    #[test]
    fn scan_without_a_parser_maps_every_query_to_none() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "query1.yaml", "threshold: 5\n");

        let configs = load_query_configs::<Value>(dir.path(), None).unwrap();
        assert!(configs["query1"].is_none());
    }

    #[test]
    fn missing_directory_yields_an_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let configs = load_query_configs::<Value>(&missing, None).unwrap();
        assert!(configs.is_empty());
    }

    #[test]
    fn unparsable_file_fails_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bad.json", "{not json");

        let result = load_query_configs::<Value>(dir.path(), Some(&JsonQueryConfigParser));
        assert!(matches!(result, Err(ReactionError::QueryConfig(_))));
    }

    #[test]
    fn directories_inside_the_config_directory_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        write_file(dir.path(), "query1", "");

        let configs = load_query_configs::<Value>(dir.path(), None).unwrap();
        assert_eq!(configs.len(), 1);
        assert!(configs.contains_key("query1"));
    }
}
