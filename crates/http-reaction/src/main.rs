//! Forwards query result changes as HTTP calls.
//!
//! Each query's configuration file describes the call to make for added,
//! updated, and deleted results. URLs, bodies, and header values are
//! templates in which `{{path.to.field}}` placeholders resolve against the
//! result record: `after.*` for the new state, `before.*` for the old.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use drasi_reaction::{config_value, config_value_or, init_logging, ChangeEvent, ReactionBuilder};

/// One outbound call description.
#[derive(Debug, Clone, Deserialize)]
struct CallSpec {
    url: String,
    method: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    headers: HashMap<String, String>,
}

/// Per-query configuration: the call to make for each kind of delta.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct QueryConfig {
    added: Option<CallSpec>,
    updated: Option<CallSpec>,
    deleted: Option<CallSpec>,
}

struct CallerSettings {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl CallerSettings {
    fn from_env() -> anyhow::Result<Self> {
        let base_url = config_value("baseUrl").context("baseUrl is not configured")?;
        let timeout_ms = config_value_or("timeoutMs", "10000")
            .parse::<u64>()
            .context("timeoutMs is not a number")?;
        Ok(CallerSettings {
            base_url,
            token: config_value("token"),
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

struct HttpCaller {
    client: Client,
    settings: CallerSettings,
}

impl HttpCaller {
    fn new(settings: CallerSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(HttpCaller { client, settings })
    }

    async fn handle_change(
        &self,
        event: ChangeEvent,
        config: Option<Arc<QueryConfig>>,
    ) -> anyhow::Result<()> {
        let config = match config {
            Some(config) => config,
            None => {
                debug!(
                    "Query {} has no call configuration; nothing to forward",
                    event.query_id
                );
                return Ok(());
            }
        };

        for added in &event.added_results {
            if let Some(spec) = &config.added {
                self.call(spec, &json!({"after": added})).await?;
            }
        }
        for updated in &event.updated_results {
            if let Some(spec) = &config.updated {
                let context = json!({"before": &updated.before, "after": &updated.after});
                self.call(spec, &context).await?;
            }
        }
        for deleted in &event.deleted_results {
            if let Some(spec) = &config.deleted {
                self.call(spec, &json!({"before": deleted})).await?;
            }
        }
        Ok(())
    }

    async fn call(&self, spec: &CallSpec, context: &Value) -> anyhow::Result<()> {
        let url = format!(
            "{}{}",
            self.settings.base_url,
            render_template(&spec.url, context)
        );
        let method = Method::from_bytes(spec.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method `{}`", spec.method))?;
        debug!("Calling {} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.settings.token {
            request = request.bearer_auth(token);
        }
        for (name, value) in &spec.headers {
            let name = HeaderName::try_from(name.as_str())
                .with_context(|| format!("Invalid header name `{}`", name))?;
            let value = HeaderValue::try_from(render_template(value, context))
                .with_context(|| format!("Invalid value for header `{}`", name))?;
            request = request.header(name, value);
        }
        if let Some(body) = &spec.body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(render_template(body, context));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Call to {} failed with status {}: {}", url, status, detail);
        }
        Ok(())
    }
}

/// Replaces `{{path.to.field}}` placeholders with values from `context`.
///
/// Missing paths render as empty strings; an unterminated placeholder is
/// left in place. String values render unquoted, everything else as JSON.
fn render_template(template: &str, context: &Value) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = match after_open.find("}}") {
            Some(end) => end,
            None => {
                rendered.push_str(&rest[start..]);
                return rendered;
            }
        };
        match lookup_path(context, after_open[..end].trim()) {
            Some(Value::String(text)) => rendered.push_str(text),
            Some(value) => rendered.push_str(&value.to_string()),
            None => {}
        }
        rest = &after_open[end + 2..];
    }

    rendered.push_str(rest);
    rendered
}

fn lookup_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let settings = CallerSettings::from_env()?;
    info!("Forwarding query result changes to {}", settings.base_url);
    let caller = Arc::new(HttpCaller::new(settings)?);

    let reaction = ReactionBuilder::new()
        .with_yaml_query_configs()
        .on_change_event(move |event: ChangeEvent, config: Option<Arc<QueryConfig>>| {
            let caller = caller.clone();
            async move { caller.handle_change(event, config).await }
        })
        .build()
        .context("Failed to build the reaction")?;

    reaction.start().await.context("Reaction server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method as http_method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn templates_resolve_nested_paths() {
        let context = json!({"after": {"roomId": "r1", "comfortLevel": 44}});
        assert_eq!(
            render_template("/rooms/{{after.roomId}}/level/{{after.comfortLevel}}", &context),
            "/rooms/r1/level/44"
        );
    }

    #[test]
    fn missing_paths_render_empty() {
        let context = json!({"after": {}});
        assert_eq!(
            render_template("/rooms/{{after.roomId}}", &context),
            "/rooms/"
        );
    }

    #[test]
    fn unterminated_placeholders_are_left_in_place() {
        let context = json!({});
        assert_eq!(
            render_template("/rooms/{{after.roomId", &context),
            "/rooms/{{after.roomId"
        );
    }

    #[test]
    fn non_string_values_render_as_json() {
        let context = json!({"after": {"tags": ["a", "b"], "level": 44.5}});
        assert_eq!(
            render_template("{{after.tags}} at {{after.level}}", &context),
            r#"["a","b"] at 44.5"#
        );
    }

    #[test]
    fn query_configs_parse_call_specs() {
        let config: QueryConfig = serde_yaml::from_str(
            r#"
added:
  url: /rooms/{{after.roomId}}
  method: POST
  body: '{"level": {{after.comfortLevel}}}'
"#,
        )
        .unwrap();

        let added = config.added.unwrap();
        assert_eq!(added.method, "POST");
        assert_eq!(added.url, "/rooms/{{after.roomId}}");
        assert!(added.headers.is_empty());
        assert!(config.updated.is_none());
        assert!(config.deleted.is_none());
    }

    #[tokio::test]
    async fn added_results_trigger_the_configured_call() {
        let server = MockServer::start().await;
        Mock::given(http_method("POST"))
            .and(path("/rooms/r1"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({"level": 44})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let caller = HttpCaller::new(CallerSettings {
            base_url: server.uri(),
            token: Some("secret".to_string()),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let config = QueryConfig {
            added: Some(CallSpec {
                url: "/rooms/{{after.roomId}}".to_string(),
                method: "post".to_string(),
                body: Some(r#"{"level": {{after.comfortLevel}}}"#.to_string()),
                headers: HashMap::new(),
            }),
            updated: None,
            deleted: None,
        };

        let event: ChangeEvent = serde_json::from_value(json!({
            "queryId": "room-comfort",
            "sequence": 1,
            "addedResults": [{"roomId": "r1", "comfortLevel": 44}]
        }))
        .unwrap();

        caller
            .handle_change(event, Some(Arc::new(config)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_calls_surface_the_status() {
        let server = MockServer::start().await;
        Mock::given(http_method("POST"))
            .and(path("/rooms/r9"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .mount(&server)
            .await;

        let caller = HttpCaller::new(CallerSettings {
            base_url: server.uri(),
            token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let config = QueryConfig {
            added: Some(CallSpec {
                url: "/rooms/{{after.roomId}}".to_string(),
                method: "POST".to_string(),
                body: None,
                headers: HashMap::new(),
            }),
            updated: None,
            deleted: None,
        };

        let event: ChangeEvent = serde_json::from_value(json!({
            "queryId": "room-comfort",
            "sequence": 2,
            "addedResults": [{"roomId": "r9"}]
        }))
        .unwrap();

        let err = caller
            .handle_change(event, Some(Arc::new(config)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("try later"));
    }
}
