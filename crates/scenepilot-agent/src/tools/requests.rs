//! Request tools — one tool per HTTP verb class of the reduced description.
//!
//! `requests_get` knows every GET endpoint, `requests_post` every POST
//! endpoint, and so on. The model passes a small JSON object:
//!
//! ```text
//! {"url": "/objects/{object_id}", "params": {"object_id": 42}, "data": {"color": "red"}}
//! ```
//!
//! The tool matches the path against its endpoint templates, validates the
//! required parameters, sends the request through a [`RequestExecutor`] and
//! returns the (truncated) response body as the observation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::form_urlencoded;

use scenepilot_core::apispec::{
    HttpMethod, ParamLocation, ReducedEndpoint, ReducedParameter, ReducedSpec, WHOLE_BODY_PARAM,
};
use scenepilot_core::utils::truncate_string;

use super::base::{Tool, ToolError};
use super::executor::{HttpRequest, RequestExecutor};

/// Observations longer than this many characters are cut.
pub const DEFAULT_MAX_RESPONSE_LENGTH: usize = 5000;

// ─────────────────────────────────────────────
// ReducedTool — one endpoint
// ─────────────────────────────────────────────

/// One endpoint of the reduced description, as seen by the request tools.
#[derive(Clone, Debug, PartialEq)]
pub struct ReducedTool {
    /// Unique within a registry: the operationId, or `<method>_<path>`.
    pub name: String,
    pub http_method: HttpMethod,
    pub url_template: String,
    pub description: String,
    pub parameter_schema: Vec<ReducedParameter>,
}

impl ReducedTool {
    pub fn from_endpoint(endpoint: &ReducedEndpoint) -> Self {
        let name = endpoint
            .operation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .unwrap_or_else(|| derive_name(endpoint.method, &endpoint.path));

        Self {
            name,
            http_method: endpoint.method,
            url_template: endpoint.path.clone(),
            description: endpoint.description.clone(),
            parameter_schema: endpoint.parameters.clone(),
        }
    }

    /// True when the body is sent as one value rather than named fields.
    pub fn takes_whole_body(&self) -> bool {
        let mut body = self
            .parameter_schema
            .iter()
            .filter(|p| p.location == ParamLocation::Body);
        matches!((body.next(), body.next()), (Some(p), None) if p.name == WHOLE_BODY_PARAM)
    }

    /// Bind this template to a concrete path.
    ///
    /// `{param}` segments match any non-empty segment; returns the bound
    /// `(name, value)` pairs, or `None` if the path doesn't fit.
    pub fn match_path(&self, path: &str) -> Option<Vec<(String, String)>> {
        let template: Vec<&str> = segments(&self.url_template).collect();
        let actual: Vec<&str> = segments(path).collect();
        if template.len() != actual.len() {
            return None;
        }

        let mut bindings = Vec::new();
        for (t, a) in template.iter().zip(actual.iter()) {
            match placeholder(t) {
                Some(name) => {
                    if a.is_empty() || placeholder(a).is_some() {
                        return None;
                    }
                    bindings.push((name.to_string(), a.to_string()));
                }
                None if t == a => {}
                None => return None,
            }
        }
        Some(bindings)
    }

    fn literal_segments(&self) -> usize {
        segments(&self.url_template)
            .filter(|s| placeholder(s).is_none())
            .count()
    }

    /// One line for the tool description.
    pub fn summary_line(&self) -> String {
        let mut line = format!("{} {}", self.http_method, self.url_template);
        if !self.description.is_empty() {
            line.push_str(": ");
            line.push_str(&self.description);
        }
        if !self.parameter_schema.is_empty() {
            let params: Vec<String> = self
                .parameter_schema
                .iter()
                .map(|p| {
                    let required = if p.required { ", required" } else { "" };
                    format!("{} ({} {}{})", p.name, p.location, p.param_type, required)
                })
                .collect();
            line.push_str(" | params: ");
            line.push_str(&params.join(", "));
        }
        line
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty())
}

fn placeholder(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|s| !s.is_empty())
}

/// `GET /objects/{object_id}` → `get_objects_object_id`.
fn derive_name(method: HttpMethod, path: &str) -> String {
    let mut parts = vec![method.lower().to_string()];
    for segment in segments(path) {
        let cleaned: String = segment
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let cleaned = cleaned.trim_matches('_');
        if !cleaned.is_empty() {
            parts.push(cleaned.to_string());
        }
    }
    if parts.len() == 1 {
        parts.push("root".to_string());
    }
    parts.join("_")
}

/// Reduced tools for every endpoint, with names made unique.
pub fn reduced_tools(spec: &ReducedSpec) -> Vec<ReducedTool> {
    let mut seen = HashSet::new();
    spec.endpoints
        .iter()
        .map(|endpoint| {
            let mut tool = ReducedTool::from_endpoint(endpoint);
            if !seen.insert(tool.name.clone()) {
                let base = tool.name.clone();
                let mut n = 2;
                while !seen.insert(format!("{base}_{n}")) {
                    n += 1;
                }
                tool.name = format!("{base}_{n}");
            }
            tool
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tool input
// ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ToolInput {
    url: String,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    data: Option<Value>,
}

/// Remove a surrounding markdown code fence (with or without a language tag).
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text.trim_matches('`').trim();
    };
    let rest = rest.trim_end();
    let body = rest.strip_suffix("```").unwrap_or(rest);
    let body = match body.split_once(char::is_whitespace) {
        Some((tag, tail)) if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) => tail,
        _ => body,
    };
    body.trim()
}

fn parse_input(raw: &str) -> Result<ToolInput, ToolError> {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        return Err(ToolError::InvalidInput(
            "empty input, expected a JSON object like {\"url\": \"/path\"}".into(),
        ));
    }

    if text.starts_with('{') {
        let input: ToolInput = serde_json::from_str(text)
            .map_err(|e| ToolError::InvalidInput(format!("input is not a valid JSON object: {e}")))?;
        if input.url.trim().is_empty() {
            return Err(ToolError::InvalidInput("'url' must not be empty".into()));
        }
        return Ok(input);
    }

    let is_url = text.starts_with('/') || text.starts_with("http://") || text.starts_with("https://");
    if is_url && !text.contains(char::is_whitespace) {
        return Ok(ToolInput {
            url: text.to_string(),
            ..ToolInput::default()
        });
    }

    Err(ToolError::InvalidInput(format!(
        "expected a JSON object like {{\"url\": \"/path\", \"params\": {{}}, \"data\": {{}}}}, got: {}",
        truncate_string(text, 80)
    )))
}

fn value_to_query(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(value_to_query).collect(),
        other => vec![other.to_string()],
    }
}

/// Cut `text` to `max_chars` characters, appending an explicit marker.
pub fn truncate_observation(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((idx, _)) => format!(
            "{}\n[truncated: response exceeded {} characters]",
            &text[..idx],
            max_chars
        ),
    }
}

// ─────────────────────────────────────────────
// RequestsTool — one verb class
// ─────────────────────────────────────────────

pub struct RequestsTool {
    name: String,
    method: HttpMethod,
    base_url: String,
    endpoints: Vec<ReducedTool>,
    description: String,
    executor: Arc<dyn RequestExecutor>,
    max_response_length: usize,
}

impl std::fmt::Debug for RequestsTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestsTool")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints.len())
            .finish()
    }
}

impl RequestsTool {
    pub fn new(
        method: HttpMethod,
        base_url: &str,
        endpoints: Vec<ReducedTool>,
        executor: Arc<dyn RequestExecutor>,
        max_response_length: usize,
    ) -> Self {
        let description = describe(method, &endpoints);
        Self {
            name: Self::tool_name(method),
            method,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            description,
            executor,
            max_response_length,
        }
    }

    /// Fixed tool name for a verb class (`requests_get`, …).
    pub fn tool_name(method: HttpMethod) -> String {
        format!("requests_{}", method.lower())
    }

    /// Split `url` into a service-relative path and inline query pairs.
    fn relative_path(&self, url: &str) -> Result<(String, Vec<(String, String)>), ToolError> {
        let url = url.trim();
        let rest = if url.starts_with("http://") || url.starts_with("https://") {
            match url.strip_prefix(self.base_url.as_str()) {
                Some(r) if !self.base_url.is_empty() && (r.is_empty() || r.starts_with('/') || r.starts_with('?')) => r,
                _ => {
                    return Err(ToolError::InvalidInput(format!(
                        "URL '{}' is outside the service base URL '{}'",
                        url, self.base_url
                    )))
                }
            }
        } else {
            url
        };

        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        // decoded here, the executor encodes again
        let inline = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok((path, inline))
    }

    /// Resolve the model's input into a request. No request is built when
    /// anything doesn't line up with an endpoint.
    fn build_request(&self, raw: &str) -> Result<HttpRequest, ToolError> {
        let ToolInput { url, mut params, data } = parse_input(raw)?;
        let data = data.filter(|d| !d.is_null());
        let (path, mut query) = self.relative_path(&url)?;

        // Fill `{placeholders}` left in the URL from `params`.
        let mut filled = Vec::new();
        for segment in segments(&path) {
            match placeholder(segment) {
                Some(name) => {
                    let value = params
                        .remove(name)
                        .map(|v| value_to_query(&v).join(","))
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| {
                            ToolError::InvalidInput(format!("missing value for path parameter '{name}'"))
                        })?;
                    filled.push(value);
                }
                None => filled.push(segment.to_string()),
            }
        }
        let path = format!("/{}", filled.join("/"));

        let endpoint = self
            .endpoints
            .iter()
            .filter_map(|ep| ep.match_path(&path).map(|_| ep))
            .max_by_key(|ep| ep.literal_segments())
            .ok_or_else(|| {
                let available: Vec<&str> = self.endpoints.iter().map(|e| e.url_template.as_str()).collect();
                ToolError::InvalidInput(format!(
                    "no {} endpoint matches '{}'. Available: {}",
                    self.method,
                    path,
                    available.join(", ")
                ))
            })?;

        let mut headers = Vec::new();
        for param in endpoint
            .parameter_schema
            .iter()
            .filter(|p| p.location == ParamLocation::Header)
        {
            // header names are case-insensitive
            let key = params.keys().find(|k| k.eq_ignore_ascii_case(&param.name)).cloned();
            if let Some(value) = key.and_then(|k| params.remove(&k)) {
                let value = value_to_query(&value).join(",");
                if !value.is_empty() {
                    headers.push((param.name.clone(), value));
                }
            }
        }

        for (key, value) in &params {
            for v in value_to_query(value) {
                query.push((key.clone(), v));
            }
        }

        let whole_body = endpoint.takes_whole_body();
        let data_fields = data.as_ref().and_then(Value::as_object);
        for param in endpoint.parameter_schema.iter().filter(|p| p.required) {
            let present = match param.location {
                ParamLocation::Query => query.iter().any(|(k, _)| k == &param.name),
                ParamLocation::Header => headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(&param.name)),
                ParamLocation::Body if whole_body => data.is_some(),
                ParamLocation::Body => data_fields.is_some_and(|d| d.contains_key(&param.name)),
                // bound by the template match
                ParamLocation::Path => true,
            };
            if !present {
                return Err(ToolError::InvalidInput(format!(
                    "missing required {} parameter '{}' for {} {}",
                    param.location, param.name, self.method, endpoint.url_template
                )));
            }
        }

        let body = if self.method.has_body() {
            data
        } else {
            if data.is_some() {
                debug!(tool = %self.name, "ignoring 'data' for a request without body");
            }
            None
        };

        Ok(HttpRequest {
            method: self.method,
            url: format!("{}{}", self.base_url, path),
            query,
            headers,
            body,
        })
    }
}

fn describe(method: HttpMethod, endpoints: &[ReducedTool]) -> String {
    let purpose = match method {
        HttpMethod::Get => "read data from",
        HttpMethod::Post => "create things in",
        HttpMethod::Put => "replace things in",
        HttpMethod::Patch => "partially update things in",
        HttpMethod::Delete => "delete things from",
    };
    let mut text = format!(
        "Use this to send {method} requests to {purpose} the scene API. \
         Input must be a JSON object with the keys \"url\" (the endpoint path, e.g. \"/objects\"), \
         \"params\" (path, query and header parameters) and \"data\" (the JSON request body). \
         The output is the response body.\nEndpoints:"
    );
    for endpoint in endpoints {
        text.push_str("\n- ");
        text.push_str(&endpoint.summary_line());
    }
    text
}

#[async_trait]
impl Tool for RequestsTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let request = self.build_request(input)?;
        let response = self.executor.execute(request).await?;

        if !response.is_success() {
            warn!(tool = %self.name, status = response.status, "tool request returned an error status");
            return Err(ToolError::ExecutionFailed {
                status: Some(response.status),
                body: truncate_observation(&response.body, self.max_response_length),
            });
        }

        if response.body.trim().is_empty() {
            return Ok(format!("HTTP {} (empty response body)", response.status));
        }
        Ok(truncate_observation(&response.body, self.max_response_length))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::executor::HttpResponse;
    use serde_json::json;
    use std::sync::Mutex;

    /// Executor that records requests and replays one canned response.
    struct MockExecutor {
        requests: Mutex<Vec<HttpRequest>>,
        response: HttpResponse,
    }

    impl MockExecutor {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                response: HttpResponse { status, body: body.to_string() },
            })
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RequestExecutor for MockExecutor {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ToolError> {
            self.requests.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    fn param(name: &str, location: ParamLocation, required: bool) -> ReducedParameter {
        ReducedParameter {
            name: name.into(),
            location,
            required,
            param_type: "string".into(),
        }
    }

    fn endpoint(method: HttpMethod, path: &str, parameters: Vec<ReducedParameter>) -> ReducedEndpoint {
        ReducedEndpoint {
            path: path.into(),
            method,
            description: String::new(),
            operation_id: None,
            parameters,
        }
    }

    fn tool(method: HttpMethod, endpoints: Vec<ReducedEndpoint>, executor: Arc<MockExecutor>) -> RequestsTool {
        let reduced = endpoints.iter().map(ReducedTool::from_endpoint).collect();
        RequestsTool::new(method, "http://scene:8000/", reduced, executor, 50)
    }

    // ── Naming and matching ──

    #[test]
    fn test_derived_names() {
        assert_eq!(derive_name(HttpMethod::Get, "/objects/{object_id}"), "get_objects_object_id");
        assert_eq!(derive_name(HttpMethod::Post, "/scene/reset-all"), "post_scene_reset_all");
        assert_eq!(derive_name(HttpMethod::Get, "/"), "get_root");
    }

    #[test]
    fn test_operation_id_wins_and_names_are_unique() {
        let mut with_id = endpoint(HttpMethod::Get, "/objects", vec![]);
        with_id.operation_id = Some("list_objects".into());
        let spec = ReducedSpec {
            base_url: String::new(),
            description: String::new(),
            endpoints: vec![
                with_id,
                endpoint(HttpMethod::Get, "/objects/{id}", vec![]),
                endpoint(HttpMethod::Get, "/objects/{name}", vec![]),
            ],
        };
        let names: Vec<String> = reduced_tools(&spec).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["list_objects", "get_objects_id", "get_objects_name"]);

        let dup = ReducedSpec {
            endpoints: vec![
                endpoint(HttpMethod::Get, "/a-b", vec![]),
                endpoint(HttpMethod::Get, "/a_b", vec![]),
            ],
            ..ReducedSpec::default()
        };
        let names: Vec<String> = reduced_tools(&dup).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["get_a_b", "get_a_b_2"]);
    }

    #[test]
    fn test_match_path() {
        let t = ReducedTool::from_endpoint(&endpoint(HttpMethod::Get, "/objects/{object_id}/color", vec![]));
        assert_eq!(
            t.match_path("/objects/42/color"),
            Some(vec![("object_id".to_string(), "42".to_string())])
        );
        assert_eq!(t.match_path("/objects/42"), None);
        assert_eq!(t.match_path("/objects/{object_id}/color"), None);
        assert_eq!(t.match_path("/shapes/42/color"), None);
    }

    // ── Input parsing ──

    #[test]
    fn test_parse_input_variants() {
        let fenced = parse_input("```json\n{\"url\": \"/objects\"}\n```").unwrap();
        assert_eq!(fenced.url, "/objects");

        let bare = parse_input("/objects").unwrap();
        assert_eq!(bare.url, "/objects");
        assert!(bare.params.is_empty());

        let full = parse_input(r#"{"url": "/objects", "params": {"limit": 5}, "data": null}"#).unwrap();
        assert_eq!(full.params.get("limit"), Some(&json!(5)));

        assert!(matches!(parse_input("list all objects"), Err(ToolError::InvalidInput(_))));
        assert!(matches!(parse_input("{\"url\": "), Err(ToolError::InvalidInput(_))));
        assert!(matches!(parse_input("{\"params\": {}}"), Err(ToolError::InvalidInput(_))));
        assert!(matches!(parse_input("   "), Err(ToolError::InvalidInput(_))));
    }

    #[test]
    fn test_truncate_observation() {
        assert_eq!(truncate_observation("short", 10), "short");
        assert_eq!(
            truncate_observation("héllo world", 5),
            "héllo\n[truncated: response exceeded 5 characters]"
        );
    }

    // ── Request building ──

    #[tokio::test]
    async fn test_placeholder_filled_from_params() {
        let executor = MockExecutor::new(200, "{\"id\": 42}");
        let t = tool(
            HttpMethod::Get,
            vec![endpoint(HttpMethod::Get, "/objects/{object_id}", vec![param("object_id", ParamLocation::Path, true)])],
            executor.clone(),
        );

        let out = t
            .call(r#"{"url": "/objects/{object_id}", "params": {"object_id": 42, "verbose": true}}"#)
            .await
            .unwrap();

        assert_eq!(out, "{\"id\": 42}");
        let sent = executor.sent();
        assert_eq!(sent[0].url, "http://scene:8000/objects/42");
        assert_eq!(sent[0].query, vec![("verbose".to_string(), "true".to_string())]);
        assert_eq!(sent[0].body, None);
    }

    #[tokio::test]
    async fn test_absolute_url_under_base() {
        let executor = MockExecutor::new(200, "[]");
        let t = tool(HttpMethod::Get, vec![endpoint(HttpMethod::Get, "/objects", vec![])], executor.clone());

        t.call(r#"{"url": "http://scene:8000/objects?color=red"}"#).await.unwrap();
        let sent = executor.sent();
        assert_eq!(sent[0].url, "http://scene:8000/objects");
        assert_eq!(sent[0].query, vec![("color".to_string(), "red".to_string())]);

        let err = t.call(r#"{"url": "http://elsewhere/objects"}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref m) if m.contains("outside")));
    }

    #[tokio::test]
    async fn test_literal_endpoint_preferred() {
        let executor = MockExecutor::new(200, "ok");
        let t = tool(
            HttpMethod::Get,
            vec![
                endpoint(HttpMethod::Get, "/objects/{object_id}", vec![param("object_id", ParamLocation::Path, true)]),
                endpoint(HttpMethod::Get, "/objects/count", vec![param("shape", ParamLocation::Query, true)]),
            ],
            executor.clone(),
        );

        // Resolves to /objects/count, whose required query param is missing.
        let err = t.call("/objects/count").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref m) if m.contains("'shape'")));
        assert!(executor.sent().is_empty());

        t.call("/objects/7").await.unwrap();
        assert_eq!(executor.sent()[0].url, "http://scene:8000/objects/7");
    }

    #[tokio::test]
    async fn test_required_body_field() {
        let executor = MockExecutor::new(201, "created");
        let t = tool(
            HttpMethod::Post,
            vec![endpoint(
                HttpMethod::Post,
                "/objects",
                vec![param("shape", ParamLocation::Body, true), param("color", ParamLocation::Body, false)],
            )],
            executor.clone(),
        );

        let err = t.call(r#"{"url": "/objects", "data": {"color": "red"}}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref m) if m.contains("body parameter 'shape'")));
        assert!(executor.sent().is_empty());

        let out = t
            .call(r#"{"url": "/objects", "data": {"shape": "cube", "color": "red"}}"#)
            .await
            .unwrap();
        assert_eq!(out, "created");
        assert_eq!(executor.sent()[0].body, Some(json!({"shape": "cube", "color": "red"})));
    }

    #[tokio::test]
    async fn test_array_body_sent_whole() {
        let executor = MockExecutor::new(201, "created");
        let mut batch = param(WHOLE_BODY_PARAM, ParamLocation::Body, true);
        batch.param_type = "array".into();
        let t = tool(
            HttpMethod::Post,
            vec![endpoint(HttpMethod::Post, "/objects/batch", vec![batch])],
            executor.clone(),
        );

        let err = t.call(r#"{"url": "/objects/batch", "data": null}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref m) if m.contains("body parameter 'body'")));
        assert!(executor.sent().is_empty());

        t.call(r#"{"url": "/objects/batch", "data": ["cube", "sphere"]}"#).await.unwrap();
        assert_eq!(executor.sent()[0].body, Some(json!(["cube", "sphere"])));
    }

    #[tokio::test]
    async fn test_inline_query_decoded() {
        let executor = MockExecutor::new(200, "[]");
        let t = tool(HttpMethod::Get, vec![endpoint(HttpMethod::Get, "/objects", vec![])], executor.clone());

        t.call("/objects?name=red%20cube&tag=a+b&flag").await.unwrap();
        assert_eq!(
            executor.sent()[0].query,
            vec![
                ("name".to_string(), "red cube".to_string()),
                ("tag".to_string(), "a b".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_header_params_sent_as_headers() {
        let executor = MockExecutor::new(200, "ok");
        let t = tool(
            HttpMethod::Get,
            vec![endpoint(
                HttpMethod::Get,
                "/objects",
                vec![param("X-Scene-Id", ParamLocation::Header, true), param("limit", ParamLocation::Query, false)],
            )],
            executor.clone(),
        );

        let err = t.call(r#"{"url": "/objects", "params": {"limit": 3}}"#).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref m) if m.contains("header parameter 'X-Scene-Id'")));
        assert!(executor.sent().is_empty());

        t.call(r#"{"url": "/objects", "params": {"x-scene-id": "main", "limit": 3}}"#)
            .await
            .unwrap();
        let sent = executor.sent();
        assert_eq!(sent[0].headers, vec![("X-Scene-Id".to_string(), "main".to_string())]);
        assert_eq!(sent[0].query, vec![("limit".to_string(), "3".to_string())]);
    }

    #[tokio::test]
    async fn test_no_matching_endpoint() {
        let executor = MockExecutor::new(200, "ok");
        let t = tool(HttpMethod::Delete, vec![endpoint(HttpMethod::Delete, "/objects/{id}", vec![])], executor.clone());

        let err = t.call("/lights/1").await.unwrap_err();
        match err {
            ToolError::InvalidInput(msg) => {
                assert!(msg.contains("no DELETE endpoint matches '/lights/1'"));
                assert!(msg.contains("/objects/{id}"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(executor.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_path_value() {
        let executor = MockExecutor::new(200, "ok");
        let t = tool(HttpMethod::Get, vec![endpoint(HttpMethod::Get, "/objects/{id}", vec![])], executor.clone());

        let err = t.call(r#"{"url": "/objects/{id}"}"#).await.unwrap_err();
        assert_eq!(err, ToolError::InvalidInput("missing value for path parameter 'id'".into()));
    }

    // ── Responses ──

    #[tokio::test]
    async fn test_error_status_is_execution_failure() {
        let executor = MockExecutor::new(404, "object not found");
        let t = tool(HttpMethod::Get, vec![endpoint(HttpMethod::Get, "/objects/{id}", vec![])], executor);

        let err = t.call("/objects/9").await.unwrap_err();
        assert_eq!(
            err,
            ToolError::ExecutionFailed { status: Some(404), body: "object not found".into() }
        );
    }

    #[tokio::test]
    async fn test_long_response_truncated() {
        let body = "x".repeat(120);
        let executor = MockExecutor::new(200, &body);
        let t = tool(HttpMethod::Get, vec![endpoint(HttpMethod::Get, "/objects", vec![])], executor);

        let out = t.call("/objects").await.unwrap();
        assert!(out.starts_with(&"x".repeat(50)));
        assert!(out.ends_with("[truncated: response exceeded 50 characters]"));
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let executor = MockExecutor::new(204, "");
        let t = tool(HttpMethod::Delete, vec![endpoint(HttpMethod::Delete, "/objects/{id}", vec![])], executor);
        assert_eq!(t.call("/objects/3").await.unwrap(), "HTTP 204 (empty response body)");
    }

    #[test]
    fn test_description_lists_endpoints() {
        let mut ep = endpoint(HttpMethod::Patch, "/objects/{id}", vec![param("id", ParamLocation::Path, true)]);
        ep.description = "Update an object".into();
        let t = tool(HttpMethod::Patch, vec![ep], MockExecutor::new(200, ""));

        assert_eq!(t.name(), "requests_patch");
        assert!(t.description().contains("PATCH requests"));
        assert!(t
            .description()
            .contains("- PATCH /objects/{id}: Update an object | params: id (path string, required)"));
    }
}
