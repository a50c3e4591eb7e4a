//! Reduced API descriptions — the condensed endpoint summary the agent's
//! tools are derived from.
//!
//! A full OpenAPI document is far too large for a prompt. [`reduce`] keeps
//! only what the model needs per endpoint: path, method, a short description
//! and the parameter list (query/path parameters plus the top-level fields of
//! a JSON request body).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Maximum `$ref` hops followed before giving up (guards against cycles).
const MAX_REF_DEPTH: usize = 8;

/// Name of the single body parameter used when the body schema has no
/// named properties (arrays, scalars, free-form objects).
pub const WHOLE_BODY_PARAM: &str = "body";

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("API description has no 'paths' object")]
    MissingPaths,

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid reduced API description: {0}")]
    Invalid(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// The five HTTP verb classes the agent can call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[serde(rename = "POST", alias = "post")]
    Post,
    #[serde(rename = "PUT", alias = "put")]
    Put,
    #[serde(rename = "PATCH", alias = "patch")]
    Patch,
    #[serde(rename = "DELETE", alias = "delete")]
    Delete,
}

impl HttpMethod {
    /// All supported methods, in tool-registration order.
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    /// Upper-case wire name (`"GET"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Lower-case key used in OpenAPI path items (`"get"`).
    pub fn lower(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Whether requests with this method normally carry a body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SpecError::UnsupportedMethod(s.to_string()))
    }
}

/// Where a parameter travels in the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Body => "body",
        };
        f.write_str(s)
    }
}

/// One parameter of a reduced endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReducedParameter {
    pub name: String,
    #[serde(rename = "in", alias = "location")]
    pub location: ParamLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
}

fn default_param_type() -> String {
    "string".to_string()
}

/// One callable endpoint of the reduced description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducedEndpoint {
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ReducedParameter>,
}

/// Condensed, model-consumable summary of a service's endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducedSpec {
    /// Base server URL every endpoint path is appended to.
    #[serde(default)]
    pub base_url: String,
    /// Short service description.
    #[serde(default)]
    pub description: String,
    pub endpoints: Vec<ReducedEndpoint>,
}

impl ReducedSpec {
    /// Build a reduced spec from either a full OpenAPI document or an
    /// already-reduced one. `server_url` overrides the declared server.
    pub fn from_document(mut doc: Value, server_url: Option<&str>) -> Result<Self, SpecError> {
        if doc.get("paths").is_some() {
            if let Some(url) = server_url {
                with_server_url(&mut doc, url);
            }
            return reduce(&doc);
        }

        let mut spec: ReducedSpec = serde_json::from_value(doc)?;
        if let Some(url) = server_url {
            spec.base_url = url.to_string();
        }
        Ok(spec)
    }

    /// Endpoints for a single verb class, in declaration order.
    pub fn endpoints_for(&self, method: HttpMethod) -> impl Iterator<Item = &ReducedEndpoint> {
        self.endpoints.iter().filter(move |e| e.method == method)
    }

    /// Verb classes that have at least one endpoint.
    pub fn methods_present(&self) -> Vec<HttpMethod> {
        HttpMethod::ALL
            .into_iter()
            .filter(|m| self.endpoints.iter().any(|e| e.method == *m))
            .collect()
    }
}

// ─────────────────────────────────────────────
// Reducer
// ─────────────────────────────────────────────

/// Override the document's declared servers with a single URL.
pub fn with_server_url(doc: &mut Value, url: &str) {
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("servers".into(), serde_json::json!([{ "url": url }]));
    }
}

/// Reduce a full OpenAPI document to a [`ReducedSpec`].
///
/// Deprecated operations are skipped. `$ref`s into `#/components/...` are
/// resolved for parameters, request bodies and body schemas.
pub fn reduce(doc: &Value) -> Result<ReducedSpec, SpecError> {
    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or(SpecError::MissingPaths)?;

    let base_url = doc
        .pointer("/servers/0/url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string();

    let description = doc
        .pointer("/info/description")
        .or_else(|| doc.pointer("/info/title"))
        .and_then(Value::as_str)
        .map(first_paragraph)
        .unwrap_or_default();

    let mut endpoints = Vec::new();

    for (path, item) in paths {
        let shared_params = item
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for method in HttpMethod::ALL {
            let Some(op) = item.get(method.lower()) else {
                continue;
            };
            if op.get("deprecated").and_then(Value::as_bool) == Some(true) {
                debug!(path = %path, method = %method, "skipping deprecated operation");
                continue;
            }

            let description = op
                .get("description")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| op.get("summary").and_then(Value::as_str))
                .map(first_paragraph)
                .unwrap_or_default();

            let operation_id = op
                .get("operationId")
                .and_then(Value::as_str)
                .map(String::from);

            let mut parameters = Vec::new();
            let op_params = op
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for raw in shared_params.iter().chain(op_params.iter()) {
                if let Some(param) = reduce_parameter(doc, raw) {
                    parameters.retain(|p: &ReducedParameter| p.name != param.name || p.location != param.location);
                    parameters.push(param);
                }
            }

            if let Some(body) = op.get("requestBody") {
                parameters.extend(reduce_request_body(doc, body));
            }

            endpoints.push(ReducedEndpoint {
                path: path.clone(),
                method,
                description,
                operation_id,
                parameters,
            });
        }
    }

    debug!(endpoints = endpoints.len(), base_url = %base_url, "reduced API description");

    Ok(ReducedSpec {
        base_url,
        description,
        endpoints,
    })
}

fn reduce_parameter(doc: &Value, raw: &Value) -> Option<ReducedParameter> {
    let param = resolve_ref(doc, raw);
    let name = param.get("name")?.as_str()?.to_string();
    let location = match param.get("in")?.as_str()? {
        "path" => ParamLocation::Path,
        "query" => ParamLocation::Query,
        "header" => ParamLocation::Header,
        _ => return None,
    };
    let required = location == ParamLocation::Path
        || param.get("required").and_then(Value::as_bool).unwrap_or(false);
    let param_type = param
        .get("schema")
        .map(|s| schema_type(doc, s))
        .unwrap_or_else(default_param_type);

    Some(ReducedParameter {
        name,
        location,
        required,
        param_type,
    })
}

fn reduce_request_body(doc: &Value, raw: &Value) -> Vec<ReducedParameter> {
    let body = resolve_ref(doc, raw);
    let body_required = body.get("required").and_then(Value::as_bool).unwrap_or(false);

    let Some(schema) = body.pointer("/content/application~1json/schema") else {
        return Vec::new();
    };
    let schema = resolve_ref(doc, schema);

    match schema.get("properties").and_then(Value::as_object) {
        Some(props) => {
            let required: Vec<&str> = schema
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            props
                .iter()
                .map(|(name, prop)| ReducedParameter {
                    name: name.clone(),
                    location: ParamLocation::Body,
                    required: required.contains(&name.as_str()),
                    param_type: schema_type(doc, prop),
                })
                .collect()
        }
        None => vec![ReducedParameter {
            name: WHOLE_BODY_PARAM.into(),
            location: ParamLocation::Body,
            required: body_required,
            param_type: schema_type(doc, schema),
        }],
    }
}

/// Best-effort type name for a schema (`"string"`, `"array"`, `"object"`…).
fn schema_type(doc: &Value, schema: &Value) -> String {
    let schema = resolve_ref(doc, schema);
    if let Some(t) = schema.get("type").and_then(Value::as_str) {
        return t.to_string();
    }
    // anyOf: [{type: X}, {type: null}] is how optional fields are emitted
    if let Some(variants) = schema.get("anyOf").and_then(Value::as_array) {
        if let Some(t) = variants
            .iter()
            .filter_map(|v| resolve_ref(doc, v).get("type").and_then(Value::as_str))
            .find(|t| *t != "null")
        {
            return t.to_string();
        }
    }
    if schema.get("properties").is_some() {
        return "object".into();
    }
    default_param_type()
}

/// Follow local `$ref`s (`#/components/...`) until a concrete value is reached.
fn resolve_ref<'a>(doc: &'a Value, value: &'a Value) -> &'a Value {
    let mut current = value;
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        let Some(pointer) = reference.strip_prefix('#') else {
            return current;
        };
        match doc.pointer(pointer) {
            Some(target) => current = target,
            None => return current,
        }
    }
    current
}

fn first_paragraph(text: &str) -> String {
    text.trim()
        .split("\n\n")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
