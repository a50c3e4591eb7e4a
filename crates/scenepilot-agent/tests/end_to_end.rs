//! Full runs: scripted model output, real request tools, mock scene service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scenepilot_agent::{
    AgentConfig, AgentError, AgentLoop, HttpExecutor, StepAction, Tool, ToolError, ToolRegistry,
};
use scenepilot_core::apispec::ReducedSpec;
use scenepilot_providers::{BackendError, ChunkStream, GenerationBackend, GenerationClient, RetryPolicy};

/// Replays completions in order, split into two chunks each.
struct ScriptedModel {
    script: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(script: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().rev().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl GenerationBackend for ScriptedModel {
    async fn generate(&self, prompt: &str, _stop: &[String]) -> Result<ChunkStream, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let text = self
            .script
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| BackendError::Stream("script exhausted".into()))?;
        let mid = text.char_indices().nth(text.chars().count() / 2).map_or(text.len(), |(i, _)| i);
        let chunks = vec![Ok(text[..mid].to_string()), Ok(text[mid..].to_string())];
        Ok(stream::iter(chunks).boxed())
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }
}

fn scene_api(base_url: &str) -> ReducedSpec {
    let doc = json!({
        "openapi": "3.0.0",
        "info": { "title": "Scene API", "description": "Objects in a 3D scene" },
        "servers": [{ "url": base_url }],
        "paths": {
            "/objects": {
                "get": { "operationId": "list_objects", "description": "List all objects in the scene" }
            }
        }
    });
    ReducedSpec::from_document(doc, None).unwrap()
}

fn agent(model: Arc<ScriptedModel>, registry: ToolRegistry) -> AgentLoop {
    let client = Arc::new(GenerationClient::new(model, RetryPolicy::immediate(1)));
    AgentLoop::new(client, Arc::new(registry), AgentConfig::default())
}

fn http_registry(spec: &ReducedSpec) -> ToolRegistry {
    let executor = Arc::new(HttpExecutor::new(Duration::from_secs(5)).unwrap());
    ToolRegistry::from_spec(spec, executor, 5000)
}

#[tokio::test]
async fn test_list_objects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"objects":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let model = ScriptedModel::new(&[
        " I should list the objects\nAction: requests_get\nAction Input: {\"url\": \"/objects\"}",
        " The scene is empty\nFinal Answer: There are no objects in the scene.",
    ]);
    let agent = agent(model.clone(), http_registry(&scene_api(&server.uri())));

    let output = agent.run("list objects", &CancellationToken::new()).await.unwrap();

    assert_eq!(output.answer, "There are no objects in the scene.");
    assert_eq!(output.steps.len(), 2);
    assert_eq!(output.steps[0].action, StepAction::Tool("requests_get".into()));
    assert_eq!(output.steps[0].observation.as_deref(), Some(r#"{"objects":[]}"#));
    assert_eq!(output.steps[1].action, StepAction::Finish);

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("requests_get: "));
    assert!(prompts[0].contains("GET /objects"));
    assert!(prompts[1].contains("Observation: {\"objects\":[]}\nThought:"));
}

#[tokio::test]
async fn test_inline_query_reaches_service_once_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .and(query_param("name", "red cube"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"name":"red cube"}]"#))
        .expect(1)
        .mount(&server)
        .await;

    let model = ScriptedModel::new(&[
        " Look it up\nAction: requests_get\nAction Input: /objects?name=red%20cube",
        " Found it\nFinal Answer: The red cube exists.",
    ]);
    let agent = agent(model, http_registry(&scene_api(&server.uri())));

    let output = agent.run("is there a red cube?", &CancellationToken::new()).await.unwrap();

    assert_eq!(output.steps[0].observation.as_deref(), Some(r#"[{"name":"red cube"}]"#));
    assert_eq!(output.answer, "The red cube exists.");
}

/// Records whatever input reaches it.
struct DeleteObject {
    inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl Tool for DeleteObject {
    fn name(&self) -> &str {
        "delete_object"
    }
    fn description(&self) -> &str {
        "Delete an object by its handle"
    }
    async fn call(&self, input: &str) -> Result<String, ToolError> {
        self.inputs.lock().unwrap().push(input.to_string());
        Ok(format!("deleted {input}"))
    }
}

#[tokio::test]
async fn test_stray_backslashes_removed_before_dispatch() {
    let tool = Arc::new(DeleteObject { inputs: Mutex::new(Vec::new()) });
    let mut registry = ToolRegistry::new();
    registry.register(tool.clone());

    let model = ScriptedModel::new(&[
        " Remove it\nAction: delete_object\nAction Input: delete\\_object\\_42",
        " Done\nFinal Answer: Object 42 was deleted.",
    ]);
    let agent = agent(model, registry);

    let output = agent.run("delete object 42", &CancellationToken::new()).await.unwrap();

    assert_eq!(*tool.inputs.lock().unwrap(), vec!["delete_object_42".to_string()]);
    assert_eq!(output.steps[0].action_input, "delete_object_42");
    assert_eq!(output.answer, "Object 42 was deleted.");
}

#[tokio::test]
async fn test_unreachable_service_does_not_end_run() {
    let model = ScriptedModel::new(&[
        " List first\nAction: requests_get\nAction Input: /objects",
        " The service did not answer\nFinal Answer: The scene service is unreachable.",
    ]);
    let agent = agent(model, http_registry(&scene_api("http://127.0.0.1:1")));

    let output = agent.run("list objects", &CancellationToken::new()).await.unwrap();

    assert_eq!(output.steps.len(), 2);
    let observation = output.steps[0].observation.as_deref().unwrap();
    assert!(observation.starts_with("Error: request failed (no response)"));
    assert_eq!(output.answer, "The scene service is unreachable.");
}

#[tokio::test]
async fn test_service_error_status_is_observed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(ResponseTemplate::new(500).set_body_string("scene locked"))
        .mount(&server)
        .await;

    let model = ScriptedModel::new(&[
        "Action: requests_get\nAction Input: /objects",
        "Final Answer: The scene is locked.",
    ]);
    let agent = agent(model, http_registry(&scene_api(&server.uri())));

    let output = agent.run("list objects", &CancellationToken::new()).await.unwrap();
    assert_eq!(
        output.steps[0].observation.as_deref(),
        Some("Error: request failed (HTTP 500): scene locked")
    );
}

#[tokio::test]
async fn test_unparsable_output_ends_run() {
    let model = ScriptedModel::new(&["no idea", "still no idea", "really no idea"]);
    let agent = agent(model.clone(), http_registry(&scene_api("http://127.0.0.1:1")));

    let err = agent.run("list objects", &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, AgentError::UnparsableOutput { attempts: 3, .. }));
    assert_eq!(model.prompts.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_cancel_during_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let model = ScriptedModel::new(&["Action: requests_get\nAction Input: /objects"]);
    let agent = agent(model, http_registry(&scene_api(&server.uri())));

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = agent.run("list objects", &token).await.unwrap_err();

    assert!(matches!(err, AgentError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}
