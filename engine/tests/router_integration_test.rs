//! Integration tests for the LLM Router
//!
//! Validates provider failover logic using Mock servers

use serde_json::json;
use std::sync::Arc;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use dbchat_engine::config::OpenAIConfig;
use dbchat_engine::llm::openai::{OpenAIProvider, OPENAI_API_KEY};
use dbchat_engine::llm::{ollama::OllamaProvider, router::LLMRouter, LLMProvider, Message};
use dbchat_engine::secrets::{SecretCache, SecretManager};
use sdk::capabilities::{CapabilityError, LanguageModel};

fn ollama_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "llama3",
        "created_at": "2023-08-04T19:22:45.499127Z",
        "message": {
            "role": "assistant",
            "content": content
        },
        "done": true
    })
}

fn openai_provider(base_url: String) -> OpenAIProvider {
    let cache = Arc::new(SecretCache::new(Arc::new(SecretManager::new(
        "dbchat-router-test",
    ))));
    cache.insert(OPENAI_API_KEY, "sk-test-router-key");

    OpenAIProvider::new(
        OpenAIConfig {
            base_url,
            model: "gpt-3.5-turbo".to_string(),
        },
        cache,
    )
}

#[tokio::test]
async fn test_llm_router_failover_with_wiremock() {
    // Start two mock servers to represent two different Ollama instances
    let failing_server = MockServer::start().await;
    let succeeding_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ollama_reply("Hello! I am the backup provider.")),
        )
        .mount(&succeeding_server)
        .await;

    let provider1 =
        Box::new(OllamaProvider::new(failing_server.uri(), "llama3")) as Box<dyn LLMProvider>;
    let provider2 =
        Box::new(OllamaProvider::new(succeeding_server.uri(), "llama3")) as Box<dyn LLMProvider>;

    // Equal scores keep registration order, so the failing one goes first
    let router = LLMRouter::new(vec![provider1, provider2], "ollama");

    let (text, provider) = router.call(&[Message::user("Hello")]).await.unwrap();
    assert_eq!(text, "Hello! I am the backup provider.");
    assert_eq!(provider, "ollama");
}

#[tokio::test]
async fn test_failover_from_ollama_to_openai() {
    let ollama_server = MockServer::start().await;
    let openai_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&ollama_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test-router-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"action\": \"direct_response\"}"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&openai_server)
        .await;

    let router = LLMRouter::new(
        vec![
            Box::new(OllamaProvider::new(ollama_server.uri(), "llama3")),
            Box::new(openai_provider(openai_server.uri())),
        ],
        "ollama",
    );

    let text = router.generate("How does this system work?").await.unwrap();
    assert_eq!(text, "{\"action\": \"direct_response\"}");
}

#[tokio::test]
async fn test_default_provider_is_tried_first() {
    let ollama_server = MockServer::start().await;
    let openai_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("from ollama")))
        .expect(0)
        .mount(&ollama_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "from openai"}}]
        })))
        .mount(&openai_server)
        .await;

    let router = LLMRouter::new(
        vec![
            Box::new(OllamaProvider::new(ollama_server.uri(), "llama3")),
            Box::new(openai_provider(openai_server.uri())),
        ],
        "openai",
    );

    let (text, provider) = router.call(&[Message::user("hi")]).await.unwrap();
    assert_eq!(text, "from openai");
    assert_eq!(provider, "openai");
}

#[tokio::test]
async fn test_llm_router_all_providers_fail() {
    let failing_server1 = MockServer::start().await;
    let failing_server2 = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing_server1)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&failing_server2)
        .await;

    let router = LLMRouter::new(
        vec![
            Box::new(OllamaProvider::new(failing_server1.uri(), "llama3")),
            Box::new(OllamaProvider::new(failing_server2.uri(), "llama3")),
        ],
        "ollama",
    );

    let err = router.generate("Hello").await.unwrap_err();
    assert_eq!(
        err,
        CapabilityError::Unavailable("All LLM providers failed".to_string())
    );
}

#[tokio::test]
async fn test_openai_auth_failure_maps_to_capability_error() {
    let openai_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&openai_server)
        .await;

    let router = LLMRouter::new(vec![Box::new(openai_provider(openai_server.uri()))], "openai");

    let err = router.generate("Hello").await.unwrap_err();
    assert!(matches!(err, CapabilityError::Authentication(_)));
}

#[tokio::test]
async fn test_check_health_reports_each_provider() {
    let healthy = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&healthy)
        .await;

    let router = LLMRouter::new(
        vec![Box::new(OllamaProvider::new(healthy.uri(), "llama3"))],
        "ollama",
    );

    let health = router.check_health().await;
    assert_eq!(health, vec![("ollama", true)]);
}
