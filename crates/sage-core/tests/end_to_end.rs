use std::sync::Arc;

use sage_core::bootstrap::AppBuilder;
use sage_core::config::Config;
use sage_core::prompts;
use sage_core::vault::EnvVaultProvider;
use sage_llm::{LlmError, LlmProvider, Message, Role};
use sage_mcp::{InProcessConnector, SessionConnector, SessionState, serve_http};
use sage_memory::Metadata;

/// Deterministic stand-in for a chat model: decomposition returns the question
/// itself, FAQ extraction returns one fixed pair, and synthesis repeats the
/// first knowledge line it was given.
struct ScriptedModel;

impl LlmProvider for ScriptedModel {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let user = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if system == prompts::DECOMPOSE_SYSTEM {
            let question = user.lines().last().unwrap_or_default();
            return Ok(serde_json::json!([question]).to_string());
        }
        if system == prompts::FAQ_EXTRACTION_SYSTEM {
            return Ok(r#"[{"question": "Where is the Eiffel Tower?", "answer": "In Paris."}]"#.into());
        }
        let line = user
            .lines()
            .find(|l| l.starts_with("1. "))
            .unwrap_or("I don't know.");
        Ok(line.trim_start_matches("1. ").to_owned())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "scripted"
    }
}

async fn app() -> (AppBuilder, Arc<sage_memory::KnowledgeStore>) {
    let mut config = Config::default();
    config.mcp.connect_attempts = 1;
    let app = AppBuilder::from_config(config, &EnvVaultProvider).await.unwrap();
    let store = app.build_store().await.unwrap();
    (app, store)
}

#[tokio::test]
async fn build_then_query_answers_from_knowledge() {
    let (app, store) = app().await;
    let connector = Arc::new(InProcessConnector::new(
        Arc::clone(&store),
        app.config().rag.max_search_results,
    ));
    let ctx = app.build_context_with(connector, ScriptedModel);

    let report = ctx
        .builder()
        .build_from_text(
            "Paris is the capital of France. The Eiffel Tower is in Paris.",
            &Metadata::new(),
            false,
        )
        .await
        .unwrap();
    assert_eq!(report.stored_chunks, 1);
    assert_eq!(report.total_chunks, 1);

    let answer = ctx
        .retriever()
        .query("What is the capital of France?")
        .await
        .unwrap();
    assert!(answer.contains("Paris"), "answer was: {answer}");

    ctx.shutdown().await;
    ctx.shutdown().await;
    assert_eq!(ctx.client.state().await, SessionState::Closed);
}

#[tokio::test]
async fn extracted_faqs_are_retrievable() {
    let (app, store) = app().await;
    let connector = Arc::new(InProcessConnector::new(Arc::clone(&store), 5));
    let ctx = app.build_context_with(connector, ScriptedModel);

    let report = ctx
        .builder()
        .build_from_text("The Eiffel Tower is in Paris.", &Metadata::new(), true)
        .await
        .unwrap();
    assert_eq!(report.extracted_faqs, 1);
    assert_eq!(report.stored_faqs, 1);

    let items = ctx.retriever().search("Where is the Eiffel Tower?").await.unwrap();
    assert!(items[0].is_faq());
    assert_eq!(store.stats().await.unwrap().faq, 1);
    ctx.shutdown().await;
}

#[tokio::test]
async fn query_on_empty_store_returns_apology() {
    let (app, store) = app().await;
    let connector = Arc::new(InProcessConnector::new(store, 5));
    let ctx = app.build_context_with(connector, ScriptedModel);
    let answer = ctx.retriever().query("Who painted the Mona Lisa?").await.unwrap();
    assert_eq!(answer, prompts::NO_CONTEXT_ANSWER);
    ctx.shutdown().await;
}

#[tokio::test]
async fn build_and_query_in_separate_sessions_over_configured_transport() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = Config::default();
    config.mcp.connect_attempts = 1;
    config.mcp.url = format!("http://{addr}{}", config.server.path);
    let app = AppBuilder::from_config(config, &EnvVaultProvider).await.unwrap();

    let server = app.build_server().await.unwrap();
    let path = app.config().server.path.clone();
    let host = tokio::spawn(async move {
        serve_http(server, listener, &path, std::future::pending()).await
    });

    let transport: Arc<dyn SessionConnector> = Arc::new(app.build_transport().unwrap());

    let ingest = app.build_context_with(Arc::clone(&transport), ScriptedModel);
    let report = ingest
        .builder()
        .build_from_text(
            "Paris is the capital of France. The Eiffel Tower is in Paris.",
            &Metadata::new(),
            false,
        )
        .await
        .unwrap();
    assert_eq!(report.stored_chunks, 1);
    ingest.shutdown().await;
    assert_eq!(ingest.client.state().await, SessionState::Closed);

    let ask = app.build_context_with(transport, ScriptedModel);
    let answer = ask
        .retriever()
        .query("What is the capital of France?")
        .await
        .unwrap();
    assert!(answer.contains("Paris"), "answer was: {answer}");
    ask.shutdown().await;

    host.abort();
}
