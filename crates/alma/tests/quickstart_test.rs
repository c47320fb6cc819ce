use alma::mock::EchoModel;
use alma::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_echo_turn_through_prelude() {
    let dir = TempDir::new().unwrap();
    let sandbox = Arc::new(WorkspaceSandbox::new());
    sandbox.ensure_active_workspace("default", dir.path()).unwrap();

    let catalog = Arc::new(ToolCatalog::with_builtins(&ToolsConfig::default()).unwrap());
    let gate = Arc::new(PermissionGate::default());
    let executor = Arc::new(ToolExecutor::new(catalog, gate, sandbox));

    let store = Arc::new(InMemoryPersistenceClient::new());
    store
        .upsert_provider(Provider::new("local", "Local", ProviderKind::OpenAI))
        .await
        .unwrap();
    let thread = store.create_thread(Thread::new("Hello")).await.unwrap();

    let session = SessionBuilder::new()
        .store(store.clone())
        .executor(executor)
        .model_factory(Arc::new(StaticModelFactory::new(Arc::new(EchoModel))))
        .build()
        .unwrap();

    let mut updates = session.channel().register(thread.id.clone());
    let ack = session
        .send_message(&thread.id, "hello big world", "local/echo")
        .await
        .unwrap();
    assert_eq!(ack.status, TurnStatus::Completed);

    let messages = store.get_messages(&thread.id).await.unwrap();
    assert_eq!(messages[1].parts, vec![Part::text("hello big world")]);

    let mut frames = Vec::new();
    while let Ok(frame) = updates.rx.try_recv() {
        frames.push(frame);
    }
    assert_eq!(frames.len(), 4);
    assert_eq!(frames.last(), Some(&ServerFrame::Done));
}

#[test]
fn test_builder_requires_collaborators() {
    let err = SessionBuilder::new().build().unwrap_err();
    assert!(err.to_string().contains("required"));
}
