use std::sync::Arc;
use alma_persist::PersistenceClient;
use alma_session::{ModelFactory, SessionOrchestrator};
use alma_tools::{PermissionGate, ToolCatalog, ToolExecutor, ToolsConfig, WorkspaceSandbox};
use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Services are constructed once at startup and shared through `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub sandbox: Arc<WorkspaceSandbox>,
    pub gate: Arc<PermissionGate>,
    pub session: SessionOrchestrator,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        factory: Arc<dyn ModelFactory>,
    ) -> anyhow::Result<Self> {
        let sandbox = Arc::new(WorkspaceSandbox::new());
        let tools: ToolsConfig = (&config.tools).into();
        let catalog = Arc::new(ToolCatalog::with_builtins(&tools)?);
        let gate = Arc::new(PermissionGate::new((&config.permissions).into()));
        let executor = Arc::new(ToolExecutor::new(
            catalog,
            Arc::clone(&gate),
            Arc::clone(&sandbox),
        ));

        let session = SessionOrchestrator::builder()
            .store(Arc::clone(&persist))
            .executor(executor)
            .model_factory(factory)
            .config((&config.session).into())
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            persist,
            sandbox,
            gate,
            session,
        })
    }
}
