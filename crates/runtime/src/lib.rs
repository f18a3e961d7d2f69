use std::collections::HashMap;
use std::sync::Arc;
use strata_api::{ContentConnector, HostFramework, ResourceStore};
use strata_core::config::{DeploymentKind, RuntimeConfig};
use strata_core::discovery::ClasspathScan;
use strata_core::{ConnectionAdapter, Deployment, Result, Runtime, StrataError};

/// Pick the deployment described by `config`.
///
/// Without an explicit `strata.deployment`, an embedded index wins, then a
/// boot directory, then the classpath. An empty classpath falls back to the
/// `CLASSPATH` environment variable.
pub fn select_deployment(
    config: &RuntimeConfig,
    store: Option<Arc<dyn ResourceStore>>,
) -> Result<Deployment> {
    let kind = config.deployment.unwrap_or(if store.is_some() {
        DeploymentKind::Embedded
    } else if config.boot_dir.is_some() {
        DeploymentKind::Directory
    } else {
        DeploymentKind::Classpath
    });

    match kind {
        DeploymentKind::Embedded => store.map(Deployment::embedded).ok_or_else(|| {
            StrataError::illegal_state("embedded deployments need a resource store")
        }),
        DeploymentKind::Directory => config
            .boot_dir
            .clone()
            .map(Deployment::directory)
            .ok_or_else(|| {
                StrataError::illegal_state("directory deployments need strata.boot.dir")
            }),
        DeploymentKind::Classpath => {
            let entries = if config.classpath.is_empty() {
                std::env::var("CLASSPATH")
                    .map(|cp| ClasspathScan::split(&cp))
                    .unwrap_or_default()
            } else {
                config.classpath.clone()
            };
            Ok(Deployment::classpath(entries))
        }
    }
}

/// Bootstraps a runtime and the connector the host framework talks to.
///
/// Boot discovery runs here; `initialize` on the returned connector binds
/// storage and restores persisted layers.
pub fn build_runtime(
    host: Arc<dyn HostFramework>,
    props: &HashMap<String, String>,
    store: Option<Arc<dyn ResourceStore>>,
) -> Result<(Arc<Runtime>, Arc<dyn ContentConnector>)> {
    let config = RuntimeConfig::from_map(props);
    let deployment = select_deployment(&config, store)?;
    tracing::info!("Starting {} deployment", deployment.name());

    let runtime = Arc::new(Runtime::new(deployment, host)?);
    let connector: Arc<dyn ContentConnector> = Arc::new(ConnectionAdapter::new(runtime.clone()));
    Ok((runtime, connector))
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
pub fn init_logging(component: &str, to_stderr: bool) -> Option<impl Drop> {
    Some(strata_core::logging::init_logging(component, to_stderr))
}
