use reaper_client::{
    DiskUsageProvider, HttpContainerManager, HttpDiskUsageProvider, HttpPullRequestProvider,
};
use reaper_config::{CodeHostingHandlers, ReaperConfig};
use reaper_criteria::{PollingReaper, Printer, PullRequestStateCache};
use reaper_engine::{PolicyEngine, ReapExecutor};
use reaper_store::Store;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variables win over reaper.toml.
pub fn apply_env_overrides(config: &mut ReaperConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var("CONTAINER_MANAGER_URL") {
        config.container_manager_url = url;
    }
    if let Some(url) = var("DB_URL") {
        config.db_url = Some(url);
    }
    if let Some(dir) = var("DATA_DIRECTORY") {
        config.data_directory = PathBuf::from(dir);
    }
    if let Some(host) = var("API_HOST") {
        config.api_host = host;
    }
    match var("API_PORT").map(|port| port.parse::<u16>()) {
        Some(Ok(port)) => config.api_port = port,
        Some(Err(e)) => tracing::warn!("Ignoring API_PORT: {}", e),
        None => {}
    }
}

fn http_timeout(config: &ReaperConfig) -> Duration {
    Duration::from_secs(config.http_timeout_secs)
}

pub fn pull_request_hosts(handlers: &CodeHostingHandlers) -> HashMap<String, String> {
    ["github", "gitlab", "bitbucket"]
        .into_iter()
        .filter_map(|provider| {
            handlers
                .host_for(provider)
                .map(|host| (provider.to_string(), host.to_string()))
        })
        .collect()
}

pub fn create_container_manager(
    config: &ReaperConfig,
) -> reaper_client::Result<Arc<HttpContainerManager>> {
    Ok(Arc::new(HttpContainerManager::new(
        config.container_manager_url.clone(),
        http_timeout(config),
    )?))
}

pub fn create_policy_engine(
    config: &ReaperConfig,
    store: Arc<Store>,
) -> reaper_client::Result<PolicyEngine> {
    let executor = ReapExecutor::new(create_container_manager(config)?, Some(store.clone()));

    let usage: Option<Arc<dyn DiskUsageProvider>> = match &config.db_url {
        Some(db_url) => Some(Arc::new(HttpDiskUsageProvider::new(
            db_url.clone(),
            http_timeout(config),
        )?)),
        None => {
            tracing::warn!("No db_url configured, disk quota enforcement is skipped");
            None
        }
    };

    Ok(PolicyEngine::from_config(config, store, usage, executor))
}

pub fn create_polling_reaper(
    config: &ReaperConfig,
    dry_run: bool,
    printer: Printer,
) -> reaper_client::Result<PollingReaper> {
    let manager = create_container_manager(config)?;
    let pull_requests = HttpPullRequestProvider::new(
        pull_request_hosts(&config.code_hosting_handlers),
        http_timeout(config),
    )?;
    let cache = PullRequestStateCache::new(Duration::from_secs(config.pr_state_cache_ttl_secs));
    let executor = ReapExecutor::new(manager.clone(), None).dry_run(dry_run);

    Ok(PollingReaper::new(
        manager,
        Arc::new(pull_requests),
        Arc::new(cache),
        config.criteria(),
        executor,
        printer,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ReaperConfig::default();
        apply_env_overrides(
            &mut config,
            vars(&[
                ("CONTAINER_MANAGER_URL", "http://manager:3020"),
                ("DB_URL", "http://db:9876"),
                ("DATA_DIRECTORY", "/srv/reaper"),
                ("API_PORT", "4000"),
            ]),
        );

        assert_eq!(config.container_manager_url, "http://manager:3020");
        assert_eq!(config.db_url.as_deref(), Some("http://db:9876"));
        assert_eq!(config.data_directory, PathBuf::from("/srv/reaper"));
        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 4000);
    }

    #[test]
    fn test_bad_port_keeps_configured_value() {
        let mut config = ReaperConfig::default();
        apply_env_overrides(&mut config, vars(&[("API_PORT", "http")]));
        assert_eq!(config.api_port, 3040);
    }

    #[test]
    fn test_pull_request_hosts() {
        let handlers = CodeHostingHandlers {
            github: Some("http://localhost:20014".to_string()),
            gitlab: None,
            bitbucket: Some("http://localhost:20015".to_string()),
        };

        let hosts = pull_request_hosts(&handlers);
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts["github"], "http://localhost:20014");
        assert_eq!(hosts["bitbucket"], "http://localhost:20015");
    }
}
