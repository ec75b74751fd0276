use std::path::Path;
use std::sync::Arc;

use fichedesk_core::{
    load_config, targets, AppConfig, AuthConfig, RestAuthClient, RestConfig, RestStore,
};
use fichedesk_ui::logging::{init_logging, LogLevel, LogStore};
use fichedesk_ui::{run, Flags, UiResult};

fn main() -> UiResult {
    let log_store = LogStore::new(2000);
    let reload_handle = init_logging(log_store.clone(), LogLevel::Info);

    tracing::info!(target: targets::UI, "FicheDesk starting");

    let config = match load_config(Path::new(fichedesk_core::DEFAULT_CONFIG_PATH)) {
        Ok(config) => config,
        Err(error) => {
            tracing::warn!(
                target: targets::CONFIG,
                detail = %error.technical_detail(),
                "Configuration unavailable, starting with defaults"
            );
            AppConfig::default()
        }
    };

    let mut store_config = RestConfig::new(&config.store_url, &config.api_key);
    store_config.timeout = config.request_timeout();
    let mut auth_config = AuthConfig::new(&config.store_url, &config.api_key);
    auth_config.timeout = config.request_timeout();

    let store = Arc::new(RestStore::new(store_config));
    let auth = Arc::new(RestAuthClient::new(auth_config));

    run(Flags {
        log_store,
        reload_handle,
        config,
        store,
        auth,
    })
}
