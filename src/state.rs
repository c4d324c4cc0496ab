use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::local::LocalStorage;
use crate::modules::shader::repository::JobTable;
use crate::modules::shader::service::ShaderService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: LocalStorage,
    pub shaders: ShaderService,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let storage = LocalStorage::new(config.upload_dir.clone(), config.output_dir.clone());
        let shaders = ShaderService::new(Arc::clone(&config), Arc::new(JobTable::new()));
        Self {
            config,
            storage,
            shaders,
        }
    }
}
