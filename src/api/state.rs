//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::RepairService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub repair_service: Arc<RepairService>,
}

impl AppState {
    pub fn new(repair_service: RepairService) -> Self {
        Self {
            repair_service: Arc::new(repair_service),
        }
    }
}
