use std::sync::Arc;

use crate::logic::SigningService;

pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SigningService>,
}

impl AppState {
    pub fn new(service: SigningService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
