use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::catalog::MovieCatalog;
use crate::config::AppConfig;
use crate::sentiment::SentimentProvider;
use crate::store::DocumentStore;

/// Shared application state: the configuration plus one trait object per
/// external collaborator. Cloned per request; everything inside is Arc'd and
/// immutable (collaborators manage their own interior caches).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub catalog: Arc<dyn MovieCatalog>,
    pub sentiment: Arc<dyn SentimentProvider>,
}
