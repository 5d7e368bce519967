use super::record::{Category, ConsentRecord};
use super::store::ConsentStore;
use std::sync::Arc;

/// Read-only consent checks. Every call reads the store, so a decision made
/// after a save or a storage change from another session is always current.
#[derive(Clone)]
pub struct ConsentGate {
    store: Arc<ConsentStore>,
}

impl ConsentGate {
    pub fn new(store: Arc<ConsentStore>) -> Self {
        Self { store }
    }

    /// Default-deny: without a stored record and the consent marker nothing
    /// optional is allowed.
    pub fn is_allowed(&self, category: Category) -> bool {
        self.consented_record()
            .map(|record| record.allows(category))
            .unwrap_or(false)
    }

    pub fn allowed_categories(&self) -> Vec<Category> {
        self.consented_record()
            .map(|record| record.allowed_categories())
            .unwrap_or_default()
    }

    fn consented_record(&self) -> Option<ConsentRecord> {
        self.store.status().record
    }
}
