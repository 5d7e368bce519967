//! Consent-aware access to third-party tracking backends.
//!
//! Nothing in the site talks to an analytics or marketing backend directly.
//! Backends are handed to [`TrackingFacade`] at construction, each one wrapped
//! in a [`GuardedSink`] that asks the [`ConsentGate`] on every call. A backend
//! that was never configured is simply absent: there is nothing to wrap and
//! reports for its category become no-ops.

use super::gate::ConsentGate;
use super::record::{Category, ConsentRecord};
use serde_json::{json, Value};
use std::sync::Arc;

/// A third-party tracking entry point (analytics reporter, marketing pixel).
pub trait TrackingSink: Send + Sync {
    fn name(&self) -> &str;

    /// Fire-and-forget event report.
    fn track(&self, event: &str, payload: &Value);

    /// Bootstrap run when the sink's category becomes allowed.
    fn initialize(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Forwarded,
    Blocked,
    Unavailable,
}

/// Wraps a sink so calls only reach it while its category is allowed.
pub struct GuardedSink {
    category: Category,
    gate: ConsentGate,
    inner: Arc<dyn TrackingSink>,
}

impl GuardedSink {
    pub fn new(category: Category, gate: ConsentGate, inner: Arc<dyn TrackingSink>) -> Self {
        Self {
            category,
            gate,
            inner,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn forward(&self, event: &str, payload: &Value) -> Delivery {
        if !self.gate.is_allowed(self.category) {
            log::debug!(
                "{} blocked - no {} consent given for: {event}",
                self.inner.name(),
                self.category
            );
            return Delivery::Blocked;
        }

        self.inner.track(event, payload);
        Delivery::Forwarded
    }

    fn try_initialize(&self) -> bool {
        if !self.gate.is_allowed(self.category) {
            log::debug!(
                "{} initialization blocked - no {} consent given",
                self.inner.name(),
                self.category
            );
            return false;
        }

        self.inner.initialize();
        log::info!("{} initialized with consent", self.inner.name());
        true
    }
}

impl TrackingSink for GuardedSink {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn track(&self, event: &str, payload: &Value) {
        self.forward(event, payload);
    }

    fn initialize(&self) {
        self.try_initialize();
    }
}

pub struct TrackingFacade {
    analytics: Option<Arc<GuardedSink>>,
    marketing: Option<Arc<GuardedSink>>,
}

impl TrackingFacade {
    pub fn new(
        gate: ConsentGate,
        analytics: Option<Arc<dyn TrackingSink>>,
        marketing: Option<Arc<dyn TrackingSink>>,
    ) -> Self {
        let analytics = analytics.map(|sink| {
            Arc::new(GuardedSink::new(Category::Analytical, gate.clone(), sink))
        });
        let marketing =
            marketing.map(|sink| Arc::new(GuardedSink::new(Category::Marketing, gate, sink)));

        if analytics.is_some() || marketing.is_some() {
            log::debug!("Tracking blocked until consent is given");
        }

        Self {
            analytics,
            marketing,
        }
    }

    /// Facade without any backend; every report is a no-op.
    pub fn disabled(gate: ConsentGate) -> Self {
        Self::new(gate, None, None)
    }

    /// Guarded entry point for a category, for callers that need to hold a sink.
    pub fn sink(&self, category: Category) -> Option<Arc<dyn TrackingSink>> {
        self.guarded(category)
            .map(|sink| sink.clone() as Arc<dyn TrackingSink>)
    }

    pub fn report(&self, category: Category, event: &str, payload: &Value) -> Delivery {
        match self.guarded(category) {
            Some(sink) => sink.forward(event, payload),
            None => {
                log::debug!("No {category} tracker installed, dropping: {event}");
                Delivery::Unavailable
            }
        }
    }

    pub fn track_page_view(&self, url: &str) -> Delivery {
        self.report(
            Category::Analytical,
            "page_view",
            &json!({ "page_location": url }),
        )
    }

    pub fn track_event(&self, event: &str, payload: &Value) -> Delivery {
        self.report(Category::Analytical, event, payload)
    }

    /// Runs the bootstrap of every installed sink whose category the record
    /// allows. Returns the categories that were initialized.
    pub fn apply(&self, record: &ConsentRecord) -> Vec<Category> {
        log::debug!("Applying cookie preferences: {record:?}");

        if record.functional {
            log::info!("Functional cookies enabled");
        } else {
            log::info!("Functional cookies disabled");
        }

        let mut initialized = Vec::new();
        for category in [Category::Analytical, Category::Marketing] {
            if !record.allows(category) {
                continue;
            }
            if let Some(sink) = self.guarded(category) {
                if sink.try_initialize() {
                    initialized.push(category);
                }
            }
        }
        initialized
    }

    fn guarded(&self, category: Category) -> Option<&Arc<GuardedSink>> {
        match category {
            Category::Analytical => self.analytics.as_ref(),
            Category::Marketing => self.marketing.as_ref(),
            Category::Functional => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::storage::MemoryStorage;
    use crate::consent::store::ConsentStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, Value)>>,
        initialized: Mutex<u32>,
    }

    impl TrackingSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn track(&self, event: &str, payload: &Value) {
            self.calls
                .lock()
                .unwrap()
                .push((event.to_string(), payload.clone()));
        }

        fn initialize(&self) {
            *self.initialized.lock().unwrap() += 1;
        }
    }

    fn setup() -> (Arc<ConsentStore>, TrackingFacade, Arc<RecordingSink>, Arc<RecordingSink>) {
        let store = Arc::new(ConsentStore::new(Arc::new(MemoryStorage::new())));
        let gate = ConsentGate::new(store.clone());
        let analytics = Arc::new(RecordingSink::default());
        let marketing = Arc::new(RecordingSink::default());
        let facade = TrackingFacade::new(
            gate,
            Some(analytics.clone() as Arc<dyn TrackingSink>),
            Some(marketing.clone() as Arc<dyn TrackingSink>),
        );
        (store, facade, analytics, marketing)
    }

    #[test]
    fn test_analytics_dropped_without_consent() {
        let (store, facade, analytics, _) = setup();
        store.save(&ConsentRecord::new(true, false, true)).unwrap();

        let delivery = facade.report(Category::Analytical, "signup", &json!({"plan": "pro"}));

        assert_eq!(delivery, Delivery::Blocked);
        assert!(analytics.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_analytics_forwarded_with_identical_arguments() {
        let (store, facade, analytics, marketing) = setup();
        store.save(&ConsentRecord::new(false, true, false)).unwrap();
        let payload = json!({"plan": "pro", "value": 42});

        let delivery = facade.report(Category::Analytical, "signup", &payload);

        assert_eq!(delivery, Delivery::Forwarded);
        assert_eq!(
            *analytics.calls.lock().unwrap(),
            vec![("signup".to_string(), payload)]
        );
        assert!(marketing.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_gate_checked_at_call_time() {
        let (store, facade, analytics, _) = setup();
        let sink = facade.sink(Category::Analytical).unwrap();

        sink.track("before", &Value::Null);
        store.save(&ConsentRecord::accept_all()).unwrap();
        sink.track("after", &Value::Null);
        store.save(&ConsentRecord::reject_all()).unwrap();
        sink.track("revoked", &Value::Null);

        let calls = analytics.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "after");
    }

    #[test]
    fn test_missing_backend_is_noop() {
        let store = Arc::new(ConsentStore::new(Arc::new(MemoryStorage::new())));
        store.save(&ConsentRecord::accept_all()).unwrap();
        let facade = TrackingFacade::disabled(ConsentGate::new(store));

        assert!(facade.sink(Category::Marketing).is_none());
        assert_eq!(
            facade.report(Category::Marketing, "purchase", &Value::Null),
            Delivery::Unavailable
        );
        assert_eq!(facade.track_page_view("/"), Delivery::Unavailable);
        assert!(facade.apply(&ConsentRecord::accept_all()).is_empty());
    }

    #[test]
    fn test_page_view_payload() {
        let (store, facade, analytics, _) = setup();
        store.save(&ConsentRecord::accept_all()).unwrap();

        facade.track_page_view("https://crescere.sk/#portfolio");

        let calls = analytics.calls.lock().unwrap();
        assert_eq!(calls[0].0, "page_view");
        assert_eq!(
            calls[0].1,
            json!({"page_location": "https://crescere.sk/#portfolio"})
        );
    }

    #[test]
    fn test_apply_initializes_only_allowed_sinks() {
        let (store, facade, analytics, marketing) = setup();
        let record = ConsentRecord::new(true, true, false);
        store.save(&record).unwrap();

        let initialized = facade.apply(&record);

        assert_eq!(initialized, vec![Category::Analytical]);
        assert_eq!(*analytics.initialized.lock().unwrap(), 1);
        assert_eq!(*marketing.initialized.lock().unwrap(), 0);
    }
}
