use super::gate::ConsentGate;
use super::record::{Category, ConsentRecord, ConsentSelection};
use super::store::{ConsentStore, CONSENT_KEYS};
use super::tracking::TrackingFacade;
use std::sync::Arc;

/// Where the consent UI currently is.
///
/// `BannerVisible` and `DetailModalVisible` are overlays on top of one of the
/// two hidden states; which one is tracked separately by `has_consented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    Uninitialized,
    BannerHiddenNoConsent,
    BannerHiddenConsented,
    BannerVisible,
    DetailModalVisible,
}

/// Drives the consent banner and modal for one client session.
///
/// Every storage problem resolves to "ask again": the banner is shown and the
/// gate keeps denying, instead of an error reaching the page.
pub struct ConsentController {
    store: Arc<ConsentStore>,
    gate: ConsentGate,
    tracking: TrackingFacade,
    preferences: ConsentRecord,
    has_consented: bool,
    state: ConsentState,
}

impl ConsentController {
    pub fn new(store: Arc<ConsentStore>, gate: ConsentGate, tracking: TrackingFacade) -> Self {
        Self {
            store,
            gate,
            tracking,
            preferences: ConsentRecord::default(),
            has_consented: false,
            state: ConsentState::Uninitialized,
        }
    }

    pub fn mount(&mut self) -> ConsentState {
        let status = self.store.status();

        match status.record {
            Some(record) if status.has_consented => {
                self.preferences = record;
                self.has_consented = true;
                self.tracking.apply(&self.preferences);
                self.state = ConsentState::BannerHiddenConsented;
            }
            _ => {
                log::debug!("No cookie consent on record, showing banner");
                self.preferences = ConsentRecord::default();
                self.has_consented = false;
                self.state = ConsentState::BannerVisible;
            }
        }

        self.state
    }

    pub fn accept_all(&mut self) -> ConsentState {
        self.commit(ConsentRecord::accept_all())
    }

    pub fn reject_all(&mut self) -> ConsentState {
        self.commit(ConsentRecord::reject_all())
    }

    pub fn save_selected(&mut self, selection: ConsentSelection) -> ConsentState {
        let record = selection.apply_to(&self.preferences);
        self.commit(record)
    }

    /// The visitor asked to change their cookie settings.
    pub fn request_reopen(&mut self) -> ConsentState {
        log::debug!("Cookie consent banner requested by user");
        self.state = ConsentState::BannerVisible;
        self.state
    }

    pub fn open_detail_modal(&mut self) -> ConsentState {
        self.state = ConsentState::DetailModalVisible;
        self.state
    }

    pub fn close_detail_modal(&mut self) -> ConsentState {
        if self.state == ConsentState::DetailModalVisible {
            self.state = if self.has_consented {
                ConsentState::BannerHiddenConsented
            } else {
                ConsentState::BannerVisible
            };
        }
        self.state
    }

    /// Hides the banner without recording a choice. Nothing is persisted, so
    /// the gate keeps denying and the next mount shows the banner again.
    pub fn dismiss_banner(&mut self) -> ConsentState {
        if self.state == ConsentState::BannerVisible {
            self.state = if self.has_consented {
                ConsentState::BannerHiddenConsented
            } else {
                ConsentState::BannerHiddenNoConsent
            };
        }
        self.state
    }

    /// Re-reads the store after another session wrote one of the consent slots.
    /// Keys that do not belong to the consent record are ignored.
    pub fn on_storage_changed(&mut self, key: &str) -> ConsentState {
        if !CONSENT_KEYS.contains(&key) || self.state == ConsentState::Uninitialized {
            return self.state;
        }

        let status = self.store.status();
        match status.record {
            Some(record) if status.has_consented => {
                log::info!("Cookie preferences changed in another session, re-applying");
                self.preferences = record;
                self.has_consented = true;
                self.tracking.apply(&self.preferences);
                if matches!(
                    self.state,
                    ConsentState::BannerVisible | ConsentState::BannerHiddenNoConsent
                ) {
                    self.state = ConsentState::BannerHiddenConsented;
                }
            }
            _ => {
                log::info!("Cookie consent removed in another session");
                self.preferences = ConsentRecord::default();
                self.has_consented = false;
                if self.state != ConsentState::DetailModalVisible {
                    self.state = ConsentState::BannerVisible;
                }
            }
        }

        self.state
    }

    pub fn state(&self) -> ConsentState {
        self.state
    }

    pub fn preferences(&self) -> &ConsentRecord {
        &self.preferences
    }

    pub fn has_consented(&self) -> bool {
        self.has_consented
    }

    pub fn is_banner_visible(&self) -> bool {
        self.state == ConsentState::BannerVisible
    }

    pub fn is_detail_modal_open(&self) -> bool {
        self.state == ConsentState::DetailModalVisible
    }

    pub fn is_allowed(&self, category: Category) -> bool {
        self.gate.is_allowed(category)
    }

    pub fn gate(&self) -> &ConsentGate {
        &self.gate
    }

    pub fn tracking(&self) -> &TrackingFacade {
        &self.tracking
    }

    fn commit(&mut self, record: ConsentRecord) -> ConsentState {
        match self.store.save(&record) {
            Ok(()) => {
                self.preferences = record;
                self.has_consented = true;
                self.tracking.apply(&self.preferences);
                self.state = ConsentState::BannerHiddenConsented;
            }
            Err(e) => {
                log::warn!("Failed to save cookie preferences, asking again: {e}");
                self.has_consented = false;
                self.state = ConsentState::BannerVisible;
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::storage::{KeyValueStore, MemoryStorage, StorageError};
    use crate::consent::store::{CONSENT_GIVEN_KEY, PREFERENCES_KEY};

    struct BrokenStorage;

    impl KeyValueStore for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    /// Memory slots that refuse to record the consent marker.
    struct MarkerRejecting(MemoryStorage);

    impl KeyValueStore for MarkerRejecting {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == CONSENT_GIVEN_KEY {
                return Err(StorageError::Poisoned);
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key)
        }
    }

    fn controller_on(storage: Arc<dyn KeyValueStore>) -> ConsentController {
        let store = Arc::new(ConsentStore::new(storage));
        let gate = ConsentGate::new(store.clone());
        let tracking = TrackingFacade::disabled(gate.clone());
        ConsentController::new(store, gate, tracking)
    }

    #[test]
    fn test_starts_uninitialized() {
        let controller = controller_on(Arc::new(MemoryStorage::new()));
        assert_eq!(controller.state(), ConsentState::Uninitialized);
        assert!(!controller.has_consented());
        assert!(controller.preferences().necessary());
    }

    #[test]
    fn test_fresh_client_sees_banner() {
        let mut controller = controller_on(Arc::new(MemoryStorage::new()));
        assert_eq!(controller.mount(), ConsentState::BannerVisible);
        assert!(controller.is_banner_visible());
    }

    #[test]
    fn test_existing_consent_hides_banner() {
        let storage = MemoryStorage::new();
        let store = ConsentStore::new(Arc::new(storage.clone()));
        store.save(&ConsentRecord::new(true, true, false)).unwrap();

        let mut controller = controller_on(Arc::new(storage));
        assert_eq!(controller.mount(), ConsentState::BannerHiddenConsented);
        assert!(controller.preferences().analytical);
        assert!(!controller.preferences().marketing);
    }

    #[test]
    fn test_corrupted_storage_shows_banner() {
        let storage = MemoryStorage::new();
        storage.set(PREFERENCES_KEY, "][").unwrap();
        storage.set(CONSENT_GIVEN_KEY, "true").unwrap();

        let mut controller = controller_on(Arc::new(storage));
        assert_eq!(controller.mount(), ConsentState::BannerVisible);
        assert!(!controller.has_consented());
    }

    #[test]
    fn test_partial_save_keeps_gate_closed() {
        let mut controller = controller_on(Arc::new(MarkerRejecting(MemoryStorage::new())));
        controller.mount();

        assert_eq!(controller.accept_all(), ConsentState::BannerVisible);
        assert!(!controller.has_consented());
        for category in Category::ALL {
            assert!(!controller.is_allowed(category));
        }
    }

    #[test]
    fn test_accept_and_reject_all() {
        let mut controller = controller_on(Arc::new(MemoryStorage::new()));
        controller.mount();

        assert_eq!(controller.accept_all(), ConsentState::BannerHiddenConsented);
        for category in Category::ALL {
            assert!(controller.is_allowed(category));
        }

        controller.request_reopen();
        assert_eq!(controller.reject_all(), ConsentState::BannerHiddenConsented);
        for category in Category::ALL {
            assert!(!controller.is_allowed(category));
        }
        assert!(controller.preferences().necessary());
    }

    #[test]
    fn test_reopen_from_consented_state() {
        let mut controller = controller_on(Arc::new(MemoryStorage::new()));
        controller.mount();
        controller.accept_all();

        assert_eq!(controller.request_reopen(), ConsentState::BannerVisible);
        assert!(controller.has_consented());
        assert_eq!(controller.dismiss_banner(), ConsentState::BannerHiddenConsented);
    }

    #[test]
    fn test_detail_modal_close_depends_on_consent() {
        let mut controller = controller_on(Arc::new(MemoryStorage::new()));
        controller.mount();

        assert_eq!(controller.open_detail_modal(), ConsentState::DetailModalVisible);
        assert_eq!(controller.close_detail_modal(), ConsentState::BannerVisible);

        controller.accept_all();
        controller.open_detail_modal();
        assert!(controller.is_detail_modal_open());
        assert_eq!(
            controller.close_detail_modal(),
            ConsentState::BannerHiddenConsented
        );
    }

    #[test]
    fn test_saving_from_modal_closes_it() {
        let mut controller = controller_on(Arc::new(MemoryStorage::new()));
        controller.mount();
        controller.open_detail_modal();

        let state = controller.save_selected(ConsentSelection::new(false, false, true));

        assert_eq!(state, ConsentState::BannerHiddenConsented);
        assert!(controller.is_allowed(Category::Marketing));
        assert!(!controller.is_allowed(Category::Functional));
    }

    #[test]
    fn test_dismiss_without_consent() {
        let storage = MemoryStorage::new();
        let mut controller = controller_on(Arc::new(storage.clone()));
        controller.mount();

        assert_eq!(controller.dismiss_banner(), ConsentState::BannerHiddenNoConsent);
        assert!(!controller.is_allowed(Category::Functional));

        let mut next_session = controller_on(Arc::new(storage));
        assert_eq!(next_session.mount(), ConsentState::BannerVisible);
    }

    #[test]
    fn test_storage_failure_falls_back_to_banner() {
        let mut controller = controller_on(Arc::new(BrokenStorage));
        assert_eq!(controller.mount(), ConsentState::BannerVisible);

        assert_eq!(controller.accept_all(), ConsentState::BannerVisible);
        assert!(!controller.has_consented());
        assert!(!controller.is_allowed(Category::Analytical));
    }

    #[test]
    fn test_storage_change_from_other_session() {
        let storage = MemoryStorage::new();
        let mut first = controller_on(Arc::new(storage.clone()));
        let mut second = controller_on(Arc::new(storage.clone()));
        first.mount();
        second.mount();

        first.save_selected(ConsentSelection::new(true, false, false));
        assert!(!second.has_consented());

        assert_eq!(
            second.on_storage_changed(PREFERENCES_KEY),
            ConsentState::BannerHiddenConsented
        );
        assert!(second.preferences().functional);

        assert_eq!(
            second.on_storage_changed("unrelatedKey"),
            ConsentState::BannerHiddenConsented
        );

        ConsentStore::new(Arc::new(storage)).clear().unwrap();
        assert_eq!(
            second.on_storage_changed(CONSENT_GIVEN_KEY),
            ConsentState::BannerVisible
        );
        assert!(!second.has_consented());
    }
}
