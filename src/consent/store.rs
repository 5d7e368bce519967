use super::record::{now_millis, ConsentRecord, ConsentStatus};
use super::storage::{KeyValueStore, StorageError};
use std::sync::Arc;

pub const PREFERENCES_KEY: &str = "cookiePreferences";
pub const CONSENT_GIVEN_KEY: &str = "cookieConsentGiven";
pub const CONSENT_TIMESTAMP_KEY: &str = "cookieConsentTimestamp";

pub const CONSENT_KEYS: [&str; 3] = [PREFERENCES_KEY, CONSENT_GIVEN_KEY, CONSENT_TIMESTAMP_KEY];

/// The single consent slot of one client installation.
///
/// Reads never fail: unreadable or malformed data is logged and reported as
/// "no consent yet", which sends the visitor back through the banner.
pub struct ConsentStore {
    storage: Arc<dyn KeyValueStore>,
}

impl ConsentStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Option<ConsentRecord> {
        let raw = match self.storage.get(PREFERENCES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read cookie preferences: {e}");
                return None;
            }
        };

        match serde_json::from_str::<ConsentRecord>(&raw) {
            Ok(record) if record.is_well_formed() => Some(record),
            Ok(_) => {
                log::warn!("Stored cookie preferences disable necessary cookies, ignoring them");
                None
            }
            Err(e) => {
                log::warn!("Error parsing saved cookie preferences: {e}");
                None
            }
        }
    }

    /// Overwrites the stored record and marks consent as given.
    ///
    /// A partial write drops the consent marker again, so a failed save never
    /// leaves a record that reads as consent.
    pub fn save(&self, record: &ConsentRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)?;
        if let Err(e) = self.write_slots(&json) {
            if let Err(cleanup) = self.storage.remove(CONSENT_GIVEN_KEY) {
                log::warn!("Failed to drop consent marker after partial save: {cleanup}");
            }
            return Err(e);
        }
        log::debug!("Saved cookie preferences: {json}");
        Ok(())
    }

    fn write_slots(&self, json: &str) -> Result<(), StorageError> {
        self.storage.set(PREFERENCES_KEY, json)?;
        self.storage
            .set(CONSENT_TIMESTAMP_KEY, &now_millis().to_string())?;
        self.storage.set(CONSENT_GIVEN_KEY, "true")
    }

    pub fn has_consented(&self) -> bool {
        self.consent_marker() && self.load().is_some()
    }

    pub fn status(&self) -> ConsentStatus {
        let record = if self.consent_marker() {
            self.load()
        } else {
            None
        };

        match record {
            Some(record) => ConsentStatus {
                has_consented: true,
                record: Some(record),
                timestamp: self.saved_at(),
            },
            None => ConsentStatus {
                has_consented: false,
                record: None,
                timestamp: None,
            },
        }
    }

    /// Drops every consent slot. Only used to emulate the visitor clearing storage.
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in CONSENT_KEYS {
            self.storage.remove(key)?;
        }
        Ok(())
    }

    fn consent_marker(&self) -> bool {
        match self.storage.get(CONSENT_GIVEN_KEY) {
            Ok(Some(value)) => value == "true",
            Ok(None) => false,
            Err(e) => {
                log::warn!("Failed to read consent marker: {e}");
                false
            }
        }
    }

    fn saved_at(&self) -> Option<i64> {
        self.storage
            .get(CONSENT_TIMESTAMP_KEY)
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse().ok())
    }
}
