//! Cookie consent: persisted preferences, the default-deny gate over them,
//! consent-aware tracking and the banner/modal state machine.

pub mod controller;
pub mod gate;
pub mod record;
pub mod storage;
pub mod store;
pub mod tracking;

pub use controller::{ConsentController, ConsentState};
pub use gate::ConsentGate;
pub use record::{Category, ConsentRecord, ConsentSelection, ConsentStatus};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError};
pub use store::ConsentStore;
pub use tracking::{Delivery, GuardedSink, TrackingFacade, TrackingSink};
