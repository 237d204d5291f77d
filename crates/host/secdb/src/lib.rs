//! Peer security device database for the Lazuli host stack.
//!
//! Holds one record per remote device the stack has paired with or is
//! pairing with, and consolidates duplicate records once a device's
//! identity address is known. The security manager owns a
//! [`SecurityDatabase`] and drives it from its own task.

pub mod config;
pub mod database;
pub mod record;
pub mod store;
pub mod traits;

pub use config::SecurityDatabaseConfig;
pub use database::{SecurityDatabase, SecurityDatabaseBuilder, StoredLinkKey};
pub use record::{
    BondType, DeviceRecord, LeKeyMask, LeKeys, LeRecord, LocalEncKey, LocalSigningKey, PeerEncKey,
    PeerIdKey, PeerSigningKey, SecurityFlags, SecurityState, SspMode,
};
pub use store::{RecordId, RecordStore};
pub use traits::{
    ConnectionManager, ConnectionOracle, ConsolidationObserver, ControllerOps, EncryptionDriver,
    InquiryCache, InquiryInfo, RpaResolver, TransportConsolidator, Unwired,
};
