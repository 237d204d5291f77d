//! The security device database and its consolidation engine.

use lazuli_host_primitives::{
    BdAddr, ConnHandle, ConnectionRole, DeviceClass, DeviceType, IoCapability, LinkKey,
    LinkKeyType, RemoteFeatures, RemoteName, Transport,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::SecurityDatabaseConfig,
    record::{BondType, DeviceRecord, SecurityFlags, SecurityState, SspMode},
    store::{RecordId, RecordStore},
    traits::{
        ConnectionManager, ConnectionOracle, ConsolidationObserver, ControllerOps,
        EncryptionDriver, InquiryCache, RpaResolver, TransportConsolidator, Unwired,
    },
};

/// A link key restored from persistent storage, as handed to
/// [`SecurityDatabase::add_or_update`].
#[derive(Debug, Clone)]
pub struct StoredLinkKey {
    /// The key material itself.
    pub key: LinkKey,
    /// How the key was generated.
    pub key_type: LinkKeyType,
    /// Length of the PIN used during the pairing that produced the key.
    pub pin_length: u8,
}

/// The security device database: one record per peer the stack has
/// paired with or is in the process of pairing with, plus the
/// consolidation logic that keeps a single record per physical device
/// once identities are resolved.
///
/// The database has a single owner. Every operation takes `&self` or
/// `&mut self` and all collaborator calls are synchronous, so no
/// locking happens here.
pub struct SecurityDatabase {
    config: SecurityDatabaseConfig,
    store: RecordStore,
    connections: Box<dyn ConnectionOracle + Send>,
    controller: Box<dyn ControllerOps + Send>,
    connection_manager: Box<dyn ConnectionManager + Send>,
    rpa: Box<dyn RpaResolver + Send>,
    acl: Box<dyn TransportConsolidator + Send>,
    l2cap: Box<dyn TransportConsolidator + Send>,
    gatt: Box<dyn TransportConsolidator + Send>,
    encryption: Box<dyn EncryptionDriver + Send>,
    inquiry: Box<dyn InquiryCache + Send>,
    observer: Option<ConsolidationObserver>,
}

impl SecurityDatabase {
    /// Creates a database with the given configuration and no wired
    /// collaborators.
    pub fn new(config: SecurityDatabaseConfig) -> Self {
        Self::builder().with_config(config).build()
    }

    /// Creates a database with default configuration and no wired
    /// collaborators.
    pub fn with_defaults() -> Self {
        Self::new(SecurityDatabaseConfig::default())
    }

    /// Starts building a database wired to the rest of the stack.
    pub fn builder() -> SecurityDatabaseBuilder {
        SecurityDatabaseBuilder::new()
    }

    /// Returns the configuration the database was built with.
    pub fn config(&self) -> &SecurityDatabaseConfig {
        &self.config
    }

    /// Current number of device records.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Checks whether the database holds no records.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterates all records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = (RecordId, &DeviceRecord)> {
        self.store.iter()
    }

    /// Generation-checked access to a record. Returns `None` for ids
    /// whose record has since been removed.
    pub fn record(&self, id: RecordId) -> Option<&DeviceRecord> {
        self.store.get(id)
    }

    /// Generation-checked mutable access to a record.
    pub fn record_mut(&mut self, id: RecordId) -> Option<&mut DeviceRecord> {
        self.store.get_mut(id)
    }

    /// Registers the observer notified after each connection
    /// consolidation, replacing any previous one.
    pub fn set_consolidation_observer(
        &mut self,
        observer: impl FnMut(BdAddr, BdAddr) + Send + 'static,
    ) {
        self.observer = Some(Box::new(observer));
    }

    /// Removes the consolidation observer.
    pub fn clear_consolidation_observer(&mut self) {
        self.observer = None;
    }

    fn matches_address(&self, record: &DeviceRecord, addr: BdAddr) -> bool {
        record.bd_addr == addr
            || record.ble.pseudo_addr == addr
            || self.rpa.resolves(addr, record)
    }

    /// Finds the record for `addr`, matching against the identity
    /// address, the LE pseudo address, or a resolvable private address
    /// that resolves to the record's identity. The first match in
    /// insertion order wins.
    pub fn find_by_address(&self, addr: BdAddr) -> Option<RecordId> {
        self.store
            .iter()
            .find(|(_, record)| self.matches_address(record, addr))
            .map(|(id, _)| id)
    }

    /// Like [`find_by_address`](Self::find_by_address), restricted to
    /// records that hold a local LE long term key. Used to decide
    /// whether a link can be re-encrypted with keys we distributed.
    pub fn find_with_le_ltk(&self, addr: BdAddr) -> Option<RecordId> {
        self.store
            .iter()
            .find(|(_, record)| record.has_le_ltk() && self.matches_address(record, addr))
            .map(|(id, _)| id)
    }

    /// Finds the record whose Classic or LE connection uses `handle`.
    pub fn find_by_handle(&self, handle: ConnHandle) -> Option<RecordId> {
        self.store
            .iter()
            .find(|(_, record)| record.hci_handle == handle || record.ble_hci_handle == handle)
            .map(|(id, _)| id)
    }

    /// Finds the record for `addr`, allocating a fresh one when the
    /// device is unknown.
    pub fn find_or_allocate(&mut self, addr: BdAddr) -> RecordId {
        match self.find_by_address(addr) {
            Some(id) => id,
            None => self.allocate(addr),
        }
    }

    /// Allocates a record for `addr`, prefilled from the inquiry cache
    /// (or the connection attempt in progress) and from any connection
    /// handles already open to the device.
    pub fn allocate(&mut self, addr: BdAddr) -> RecordId {
        let id = self.store.allocate();
        debug!(%addr, "allocated device record");

        let info = self.inquiry.lookup(addr);
        let connecting = self.inquiry.connecting();
        let le_handle = self.connections.acl_handle(addr, Transport::Le);
        let bredr_handle = self.connections.acl_handle(addr, Transport::BrEdr);

        let Some(record) = self.store.get_mut(id) else {
            return id;
        };

        if let Some(info) = info {
            record.dev_class = info.dev_class;
            record.device_type = info.device_type;
            if info.addr_type.is_known() {
                record.ble.addr_type = info.addr_type;
            } else {
                warn!(%addr, "ignoring address type from an anonymous advertisement");
            }
        } else if let Some((connecting_addr, dev_class)) = connecting {
            if connecting_addr == addr {
                record.dev_class = dev_class;
            }
        }

        record.bd_addr = addr;
        record.ble_hci_handle = le_handle;
        record.hci_handle = bredr_handle;
        id
    }

    /// Adds or refreshes a device record from persisted pairing data,
    /// normally while restoring bonded devices at startup.
    ///
    /// Always returns `true`.
    pub fn add_or_update(
        &mut self,
        addr: BdAddr,
        dev_class: Option<DeviceClass>,
        name: Option<&str>,
        features: Option<RemoteFeatures>,
        link_key: Option<StoredLinkKey>,
    ) -> bool {
        let id = match self.find_by_address(addr) {
            Some(id) => {
                debug!(%addr, "refreshing device record from stored config");
                self.store.touch(id);
                // TODO: verify that resetting the bond classification on
                // every config refresh is really intended.
                if let Some(record) = self.store.get_mut(id) {
                    record.bond_type = BondType::Unknown;
                }
                id
            }
            None => {
                debug!(%addr, "caching new device record from stored config");
                let id = self.store.allocate();
                let handle = self.connections.acl_handle(addr, Transport::BrEdr);
                if let Some(record) = self.store.get_mut(id) {
                    record.bd_addr = addr;
                    record.hci_handle = handle;
                }
                id
            }
        };

        let Some(record) = self.store.get_mut(id) else {
            return true;
        };

        if let Some(dev_class) = dev_class {
            record.dev_class = dev_class;
        }

        record.name.clear();
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            record.sec_flags |= SecurityFlags::NAME_KNOWN;
            record.name = RemoteName::new(name);
        }

        if let Some(StoredLinkKey {
            key,
            key_type,
            pin_length,
        }) = link_key
        {
            record.sec_flags |= SecurityFlags::LINK_KEY_KNOWN;
            record.link_key = key;
            record.link_key_type = key_type;
            record.pin_code_length = pin_length;
            // A key derived from a 16 digit PIN or from an MITM
            // protected pairing counts as authenticated.
            if pin_length >= 16 || key_type.is_authenticated() {
                record.sec_flags |= SecurityFlags::PIN16_AUTHED | SecurityFlags::LINK_KEY_AUTHED;
            }
        }

        if let Some(features) = features {
            record.features = Some(features);
        }

        record.remote_io_caps = IoCapability::DisplayOnly;
        record.device_type |= DeviceType::BR_EDR;

        true
    }

    /// Frees the record for `addr` and asks the controller to drop any
    /// link key it stores for the device.
    ///
    /// Refused while an ACL link to the device is up on either
    /// transport; that is the only case that returns `false`. Deleting
    /// an unknown device succeeds.
    pub fn delete(&mut self, addr: BdAddr) -> bool {
        if self.connections.is_acl_open(addr, Transport::Le)
            || self.connections.is_acl_open(addr, Transport::BrEdr)
        {
            warn!(%addr, "cannot delete device record while its connection is active");
            return false;
        }

        match self.find_by_address(addr) {
            Some(id) => {
                let Some(record) = self.store.get(id) else {
                    return true;
                };
                let identity = record.bd_addr;
                let device_type = record.device_type;
                let bond_type = record.bond_type;

                info!(%identity, "removing device from connection lists before deleting record");
                if self.config.unified_connection_manager {
                    self.connection_manager.stop_connection_attempts(identity);
                } else {
                    self.connection_manager.remove_from_accept_list(identity);
                }

                if let Some(record) = self.store.get_mut(id) {
                    record.clear_le_keys();
                }
                self.store.remove(id);
                // The controller may hold its own copy of the link key.
                self.controller.delete_stored_link_key(identity);
                info!(%addr, ?device_type, %bond_type, "device record removed");
            }
            None => {
                warn!(%addr, "unable to delete record for unknown device");
            }
        }

        true
    }

    /// Marks the device as no longer paired: clears every security
    /// flag and returns the pairing state machine to idle. Unknown
    /// addresses are ignored.
    pub fn clear_security_flags(&mut self, addr: BdAddr) {
        let Some(id) = self.find_by_address(addr) else {
            return;
        };
        if let Some(record) = self.store.get_mut(id) {
            record.sec_flags = SecurityFlags::empty();
            record.sec_state = SecurityState::Idle;
            record.ssp_mode = SspMode::Unknown;
        }
    }

    /// Returns the bond classification recorded for `addr`, or
    /// [`BondType::Unknown`] when the device is unknown.
    pub fn bond_type(&self, addr: BdAddr) -> BondType {
        self.find_by_address(addr)
            .and_then(|id| self.store.get(id))
            .map(|record| record.bond_type)
            .unwrap_or_default()
    }

    /// Records the bond classification for `addr`. Returns `false`
    /// when the device is unknown.
    pub fn set_bond_type(&mut self, addr: BdAddr, bond_type: BondType) -> bool {
        let Some(id) = self.find_by_address(addr) else {
            return false;
        };
        match self.store.get_mut(id) {
            Some(record) => {
                record.bond_type = bond_type;
                true
            }
            None => false,
        }
    }

    /// Returns the stored remote name for `addr`, if the device is
    /// known. The name may be empty when it was never read.
    pub fn read_name(&self, addr: BdAddr) -> Option<&RemoteName> {
        self.find_by_address(addr)
            .and_then(|id| self.store.get(id))
            .map(|record| &record.name)
    }

    /// Decides whether a role switch may be attempted on the Classic
    /// link to `addr`.
    ///
    /// A device whose remote features have not been read yet is assumed
    /// to support the switch; the controller rejects the request later
    /// if it turns out not to.
    pub fn supports_role_switch(&self, addr: BdAddr) -> bool {
        if self.connections.is_sco_active(addr) {
            debug!(%addr, "role switch not allowed while a SCO link is up");
            return false;
        }
        let Some(record) = self.find_by_address(addr).and_then(|id| self.store.get(id)) else {
            debug!(%addr, "role switch denied for unknown device");
            return false;
        };
        if !self.controller.supports_role_switch() {
            debug!(%addr, "local controller cannot switch roles");
            return false;
        }
        if record.remote_supports_role_switch {
            debug!(%addr, "peer supports role switch");
            return true;
        }
        if !record.remote_features_received {
            debug!(%addr, "peer capabilities unknown, assuming role switch support");
            return true;
        }
        debug!(%addr, "peer does not support role switch");
        false
    }

    /// Folds every record that turns out to describe the same peer as
    /// `target` into it.
    ///
    /// A record carrying the same identity address is a true duplicate,
    /// for example one re-created from stored config while the old one
    /// was still live. Its fields replace the target's, except that the
    /// target keeps its own LE state and bond classification, and the
    /// security flags and device type of both are merged.
    ///
    /// A record keyed by a resolvable private address duplicates the
    /// target when the address resolves to the target's identity and
    /// equals the target's recorded pseudo address. It only contributes
    /// its LE address type and device type.
    ///
    /// Donor records are wiped and removed in both cases.
    pub fn consolidate(&mut self, target: RecordId) {
        let Some(snapshot) = self.store.get(target).cloned() else {
            warn!(id = ?target, "consolidation target is gone");
            return;
        };
        debug!(addr = %snapshot.bd_addr, "consolidating duplicate device records");

        for id in self.store.ids() {
            if id == target {
                continue;
            }
            let Some(donor) = self.store.get(id) else {
                continue;
            };

            if donor.bd_addr == snapshot.bd_addr {
                debug!(addr = %snapshot.bd_addr, "merging record with duplicate identity address");
                let mut merged = donor.clone();
                merged.ble = snapshot.ble.clone();
                merged.ble_hci_handle = snapshot.ble_hci_handle;
                merged.enc_key_size = snapshot.enc_key_size;
                merged.conn_params = snapshot.conn_params;
                merged.new_encryption_key_is_p256 = snapshot.new_encryption_key_is_p256;
                merged.bond_type = snapshot.bond_type;
                merged.device_type |= snapshot.device_type;
                merged.sec_flags |= snapshot.sec_flags;

                self.store.remove(id);
                if let Some(record) = self.store.get_mut(target) {
                    *record = merged;
                }
                continue;
            }

            let donor_addr = donor.bd_addr;
            let donor_addr_type = donor.ble.addr_type;
            let donor_device_type = donor.device_type;

            let duplicate = match self.store.get(target) {
                Some(record) => {
                    self.rpa.resolves(donor_addr, record) && record.ble.pseudo_addr == donor_addr
                }
                None => false,
            };
            if duplicate {
                debug!(%donor_addr, "dropping record keyed by the device's private address");
                if let Some(record) = self.store.get_mut(target) {
                    record.ble.addr_type = donor_addr_type;
                    record.device_type |= donor_device_type;
                }
                self.store.remove(id);
            }
        }
    }

    /// Folds LE connections established under a resolvable private
    /// address into the record for a device that just bonded under its
    /// identity address, typically after cross-transport key derivation
    /// from a Classic pairing.
    ///
    /// Each matching live connection has its handle transplanted onto
    /// the identity record, the donor record is removed, and the ACL,
    /// L2CAP and GATT layers are told to re-key their state to the
    /// identity address. When the local side is central on the moved
    /// link it is encrypted with the new keys right away; a peripheral
    /// waits for the peer to start encryption.
    pub fn consolidate_existing_connections(&mut self, addr: BdAddr) {
        let Some(target) = self.find_by_address(addr) else {
            error!(%addr, "no security record for just bonded device");
            return;
        };
        let target_le_handle = self
            .store
            .get(target)
            .map(|record| record.ble_hci_handle)
            .unwrap_or_default();
        if target_le_handle.is_valid() {
            info!(%addr, "not consolidating, record already has an LE connection");
            return;
        }

        info!(%addr, "looking for LE connections to consolidate");

        for id in self.store.ids() {
            if id == target {
                continue;
            }
            let Some(donor) = self.store.get(id) else {
                continue;
            };
            let donor_addr = donor.bd_addr;
            let donor_handle = donor.ble_hci_handle;

            let resolves = match self.store.get(target) {
                Some(record) => self.rpa.resolves(donor_addr, record),
                None => false,
            };
            if !resolves {
                continue;
            }

            if !donor_handle.is_valid() {
                info!(%donor_addr, "already disconnected, erasing stale record");
                self.store.remove(id);
                continue;
            }

            info!(%donor_addr, %donor_handle, "found existing LE connection to just bonded device");

            if let Some(record) = self.store.get_mut(target) {
                record.ble_hci_handle = donor_handle;
            }
            self.store.remove(id);

            self.acl.consolidate(addr, donor_addr);
            self.l2cap.consolidate(addr, donor_addr);
            self.gatt.consolidate(addr, donor_addr);
            if let Some(observer) = self.observer.as_mut() {
                observer(addr, donor_addr);
            }

            // Only the central starts encryption, so the two sides of
            // the moved link cannot race each other.
            if self.connections.le_role(donor_addr) == ConnectionRole::Central {
                info!(%addr, "encrypting consolidated connection");
                self.encryption.encrypt_le_link(addr);
            }
        }
    }
}

impl std::fmt::Debug for SecurityDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityDatabase")
            .field("config", &self.config)
            .field("records", &self.store.len())
            .finish_non_exhaustive()
    }
}

/// Builder wiring a [`SecurityDatabase`] to the rest of the stack. Any
/// collaborator left unset behaves like [`Unwired`].
pub struct SecurityDatabaseBuilder {
    config: SecurityDatabaseConfig,
    connections: Box<dyn ConnectionOracle + Send>,
    controller: Box<dyn ControllerOps + Send>,
    connection_manager: Box<dyn ConnectionManager + Send>,
    rpa: Box<dyn RpaResolver + Send>,
    acl: Box<dyn TransportConsolidator + Send>,
    l2cap: Box<dyn TransportConsolidator + Send>,
    gatt: Box<dyn TransportConsolidator + Send>,
    encryption: Box<dyn EncryptionDriver + Send>,
    inquiry: Box<dyn InquiryCache + Send>,
}

impl Default for SecurityDatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityDatabaseBuilder {
    /// Starts a builder with default configuration and every
    /// collaborator unwired.
    pub fn new() -> Self {
        Self {
            config: SecurityDatabaseConfig::default(),
            connections: Box::new(Unwired),
            controller: Box::new(Unwired),
            connection_manager: Box::new(Unwired),
            rpa: Box::new(Unwired),
            acl: Box::new(Unwired),
            l2cap: Box::new(Unwired),
            gatt: Box::new(Unwired),
            encryption: Box::new(Unwired),
            inquiry: Box::new(Unwired),
        }
    }

    /// Sets the database configuration.
    pub fn with_config(mut self, config: SecurityDatabaseConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the connection state oracle.
    pub fn with_connections(mut self, connections: impl ConnectionOracle + Send + 'static) -> Self {
        self.connections = Box::new(connections);
        self
    }

    /// Sets the controller command surface.
    pub fn with_controller(mut self, controller: impl ControllerOps + Send + 'static) -> Self {
        self.controller = Box::new(controller);
        self
    }

    /// Sets the background connection manager.
    pub fn with_connection_manager(
        mut self,
        manager: impl ConnectionManager + Send + 'static,
    ) -> Self {
        self.connection_manager = Box::new(manager);
        self
    }

    /// Sets the resolvable private address resolver.
    pub fn with_rpa_resolver(mut self, rpa: impl RpaResolver + Send + 'static) -> Self {
        self.rpa = Box::new(rpa);
        self
    }

    /// Sets the ACL layer consolidation hook.
    pub fn with_acl_consolidator(
        mut self,
        acl: impl TransportConsolidator + Send + 'static,
    ) -> Self {
        self.acl = Box::new(acl);
        self
    }

    /// Sets the L2CAP layer consolidation hook.
    pub fn with_l2cap_consolidator(
        mut self,
        l2cap: impl TransportConsolidator + Send + 'static,
    ) -> Self {
        self.l2cap = Box::new(l2cap);
        self
    }

    /// Sets the GATT layer consolidation hook.
    pub fn with_gatt_consolidator(
        mut self,
        gatt: impl TransportConsolidator + Send + 'static,
    ) -> Self {
        self.gatt = Box::new(gatt);
        self
    }

    /// Sets the link encryption driver.
    pub fn with_encryption_driver(
        mut self,
        encryption: impl EncryptionDriver + Send + 'static,
    ) -> Self {
        self.encryption = Box::new(encryption);
        self
    }

    /// Sets the inquiry cache consulted when allocating records.
    pub fn with_inquiry_cache(mut self, inquiry: impl InquiryCache + Send + 'static) -> Self {
        self.inquiry = Box::new(inquiry);
        self
    }

    /// Finishes the database.
    pub fn build(self) -> SecurityDatabase {
        SecurityDatabase {
            store: RecordStore::new(self.config.max_records),
            config: self.config,
            connections: self.connections,
            controller: self.controller,
            connection_manager: self.connection_manager,
            rpa: self.rpa,
            acl: self.acl,
            l2cap: self.l2cap,
            gatt: self.gatt,
            encryption: self.encryption,
            inquiry: self.inquiry,
            observer: None,
        }
    }
}
