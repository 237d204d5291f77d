//! Record lifecycle against recording fakes: creation from stored
//! pairing data, refresh, queries and deletion.

use std::sync::{Arc, Mutex};

use lazuli_host_primitives::{
    BdAddr, ConnHandle, ConnectionRole, DeviceClass, DeviceType, IoCapability, LinkKey,
    LinkKeyType, RemoteFeatures, Transport,
};
use lazuli_host_secdb::{
    BondType, ConnectionManager, ConnectionOracle, ControllerOps, SecurityDatabase,
    SecurityDatabaseConfig, SecurityFlags, SecurityState, SspMode, StoredLinkKey,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    StopConnectionAttempts(BdAddr),
    RemoveFromAcceptList(BdAddr),
    DeleteStoredLinkKey(BdAddr),
}

#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }
}

struct RecordingController(CallLog);

impl ControllerOps for RecordingController {
    fn delete_stored_link_key(&self, addr: BdAddr) {
        self.0.push(Call::DeleteStoredLinkKey(addr));
    }

    fn supports_role_switch(&self) -> bool {
        true
    }
}

struct RecordingConnectionManager(CallLog);

impl ConnectionManager for RecordingConnectionManager {
    fn stop_connection_attempts(&self, addr: BdAddr) {
        self.0.push(Call::StopConnectionAttempts(addr));
    }

    fn remove_from_accept_list(&self, addr: BdAddr) {
        self.0.push(Call::RemoveFromAcceptList(addr));
    }
}

/// Fixed connection state handed to the database under test.
#[derive(Default)]
struct Links {
    le: Vec<BdAddr>,
    bredr: Vec<BdAddr>,
    sco: Vec<BdAddr>,
}

impl ConnectionOracle for Links {
    fn is_acl_open(&self, addr: BdAddr, transport: Transport) -> bool {
        match transport {
            Transport::BrEdr => self.bredr.contains(&addr),
            Transport::Le => self.le.contains(&addr),
        }
    }

    fn acl_handle(&self, addr: BdAddr, transport: Transport) -> ConnHandle {
        if self.is_acl_open(addr, transport) {
            ConnHandle::new(0x0042)
        } else {
            ConnHandle::INVALID
        }
    }

    fn is_sco_active(&self, addr: BdAddr) -> bool {
        self.sco.contains(&addr)
    }

    fn le_role(&self, _addr: BdAddr) -> ConnectionRole {
        ConnectionRole::Peripheral
    }
}

struct FixedController {
    role_switch: bool,
}

impl ControllerOps for FixedController {
    fn delete_stored_link_key(&self, _addr: BdAddr) {}

    fn supports_role_switch(&self) -> bool {
        self.role_switch
    }
}

fn addr(last: u8) -> BdAddr {
    BdAddr::new([0x00, 0x1b, 0xdc, 0x08, 0x00, last])
}

fn stored_key(fill: u8, key_type: LinkKeyType, pin_length: u8) -> StoredLinkKey {
    StoredLinkKey {
        key: LinkKey::new([fill; 16]),
        key_type,
        pin_length,
    }
}

#[test]
fn added_device_reads_back_with_merged_metadata() {
    let mut db = SecurityDatabase::with_defaults();
    let dev_class = DeviceClass::new([0x24, 0x04, 0x18]);
    let features = RemoteFeatures::new([0xbf, 0xfe, 0xcf, 0xfe, 0xdb, 0xff, 0x7b, 0x87]);

    assert!(db.add_or_update(
        addr(1),
        Some(dev_class),
        Some("Speaker"),
        Some(features),
        Some(stored_key(0x5a, LinkKeyType::Combination, 4)),
    ));

    let id = db.find_by_address(addr(1)).unwrap();
    let record = db.record(id).unwrap();
    assert_eq!(record.bd_addr, addr(1));
    assert_eq!(record.dev_class, dev_class);
    assert_eq!(record.name.as_str(), "Speaker");
    assert_eq!(record.features, Some(features));
    assert_eq!(record.link_key.as_bytes(), &[0x5a; 16]);
    assert_eq!(record.link_key_type, LinkKeyType::Combination);
    assert_eq!(record.remote_io_caps, IoCapability::DisplayOnly);
    assert!(record.device_type.contains(DeviceType::BR_EDR));
    assert!(
        record
            .sec_flags
            .contains(SecurityFlags::NAME_KNOWN | SecurityFlags::LINK_KEY_KNOWN)
    );
    // An unauthenticated key from a short PIN stays unauthenticated.
    assert!(!record.sec_flags.contains(SecurityFlags::LINK_KEY_AUTHED));
    assert_eq!(record.bond_type, BondType::Unknown);
}

#[test]
fn refreshing_a_record_resets_its_bond_classification() {
    let mut db = SecurityDatabase::with_defaults();
    db.add_or_update(addr(1), None, None, None, None);
    assert!(db.set_bond_type(addr(1), BondType::Bonded));
    assert_eq!(db.bond_type(addr(1)), BondType::Bonded);

    db.add_or_update(addr(1), None, None, None, None);
    assert_eq!(db.bond_type(addr(1)), BondType::Unknown);
    assert_eq!(db.len(), 1);
}

#[test]
fn refresh_clears_stale_name_but_keeps_it_known() {
    let mut db = SecurityDatabase::with_defaults();
    db.add_or_update(addr(1), None, Some("Speaker"), None, None);
    db.add_or_update(addr(1), None, None, None, None);

    let record = db.record(db.find_by_address(addr(1)).unwrap()).unwrap();
    assert!(record.name.is_empty());
    assert!(record.sec_flags.contains(SecurityFlags::NAME_KNOWN));
}

#[test]
fn authenticated_link_keys_upgrade_security_flags() {
    let authed = SecurityFlags::LINK_KEY_AUTHED | SecurityFlags::PIN16_AUTHED;

    // MITM protected key type.
    let mut db = SecurityDatabase::with_defaults();
    db.add_or_update(
        addr(1),
        None,
        None,
        None,
        Some(stored_key(0x11, LinkKeyType::AuthenticatedP192, 0)),
    );
    let record = db.record(db.find_by_address(addr(1)).unwrap()).unwrap();
    assert!(record.sec_flags.contains(authed));

    // Sixteen digit PIN with a legacy key type.
    let mut db = SecurityDatabase::with_defaults();
    db.add_or_update(
        addr(1),
        None,
        None,
        None,
        Some(stored_key(0x22, LinkKeyType::Combination, 16)),
    );
    let record = db.record(db.find_by_address(addr(1)).unwrap()).unwrap();
    assert!(record.sec_flags.contains(authed));

    // Short PIN, unauthenticated key type.
    let mut db = SecurityDatabase::with_defaults();
    db.add_or_update(
        addr(1),
        None,
        None,
        None,
        Some(stored_key(0x33, LinkKeyType::UnauthenticatedP256, 6)),
    );
    let record = db.record(db.find_by_address(addr(1)).unwrap()).unwrap();
    assert!(!record.sec_flags.intersects(authed));
}

#[test]
fn capacity_is_enforced_from_configuration() {
    let mut db = SecurityDatabase::new(SecurityDatabaseConfig {
        max_records: 2,
        ..Default::default()
    });

    for last in 1..=4 {
        db.find_or_allocate(addr(last));
    }

    // The store rests one past the cap; the oldest unpaired record paid
    // for the final allocation.
    assert_eq!(db.len(), 3);
    assert_eq!(db.find_by_address(addr(1)), None);
    for last in 2..=4 {
        assert!(db.find_by_address(addr(last)).is_some());
    }
}

#[test]
fn delete_refused_while_a_connection_is_up() {
    for links in [
        Links {
            le: vec![addr(1)],
            ..Default::default()
        },
        Links {
            bredr: vec![addr(1)],
            ..Default::default()
        },
    ] {
        let mut db = SecurityDatabase::builder().with_connections(links).build();
        db.add_or_update(addr(1), None, None, None, None);

        assert!(!db.delete(addr(1)));
        assert!(db.find_by_address(addr(1)).is_some());
    }
}

#[test]
fn delete_notifies_controller_and_connection_lists() {
    let log = CallLog::default();
    let mut db = SecurityDatabase::builder()
        .with_controller(RecordingController(log.clone()))
        .with_connection_manager(RecordingConnectionManager(log.clone()))
        .build();
    db.add_or_update(addr(1), None, None, None, None);

    assert!(db.delete(addr(1)));
    assert_eq!(db.find_by_address(addr(1)), None);
    assert_eq!(
        log.calls(),
        vec![
            Call::RemoveFromAcceptList(addr(1)),
            Call::DeleteStoredLinkKey(addr(1)),
        ]
    );
}

#[test]
fn unified_connection_manager_stops_pending_attempts() {
    let log = CallLog::default();
    let mut db = SecurityDatabase::builder()
        .with_config(SecurityDatabaseConfig {
            unified_connection_manager: true,
            ..Default::default()
        })
        .with_controller(RecordingController(log.clone()))
        .with_connection_manager(RecordingConnectionManager(log.clone()))
        .build();
    db.add_or_update(addr(1), None, None, None, None);

    assert!(db.delete(addr(1)));
    assert_eq!(
        log.calls(),
        vec![
            Call::StopConnectionAttempts(addr(1)),
            Call::DeleteStoredLinkKey(addr(1)),
        ]
    );
}

#[test]
fn deleting_an_unknown_device_reports_success() {
    let log = CallLog::default();
    let mut db = SecurityDatabase::builder()
        .with_controller(RecordingController(log.clone()))
        .with_connection_manager(RecordingConnectionManager(log.clone()))
        .build();

    assert!(db.delete(addr(1)));
    assert!(log.calls().is_empty());
}

#[test]
fn delete_resolves_pseudo_address_to_identity() {
    let log = CallLog::default();
    let mut db = SecurityDatabase::builder()
        .with_controller(RecordingController(log.clone()))
        .with_connection_manager(RecordingConnectionManager(log.clone()))
        .build();
    let id = db.find_or_allocate(addr(1));
    if let Some(record) = db.record_mut(id) {
        record.ble.pseudo_addr = addr(9);
    }

    // Deletion by pseudo address tears down state under the identity.
    assert!(db.delete(addr(9)));
    assert_eq!(
        log.calls(),
        vec![
            Call::RemoveFromAcceptList(addr(1)),
            Call::DeleteStoredLinkKey(addr(1)),
        ]
    );
}

#[test]
fn clearing_security_flags_resets_pairing_state() {
    let mut db = SecurityDatabase::with_defaults();
    let id = db.find_or_allocate(addr(1));
    if let Some(record) = db.record_mut(id) {
        record.sec_flags |= SecurityFlags::LINK_KEY_KNOWN | SecurityFlags::AUTHENTICATED;
        record.sec_state = SecurityState::Authenticating;
        record.ssp_mode = SspMode::Supported;
    }

    db.clear_security_flags(addr(1));
    let record = db.record(id).unwrap();
    assert!(record.sec_flags.is_empty());
    assert!(record.sec_state.is_idle());
    assert_eq!(record.ssp_mode, SspMode::Unknown);

    // Clearing again changes nothing.
    db.clear_security_flags(addr(1));
    let record = db.record(id).unwrap();
    assert!(record.sec_flags.is_empty());
    assert!(record.sec_state.is_idle());

    // Unknown devices are ignored.
    db.clear_security_flags(addr(2));
}

#[test]
fn bond_type_defaults_to_unknown_for_unknown_devices() {
    let mut db = SecurityDatabase::with_defaults();
    assert_eq!(db.bond_type(addr(1)), BondType::Unknown);
    assert!(!db.set_bond_type(addr(1), BondType::NotBonded));

    db.find_or_allocate(addr(1));
    assert!(db.set_bond_type(addr(1), BondType::NotBonded));
    assert_eq!(db.bond_type(addr(1)), BondType::NotBonded);
}

#[test]
fn read_name_returns_stored_name() {
    let mut db = SecurityDatabase::with_defaults();
    assert!(db.read_name(addr(1)).is_none());

    db.add_or_update(addr(1), None, Some("Speaker"), None, None);
    assert_eq!(db.read_name(addr(1)).map(|name| name.as_str()), Some("Speaker"));
}

#[test]
fn role_switch_follows_link_and_feature_state() {
    let mut db = SecurityDatabase::builder()
        .with_connections(Links {
            sco: vec![addr(5)],
            ..Default::default()
        })
        .with_controller(FixedController { role_switch: true })
        .build();

    let id = db.find_or_allocate(addr(5));
    // A SCO link vetoes the switch no matter what the peer supports.
    assert!(!db.supports_role_switch(addr(5)));

    // Unknown device.
    assert!(!db.supports_role_switch(addr(6)));

    // Features not read yet: optimistically allowed.
    if let Some(record) = db.record_mut(id) {
        record.bd_addr = addr(1);
    }
    assert!(db.supports_role_switch(addr(1)));

    // Features read, peer cannot switch.
    if let Some(record) = db.record_mut(id) {
        record.remote_features_received = true;
    }
    assert!(!db.supports_role_switch(addr(1)));

    // Peer advertises the capability.
    if let Some(record) = db.record_mut(id) {
        record.remote_supports_role_switch = true;
    }
    assert!(db.supports_role_switch(addr(1)));
}

#[test]
fn role_switch_requires_controller_support() {
    let mut db = SecurityDatabase::builder()
        .with_controller(FixedController { role_switch: false })
        .build();
    let id = db.find_or_allocate(addr(1));
    if let Some(record) = db.record_mut(id) {
        record.remote_supports_role_switch = true;
    }

    assert!(!db.supports_role_switch(addr(1)));
}
