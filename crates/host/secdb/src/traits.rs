//! Contracts the database uses to reach the rest of the stack.
//!
//! Every collaborator is injected at construction time; [`Unwired`] stands
//! in for anything the embedder does not provide, so the database also
//! works standalone (and in tests) with no stack around it.

use auto_impl::auto_impl;
use lazuli_host_primitives::{
    AddrType, BdAddr, ConnHandle, ConnectionRole, DeviceClass, DeviceType, Transport,
};

use crate::record::DeviceRecord;

/// Connection state reported by the ACL layer.
#[auto_impl(&, Box, Arc)]
pub trait ConnectionOracle {
    /// Checks whether an ACL link to `addr` is open on `transport`.
    fn is_acl_open(&self, addr: BdAddr, transport: Transport) -> bool;

    /// Handle of the open ACL link to `addr` on `transport`, or
    /// [`ConnHandle::INVALID`] when there is none.
    fn acl_handle(&self, addr: BdAddr, transport: Transport) -> ConnHandle;

    /// Checks whether a SCO link to `addr` is active.
    fn is_sco_active(&self, addr: BdAddr) -> bool;

    /// Local role on the LE link to `addr`.
    fn le_role(&self, addr: BdAddr) -> ConnectionRole;
}

/// Controller facilities the database calls out to.
#[auto_impl(&, Box, Arc)]
pub trait ControllerOps {
    /// Asks the controller to forget any link key it stores for `addr`.
    fn delete_stored_link_key(&self, addr: BdAddr);

    /// Checks whether the local controller can switch roles on a link.
    fn supports_role_switch(&self) -> bool;
}

/// Outgoing-connection bookkeeping, notified before a record is deleted.
#[auto_impl(&, Box, Arc)]
pub trait ConnectionManager {
    /// Cancels every pending connection attempt to `addr`.
    fn stop_connection_attempts(&self, addr: BdAddr);

    /// Removes `addr` from the legacy filter accept list.
    fn remove_from_accept_list(&self, addr: BdAddr);
}

/// Resolvable private address resolution.
#[auto_impl(&, Box, Arc)]
pub trait RpaResolver {
    /// Checks whether `addr` resolves to the identity held in `record`.
    fn resolves(&self, addr: BdAddr, record: &DeviceRecord) -> bool;
}

/// Per-layer hook repointing connection state from a transient address to
/// the peer's identity address.
#[auto_impl(&, Box, Arc)]
pub trait TransportConsolidator {
    fn consolidate(&self, identity_addr: BdAddr, old_addr: BdAddr);
}

/// Starts link encryption on request.
#[auto_impl(&, Box, Arc)]
pub trait EncryptionDriver {
    /// Kicks off LE encryption on the link to `addr`.
    fn encrypt_le_link(&self, addr: BdAddr);
}

/// Cached inquiry knowledge about an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InquiryInfo {
    pub dev_class: DeviceClass,
    pub device_type: DeviceType,
    /// Address type the device advertised under. [`AddrType::Anonymous`]
    /// means the advertisement carried none.
    pub addr_type: AddrType,
}

/// Read access to the inquiry result cache.
#[auto_impl(&, Box, Arc)]
pub trait InquiryCache {
    /// Cached inquiry result for `addr`.
    fn lookup(&self, addr: BdAddr) -> Option<InquiryInfo>;

    /// Address and device class of the outgoing connection currently
    /// being set up, if any.
    fn connecting(&self) -> Option<(BdAddr, DeviceClass)>;
}

/// Callback invoked after a record consolidation, with the identity
/// address and the old transient address.
pub type ConsolidationObserver = Box<dyn FnMut(BdAddr, BdAddr) + Send>;

/// Stand-in for collaborators that are not wired up: reports no
/// connections, resolves nothing, and swallows every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unwired;

impl ConnectionOracle for Unwired {
    fn is_acl_open(&self, _addr: BdAddr, _transport: Transport) -> bool {
        false
    }

    fn acl_handle(&self, _addr: BdAddr, _transport: Transport) -> ConnHandle {
        ConnHandle::INVALID
    }

    fn is_sco_active(&self, _addr: BdAddr) -> bool {
        false
    }

    fn le_role(&self, _addr: BdAddr) -> ConnectionRole {
        ConnectionRole::Peripheral
    }
}

impl ControllerOps for Unwired {
    fn delete_stored_link_key(&self, _addr: BdAddr) {}

    // Role switching is assumed available until a controller says otherwise.
    fn supports_role_switch(&self) -> bool {
        true
    }
}

impl ConnectionManager for Unwired {
    fn stop_connection_attempts(&self, _addr: BdAddr) {}

    fn remove_from_accept_list(&self, _addr: BdAddr) {}
}

impl RpaResolver for Unwired {
    fn resolves(&self, _addr: BdAddr, _record: &DeviceRecord) -> bool {
        false
    }
}

impl TransportConsolidator for Unwired {
    fn consolidate(&self, _identity_addr: BdAddr, _old_addr: BdAddr) {}
}

impl EncryptionDriver for Unwired {
    fn encrypt_le_link(&self, _addr: BdAddr) {}
}

impl InquiryCache for Unwired {
    fn lookup(&self, _addr: BdAddr) -> Option<InquiryInfo> {
        None
    }

    fn connecting(&self) -> Option<(BdAddr, DeviceClass)> {
        None
    }
}
