//! The device record model: identity, security flags, and key material.

use bitflags::bitflags;
use lazuli_host_primitives::{
    AddrType, BdAddr, ConnHandle, ConnParams, DeviceClass, DeviceType, IoCapability, LinkKey,
    LinkKeyType, Octet16, RemoteFeatures, RemoteName,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

bitflags! {
    /// Security attributes known about a device, per transport.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SecurityFlags: u16 {
        /// The record is allocated.
        const IN_USE = 1 << 0;
        /// The BR/EDR link is encrypted.
        const ENCRYPTED = 1 << 1;
        /// The BR/EDR link has been authenticated.
        const AUTHENTICATED = 1 << 2;
        /// The remote name has been read.
        const NAME_KNOWN = 1 << 3;
        /// A BR/EDR link key is stored.
        const LINK_KEY_KNOWN = 1 << 4;
        /// The stored link key came from MITM protected pairing.
        const LINK_KEY_AUTHED = 1 << 5;
        /// The stored link key came from a 16 digit PIN or MITM pairing.
        const PIN16_AUTHED = 1 << 6;
        /// The LE link is encrypted.
        const LE_ENCRYPTED = 1 << 7;
        /// The LE link has been authenticated.
        const LE_AUTHENTICATED = 1 << 8;
        /// LE bonding keys are stored.
        const LE_LINK_KEY_KNOWN = 1 << 9;
        /// The stored LE keys came from MITM protected pairing.
        const LE_LINK_KEY_AUTHED = 1 << 10;
    }
}

bitflags! {
    /// Which LE bonding keys a record currently holds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LeKeyMask: u8 {
        /// Peer encryption key (LTK).
        const PENC = 1 << 0;
        /// Peer identity key (IRK).
        const PID = 1 << 1;
        /// Peer signing key (CSRK).
        const PCSRK = 1 << 2;
        /// Local encryption key.
        const LENC = 1 << 3;
        /// Local identity key.
        const LID = 1 << 4;
        /// Local signing key.
        const LCSRK = 1 << 5;
    }
}

/// Security machine state of a record while an operation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SecurityState {
    #[default]
    Idle,
    Authenticating,
    Encrypting,
    GettingName,
    Authorizing,
    SwitchingRole,
    Disconnecting,
    DelayForEncryption,
    DisconnectingBle,
    DisconnectingBoth,
}

impl SecurityState {
    /// Returns true if no security operation is in flight.
    pub fn is_idle(self) -> bool {
        matches!(self, SecurityState::Idle)
    }
}

/// Whether a pairing relationship with a peer is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BondType {
    #[default]
    Unknown,
    NotBonded,
    Bonded,
}

/// What is known about the peer's Secure Simple Pairing support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SspMode {
    #[default]
    Unknown,
    Known,
    Supported,
}

/// Peer LE encryption key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct PeerEncKey {
    pub ltk: Octet16,
    pub rand: [u8; 8],
    pub ediv: u16,
    pub sec_level: u8,
    pub key_size: u8,
}

/// Peer LE identity key and the identity address it vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct PeerIdKey {
    pub irk: Octet16,
    #[zeroize(skip)]
    pub identity_addr: BdAddr,
    #[zeroize(skip)]
    pub identity_addr_type: AddrType,
}

/// Peer LE signing key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct PeerSigningKey {
    pub csrk: Octet16,
    pub counter: u32,
    pub sec_level: u8,
}

/// Local LE encryption key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct LocalEncKey {
    pub ltk: Octet16,
    pub div: u16,
    pub key_size: u8,
    pub sec_level: u8,
}

/// Local LE signing key, regenerated from its diversifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct LocalSigningKey {
    pub counter: u32,
    pub div: u16,
    pub sec_level: u8,
}

/// All LE bonding key material for one peer. Sub-keys are always present
/// and zeroed when absent; [`LeKeys::key_mask`] says which ones are real.
#[derive(Debug, Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct LeKeys {
    #[zeroize(skip)]
    pub key_mask: LeKeyMask,
    pub penc: PeerEncKey,
    pub pcsrk: PeerSigningKey,
    pub lenc: LocalEncKey,
    pub lcsrk: LocalSigningKey,
    pub pid: PeerIdKey,
}

impl LeKeys {
    /// Zeroes all key material and clears the key mask.
    pub fn wipe(&mut self) {
        self.zeroize();
        *self = Self::default();
    }
}

/// LE side of a device record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeRecord {
    /// Address type the peer last appeared under.
    pub addr_type: AddrType,
    /// LE alias for the peer, when its identity was learned from an RPA.
    pub pseudo_addr: BdAddr,
    /// Stored LE bonding keys.
    pub keys: LeKeys,
}

/// One entry in the security database, describing everything known about
/// a single physical peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceRecord {
    /// Identity address, the stable key for the record.
    pub bd_addr: BdAddr,
    pub dev_class: DeviceClass,
    pub name: RemoteName,
    pub sec_flags: SecurityFlags,
    pub sec_state: SecurityState,
    pub bond_type: BondType,
    pub link_key: LinkKey,
    pub link_key_type: LinkKeyType,
    pub pin_code_length: u8,
    /// Negotiated encryption key size, zero when unknown.
    pub enc_key_size: u8,
    pub new_encryption_key_is_p256: bool,
    pub remote_io_caps: IoCapability,
    pub ssp_mode: SspMode,
    pub hci_handle: ConnHandle,
    pub ble_hci_handle: ConnHandle,
    pub device_type: DeviceType,
    pub conn_params: ConnParams,
    pub suggested_tx_octets: u16,
    /// Remote feature page restored from persistent config, if any.
    pub features: Option<RemoteFeatures>,
    pub remote_supports_role_switch: bool,
    pub remote_features_received: bool,
    pub ble: LeRecord,
    /// Allocation/touch counter value, the recency signal for eviction.
    pub timestamp: u32,
}

impl DeviceRecord {
    /// Returns true if a link key is stored on either transport.
    pub fn is_paired(&self) -> bool {
        self.sec_flags
            .intersects(SecurityFlags::LINK_KEY_KNOWN | SecurityFlags::LE_LINK_KEY_KNOWN)
    }

    /// Returns true if the record holds a local LE long term key.
    pub fn has_le_ltk(&self) -> bool {
        self.ble.keys.key_mask.contains(LeKeyMask::LENC)
    }

    /// Zeroes the link key and all LE key material, clearing the
    /// key-known flags with it.
    pub fn wipe_secrets(&mut self) {
        self.link_key.zeroize();
        self.ble.keys.wipe();
        self.sec_flags.remove(
            SecurityFlags::LINK_KEY_KNOWN
                | SecurityFlags::LINK_KEY_AUTHED
                | SecurityFlags::PIN16_AUTHED
                | SecurityFlags::LE_LINK_KEY_KNOWN
                | SecurityFlags::LE_LINK_KEY_AUTHED,
        );
    }

    /// Zeroes stored LE keys only, leaving any BR/EDR link key in place.
    pub fn clear_le_keys(&mut self) {
        self.ble.keys.wipe();
        self.sec_flags
            .remove(SecurityFlags::LE_LINK_KEY_KNOWN | SecurityFlags::LE_LINK_KEY_AUTHED);
    }
}
