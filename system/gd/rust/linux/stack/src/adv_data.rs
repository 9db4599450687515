//! Advertising data fields of a multi-advertising instance.

use bitflags::bitflags;
use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::multi_adv::AdvertiserId;
use crate::uuid::{CanonicalUuid, Uuid, LEN_UUID_128};

// Buffer limits for client supplied data.
pub const MAX_SIZE_MANUFACTURER_DATA: usize = 32;
pub const MAX_SIZE_PROPRIETARY_ELEMENT: usize = 32;
pub const MAX_SIZE_SERVICE_DATA: usize = 32;

// Service UUID list capacities.
pub const MAX_16BIT_SERVICES: usize = 16;
pub const MAX_32BIT_SERVICES: usize = 4;
pub const MAX_128BIT_SERVICES: usize = 1;

// Discoverable mode bits of the flags field.
pub const ADV_FLAGS_LIMITED: u8 = 0x01;
pub const ADV_FLAGS_GENERAL: u8 = 0x02;

// Advertising data type of a proprietary service data element.
pub const AD_TYPE_SERVICE_DATA: u8 = 0x16;

bitflags! {
    /// AD fields included in an instance's advertisement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct AdMask: u32 {
        const DEV_NAME = 0x0000_0001;
        const FLAGS = 0x0000_0002;
        const MANU = 0x0000_0004;
        const TX_PWR = 0x0000_0008;
        const INT_RANGE = 0x0000_0020;
        const SERVICE = 0x0000_0040;
        const APPEARANCE = 0x0000_0800;
        const SERVICE_32 = 0x0000_4000;
        const PROPRIETARY = 0x0001_0000;
        const SERVICE_128 = 0x0002_0000;
    }
}

/// A list of service UUIDs of one width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceList<T> {
    pub uuids: Vec<T>,
    /// Whether the list is the complete set of services of this width.
    pub list_cmpl: bool,
}

impl<T> Default for ServiceList<T> {
    fn default() -> Self {
        ServiceList { uuids: Vec::new(), list_cmpl: false }
    }
}

impl<T> ServiceList<T> {
    fn with_first(uuid: T, complete: bool) -> Self {
        ServiceList { uuids: vec![uuid], list_cmpl: complete }
    }

    fn push(&mut self, uuid: T, max: usize, complete: bool) -> bool {
        if self.uuids.len() >= max {
            return false;
        }
        self.uuids.push(uuid);
        self.list_cmpl = complete;
        true
    }
}

/// A raw typed element carried in the proprietary field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProprietaryElem {
    pub adv_type: u8,
    pub val: Vec<u8>,
}

/// One AD field and its value. Each variant maps to exactly one `AdMask` bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdField {
    DeviceName,
    Flags(u8),
    /// Lower layers fill in the actual level when this is 0.
    TxPower(i8),
    IntRange { low: u16, hi: u16 },
    Appearance(u16),
    Manufacturer(Vec<u8>),
    Proprietary(Vec<ProprietaryElem>),
    Services16(ServiceList<u16>),
    Services32(ServiceList<u32>),
    Services128(ServiceList<Uuid>),
}

impl AdField {
    pub fn mask_bit(&self) -> AdMask {
        match self {
            AdField::DeviceName => AdMask::DEV_NAME,
            AdField::Flags(_) => AdMask::FLAGS,
            AdField::TxPower(_) => AdMask::TX_PWR,
            AdField::IntRange { .. } => AdMask::INT_RANGE,
            AdField::Appearance(_) => AdMask::APPEARANCE,
            AdField::Manufacturer(_) => AdMask::MANU,
            AdField::Proprietary(_) => AdMask::PROPRIETARY,
            AdField::Services16(_) => AdMask::SERVICE,
            AdField::Services32(_) => AdMask::SERVICE_32,
            AdField::Services128(_) => AdMask::SERVICE_128,
        }
    }
}

/// The AD fields of one instance, keyed by mask bit. A bit is in `mask()`
/// exactly when its field is stored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdvData {
    fields: BTreeMap<AdMask, AdField>,
}

impl AdvData {
    pub fn new() -> Self {
        AdvData::default()
    }

    pub fn mask(&self) -> AdMask {
        self.fields.keys().fold(AdMask::empty(), |mask, bit| mask | *bit)
    }

    /// Stores `field`, returning the field it replaced.
    pub fn insert(&mut self, field: AdField) -> Option<AdField> {
        self.fields.insert(field.mask_bit(), field)
    }

    pub fn get(&self, bit: AdMask) -> Option<&AdField> {
        self.fields.get(&bit)
    }

    pub fn remove(&mut self, bit: AdMask) -> Option<AdField> {
        self.fields.remove(&bit)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn flags(&self) -> Option<u8> {
        match self.get(AdMask::FLAGS) {
            Some(AdField::Flags(flag)) => Some(*flag),
            _ => None,
        }
    }

    pub fn tx_power(&self) -> Option<i8> {
        match self.get(AdMask::TX_PWR) {
            Some(AdField::TxPower(tx_power)) => Some(*tx_power),
            _ => None,
        }
    }

    pub fn int_range(&self) -> Option<(u16, u16)> {
        match self.get(AdMask::INT_RANGE) {
            Some(AdField::IntRange { low, hi }) => Some((*low, *hi)),
            _ => None,
        }
    }

    pub fn appearance(&self) -> Option<u16> {
        match self.get(AdMask::APPEARANCE) {
            Some(AdField::Appearance(appearance)) => Some(*appearance),
            _ => None,
        }
    }

    pub fn manufacturer_data(&self) -> Option<&[u8]> {
        match self.get(AdMask::MANU) {
            Some(AdField::Manufacturer(data)) => Some(data),
            _ => None,
        }
    }

    pub fn proprietary(&self) -> Option<&[ProprietaryElem]> {
        match self.get(AdMask::PROPRIETARY) {
            Some(AdField::Proprietary(elems)) => Some(elems),
            _ => None,
        }
    }

    pub fn services_16(&self) -> Option<&ServiceList<u16>> {
        match self.get(AdMask::SERVICE) {
            Some(AdField::Services16(list)) => Some(list),
            _ => None,
        }
    }

    pub fn services_32(&self) -> Option<&ServiceList<u32>> {
        match self.get(AdMask::SERVICE_32) {
            Some(AdField::Services32(list)) => Some(list),
            _ => None,
        }
    }

    pub fn services_128(&self) -> Option<&ServiceList<Uuid>> {
        match self.get(AdMask::SERVICE_128) {
            Some(AdField::Services128(list)) => Some(list),
            _ => None,
        }
    }

    /// Appends `uuid` to the service list of its width. 16 and 32-bit lists
    /// are marked incomplete, the single 128-bit slot is marked complete.
    ///
    /// Returns false when the list for that width is already full.
    pub fn add_service_uuid(&mut self, uuid: CanonicalUuid) -> bool {
        // Every list holds at least one entry, so a missing list takes the
        // UUID as its first.
        match uuid {
            CanonicalUuid::Uuid16(value) => match self.fields.get_mut(&AdMask::SERVICE) {
                Some(AdField::Services16(list)) => list.push(value, MAX_16BIT_SERVICES, false),
                _ => {
                    self.insert(AdField::Services16(ServiceList::with_first(value, false)));
                    true
                }
            },
            CanonicalUuid::Uuid32(value) => match self.fields.get_mut(&AdMask::SERVICE_32) {
                Some(AdField::Services32(list)) => list.push(value, MAX_32BIT_SERVICES, false),
                _ => {
                    self.insert(AdField::Services32(ServiceList::with_first(value, false)));
                    true
                }
            },
            CanonicalUuid::Uuid128(value) => match self.fields.get_mut(&AdMask::SERVICE_128) {
                Some(AdField::Services128(list)) => list.push(value, MAX_128BIT_SERVICES, true),
                _ => {
                    self.insert(AdField::Services128(ServiceList::with_first(value, true)));
                    true
                }
            },
        }
    }
}

/// Advertising payload as supplied by a client.
#[derive(Debug, Default, Clone)]
pub struct AdvertiseData {
    /// Whether this is scan response data rather than advertising data.
    pub set_scan_rsp: bool,
    pub include_name: bool,
    pub include_txpower: bool,
    /// Advertising interval bounds, in 0.625 ms units.
    pub min_interval: i32,
    pub max_interval: i32,
    pub appearance: i32,
    pub manufacturer_data: Vec<u8>,
    pub service_data: Vec<u8>,
    /// Concatenated 128-bit service UUIDs. Each 16-byte block is in `Uuid`
    /// byte order, most significant byte first as in the string form, so
    /// 0000180f-0000-1000-8000-00805f9b34fb starts with `00 00 18 0f`. Blocks
    /// in little-endian HAL layout are not recognized as 16 or 32-bit.
    pub service_uuid: Vec<u8>,
}

/// `AdvertiseData` bound to an advertiser, with its variable length buffers
/// cut down to their maximum sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvDataPackage {
    advertiser_id: AdvertiserId,
    set_scan_rsp: bool,
    include_name: bool,
    include_txpower: bool,
    min_interval: i32,
    max_interval: i32,
    appearance: i32,
    manufacturer_data: Vec<u8>,
    service_data: Vec<u8>,
    service_uuid: Vec<u8>,
}

fn capped(data: &[u8], max: usize) -> Vec<u8> {
    data[..data.len().min(max)].to_vec()
}

impl AdvDataPackage {
    /// Packages `data` for `advertiser_id`. Bytes past a buffer's maximum are
    /// dropped.
    pub fn package(advertiser_id: AdvertiserId, data: &AdvertiseData) -> Self {
        AdvDataPackage {
            advertiser_id,
            set_scan_rsp: data.set_scan_rsp,
            include_name: data.include_name,
            include_txpower: data.include_txpower,
            min_interval: data.min_interval,
            max_interval: data.max_interval,
            appearance: data.appearance,
            manufacturer_data: capped(&data.manufacturer_data, MAX_SIZE_MANUFACTURER_DATA),
            service_data: capped(&data.service_data, MAX_SIZE_PROPRIETARY_ELEMENT),
            service_uuid: capped(&data.service_uuid, MAX_SIZE_SERVICE_DATA),
        }
    }

    pub fn advertiser_id(&self) -> AdvertiserId {
        self.advertiser_id
    }

    pub fn set_scan_rsp(&self) -> bool {
        self.set_scan_rsp
    }

    pub fn include_name(&self) -> bool {
        self.include_name
    }

    pub fn include_txpower(&self) -> bool {
        self.include_txpower
    }

    pub fn min_interval(&self) -> i32 {
        self.min_interval
    }

    pub fn max_interval(&self) -> i32 {
        self.max_interval
    }

    pub fn appearance(&self) -> i32 {
        self.appearance
    }

    pub fn manufacturer_data(&self) -> &[u8] {
        &self.manufacturer_data
    }

    pub fn service_data(&self) -> &[u8] {
        &self.service_data
    }

    pub fn service_uuid(&self) -> &[u8] {
        &self.service_uuid
    }

    /// The service UUID buffer read as whole 128-bit UUIDs. A trailing partial
    /// UUID is ignored.
    pub fn service_uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.service_uuid
            .chunks_exact(LEN_UUID_128)
            .filter_map(|chunk| <[u8; LEN_UUID_128]>::try_from(chunk).ok())
            .map(Uuid::from)
    }
}
