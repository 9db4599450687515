//! UUID type and helpers to reduce a UUID to its shortest canonical form.

use lazy_static::lazy_static;
use std::fmt::{Display, Formatter};

pub const BASE_UUID: &str = "00000000-0000-1000-8000-00805F9B34FB";

/// Length in bytes of a 16-bit UUID.
pub const LEN_UUID_16: usize = 2;
/// Length in bytes of a 32-bit UUID.
pub const LEN_UUID_32: usize = 4;
/// Length in bytes of a full 128-bit UUID.
pub const LEN_UUID_128: usize = 16;

// Hyphen offsets in the 8-4-4-4-12 string form.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];
const UUID_STRING_LEN: usize = 36;

/// A 128-bit UUID stored in big-endian (string) order.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Uuid {
    pub uu: [u8; LEN_UUID_128],
}

impl From<[u8; LEN_UUID_128]> for Uuid {
    fn from(uu: [u8; LEN_UUID_128]) -> Self {
        Uuid { uu }
    }
}

impl Uuid {
    /// Parses the `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` form. Returns None for
    /// anything else, including the short 4 or 8 digit forms.
    pub fn from_string<S: Into<String>>(raw: S) -> Option<Uuid> {
        let raw: String = raw.into();
        if raw.len() != UUID_STRING_LEN || !raw.is_ascii() {
            return None;
        }

        let bytes = raw.as_bytes();
        if HYPHEN_POSITIONS.iter().any(|&pos| bytes[pos] != b'-') {
            return None;
        }

        let digits: String = raw.chars().filter(|c| *c != '-').collect();
        if digits.len() != LEN_UUID_128 * 2 {
            return None;
        }

        let mut uu = [0u8; LEN_UUID_128];
        for (i, byte) in uu.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
        }

        Some(Uuid { uu })
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for (i, byte) in self.uu.iter().enumerate() {
            if i == 4 || i == 6 || i == 8 || i == 10 {
                write!(f, "-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A UUID narrowed to the shortest width that still identifies it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanonicalUuid {
    Uuid16(u16),
    Uuid32(u32),
    Uuid128(Uuid),
}

impl CanonicalUuid {
    /// Width of the canonical form in bytes.
    pub fn width(&self) -> usize {
        match self {
            CanonicalUuid::Uuid16(_) => LEN_UUID_16,
            CanonicalUuid::Uuid32(_) => LEN_UUID_32,
            CanonicalUuid::Uuid128(_) => LEN_UUID_128,
        }
    }
}

lazy_static! {
    static ref BASE: Uuid = Uuid::from_string(BASE_UUID).unwrap();
}

pub struct UuidHelper {}

impl UuidHelper {
    /// Parses a UUID string, see `Uuid::from_string`.
    pub fn parse_string<S: Into<String>>(raw: S) -> Option<Uuid> {
        Uuid::from_string(raw)
    }

    /// Returns the shortest slice of `uu` that identifies it. UUIDs built on
    /// the Bluetooth base UUID shrink to 2 or 4 bytes, anything else stays at
    /// 16 bytes.
    pub fn get_shortest_slice(uu: &[u8; LEN_UUID_128]) -> &[u8] {
        if uu[LEN_UUID_32..] != BASE.uu[LEN_UUID_32..] {
            return &uu[..];
        }

        if uu[0] == 0 && uu[1] == 0 {
            &uu[LEN_UUID_16..LEN_UUID_32]
        } else {
            &uu[..LEN_UUID_32]
        }
    }

    /// Classifies `uuid` by its shortest width.
    pub fn canonicalize(uuid: &Uuid) -> CanonicalUuid {
        match *Self::get_shortest_slice(&uuid.uu) {
            [a, b] => CanonicalUuid::Uuid16(u16::from_be_bytes([a, b])),
            [a, b, c, d] => CanonicalUuid::Uuid32(u32::from_be_bytes([a, b, c, d])),
            _ => CanonicalUuid::Uuid128(*uuid),
        }
    }
}
