//! Advertising payload and connection parameters.
//!
//! # Example
//!
//! ```
//! use gamepad_hid::AdvertisingPayload;
//!
//! let payload = AdvertisingPayload::gamepad().unwrap();
//! assert_eq!(&payload.as_bytes()[..3], &[0x02, 0x01, 0x06]);
//! ```

use crate::gatt::uuid;
use heapless::Vec;

/// Maximum legacy advertising payload length.
pub const MAX_ADV_LEN: usize = 31;

/// Advertising interval in milliseconds.
pub const ADVERTISING_INTERVAL_MS: u32 = 50;

/// GAP appearance value for a gamepad.
pub const APPEARANCE_GAMEPAD: u16 = 0x03C4;

/// AD structure types used by the gamepad.
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const COMPLETE_16BIT_SERVICE_UUIDS: u8 = 0x03;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const APPEARANCE: u8 = 0x19;
}

/// Flags AD values.
pub mod flags {
    pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
    pub const BR_EDR_NOT_SUPPORTED: u8 = 0x04;
}

/// Services listed in the advertisement.
pub const ADVERTISED_SERVICES: [u16; 2] = [uuid::HUMAN_INTERFACE_DEVICE, uuid::DEVICE_INFORMATION];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingError {
    /// The AD structures do not fit in [`MAX_ADV_LEN`] bytes.
    PayloadTooLarge,
}

/// Builder for a legacy advertising payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingPayload {
    data: Vec<u8, MAX_ADV_LEN>,
}

impl AdvertisingPayload {
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Flags, HID and Device Information service UUIDs, and the gamepad
    /// appearance.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in set; the `Result` mirrors the builder.
    pub fn gamepad() -> Result<Self, AdvertisingError> {
        Self::new()
            .flags(flags::LE_GENERAL_DISCOVERABLE | flags::BR_EDR_NOT_SUPPORTED)?
            .services_16(&ADVERTISED_SERVICES)?
            .appearance(APPEARANCE_GAMEPAD)
    }

    /// Append a Flags structure.
    pub fn flags(self, value: u8) -> Result<Self, AdvertisingError> {
        self.push(ad_type::FLAGS, &[value])
    }

    /// Append a complete list of 16-bit service UUIDs.
    pub fn services_16(mut self, uuids: &[u16]) -> Result<Self, AdvertisingError> {
        let len = 1 + uuids.len() * 2;
        if len > u8::MAX as usize || self.data.len() + 1 + len > MAX_ADV_LEN {
            return Err(AdvertisingError::PayloadTooLarge);
        }
        self.put(len as u8)?;
        self.put(ad_type::COMPLETE_16BIT_SERVICE_UUIDS)?;
        for uuid in uuids {
            self.extend(&uuid.to_le_bytes())?;
        }
        Ok(self)
    }

    /// Append the GAP appearance.
    pub fn appearance(self, value: u16) -> Result<Self, AdvertisingError> {
        self.push(ad_type::APPEARANCE, &value.to_le_bytes())
    }

    /// Append a complete local name.
    pub fn name(self, name: &str) -> Result<Self, AdvertisingError> {
        self.push(ad_type::COMPLETE_LOCAL_NAME, name.as_bytes())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn push(mut self, ad_type: u8, value: &[u8]) -> Result<Self, AdvertisingError> {
        if self.data.len() + 2 + value.len() > MAX_ADV_LEN {
            return Err(AdvertisingError::PayloadTooLarge);
        }
        self.put(1 + value.len() as u8)?;
        self.put(ad_type)?;
        self.extend(value)?;
        Ok(self)
    }

    fn put(&mut self, byte: u8) -> Result<(), AdvertisingError> {
        self.data
            .push(byte)
            .map_err(|_| AdvertisingError::PayloadTooLarge)
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), AdvertisingError> {
        self.data
            .extend_from_slice(bytes)
            .map_err(|_| AdvertisingError::PayloadTooLarge)
    }
}

/// Preferred peripheral connection parameters, in BLE units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionParams {
    /// Minimum connection interval (1.25 ms units).
    pub min_interval: u16,
    /// Maximum connection interval (1.25 ms units).
    pub max_interval: u16,
    pub slave_latency: u16,
    /// Supervision timeout (10 ms units).
    pub supervision_timeout: u16,
}

/// Smallest connection interval the controller accepts (7.5 ms).
pub const MIN_CONN_INTERVAL_UNITS: u16 = 6;

impl ConnectionParams {
    /// 25 ms minimum interval, twice that maximum, no latency, 32 s timeout.
    #[must_use]
    pub const fn preferred() -> Self {
        let mut min_interval = ms_to_conn_interval_units(25);
        if min_interval < MIN_CONN_INTERVAL_UNITS {
            min_interval = MIN_CONN_INTERVAL_UNITS;
        }
        Self {
            min_interval,
            max_interval: min_interval * 2,
            slave_latency: 0,
            supervision_timeout: 3200,
        }
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::preferred()
    }
}

/// Milliseconds to connection interval units (1.25 ms).
#[must_use]
pub const fn ms_to_conn_interval_units(ms: u32) -> u16 {
    (ms * 1000 / 1250) as u16
}

/// Milliseconds to advertising interval units (0.625 ms).
#[must_use]
pub const fn ms_to_adv_interval_units(ms: u32) -> u32 {
    ms * 1000 / 625
}
