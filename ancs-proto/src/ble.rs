//! ANCS GATT Service Constants
//!
//! Apple publishes these UUIDs in the ANCS specification. The service is only
//! exposed to centrals that have bonded with the phone.

/// ANCS Service UUID
pub const SERVICE_UUID: &str = "7905f431-b5ce-4e99-a40f-4b1e122d00d0";

/// Notification Source Characteristic UUID (notify)
pub const NOTIFICATION_SOURCE_UUID: &str = "9fbf120d-6301-42d9-8c58-25e699a21dbd";

/// Control Point Characteristic UUID (write with response)
pub const CONTROL_POINT_UUID: &str = "69d1d8f3-45e1-49a8-9821-9bbdfdaad9d9";

/// Data Source Characteristic UUID (notify)
pub const DATA_SOURCE_UUID: &str = "22eac6e9-24d6-4bb5-be44-b36ace7c7bfb";

/// Control Point command ids
pub mod commands {
    /// Fetch attributes of a single notification, keyed by UID
    pub const GET_NOTIFICATION_ATTRIBUTES: u8 = 0x00;
}
