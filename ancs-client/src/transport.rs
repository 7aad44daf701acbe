//! Boundary between the engine and whatever carries the GATT traffic

use std::future::Future;

/// Something the transport observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// Raw Notification Source notification
    NotificationSource(Vec<u8>),
    /// Raw Data Source notification
    DataSource(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("no device advertising ANCS found")]
    NoDevice,
    #[error("{0} characteristic not found")]
    MissingCharacteristic(&'static str),
    #[error("not connected")]
    NotConnected,
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Acknowledged writes to the Control Point characteristic
pub trait ControlPoint: Send + Sync + 'static {
    fn write(&self, data: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;
}
