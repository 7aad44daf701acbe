//! BLE transport for ANCS, backed by btleplug
//!
//! Scans for a phone exposing the ANCS service, connects, subscribes to the
//! Notification Source and Data Source characteristics and forwards their
//! notifications to the engine as [`TransportEvent`]s.

use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{ControlPoint, TransportError, TransportEvent};

/// ANCS Service UUID
pub const ANCS_SERVICE_UUID: Uuid = Uuid::from_u128(0x7905f431_b5ce_4e99_a40f_4b1e122d00d0);

// Characteristic UUIDs
pub const NOTIFICATION_SOURCE_UUID: Uuid = Uuid::from_u128(0x9fbf120d_6301_42d9_8c58_25e699a21dbd);
pub const CONTROL_POINT_UUID: Uuid = Uuid::from_u128(0x69d1d8f3_45e1_49a8_9821_9bbdfdaad9d9);
pub const DATA_SOURCE_UUID: Uuid = Uuid::from_u128(0x22eac6e9_24d6_4bb5_be44_b36ace7c7bfb);

/// A phone found while scanning
#[derive(Debug, Clone)]
pub struct AncsDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, TransportError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(TransportError::NoAdapter)
}

/// Scan for devices advertising the ANCS service
pub async fn scan(adapter: &Adapter, duration: Duration) -> Result<Vec<(Peripheral, AncsDevice)>, TransportError> {
    info!("scanning for devices advertising ANCS ({}s)", duration.as_secs());

    adapter
        .start_scan(ScanFilter { services: vec![ANCS_SERVICE_UUID] })
        .await?;
    tokio::time::sleep(duration).await;

    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            // Some backends ignore the scan filter
            if !props.services.contains(&ANCS_SERVICE_UUID) {
                continue;
            }
            // iPhones often advertise random names
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let address = peripheral.address().to_string();
            info!(%name, %address, "found");
            devices.push((peripheral, AncsDevice { name, address, rssi: props.rssi }));
        }
    }

    adapter.stop_scan().await?;
    Ok(devices)
}

/// Find the device with `address`, or the first one advertising ANCS.
///
/// A known address is looked up among every peripheral the adapter saw,
/// since a bonded phone does not always advertise the service.
pub async fn find_device(
    adapter: &Adapter,
    address: Option<&str>,
    duration: Duration,
) -> Result<Peripheral, TransportError> {
    let Some(address) = address else {
        let mut devices = scan(adapter, duration).await?;
        if devices.is_empty() {
            warn!("no devices advertising ANCS, make sure the phone is nearby and unlocked");
            return Err(TransportError::NoDevice);
        }
        let (peripheral, device) = devices.remove(0);
        info!(name = %device.name, address = %device.address, rssi = ?device.rssi, "choosing");
        return Ok(peripheral);
    };

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(duration).await;

    let peripherals = adapter.peripherals().await?;
    adapter.stop_scan().await?;

    peripherals
        .into_iter()
        .find(|p| p.address().to_string().eq_ignore_ascii_case(address))
        .ok_or(TransportError::NoDevice)
}

fn find_characteristic(
    characteristics: &std::collections::BTreeSet<Characteristic>,
    uuid: Uuid,
    name: &'static str,
) -> Result<Characteristic, TransportError> {
    characteristics
        .iter()
        .find(|c| c.uuid == uuid)
        .cloned()
        .ok_or(TransportError::MissingCharacteristic(name))
}

/// A connected, subscribed ANCS session
pub struct AncsConnection {
    peripheral: Peripheral,
    notification_source: Characteristic,
    control_point: Characteristic,
    data_source: Characteristic,
    forwarder: JoinHandle<()>,
}

impl AncsConnection {
    /// Connect, discover the ANCS characteristics and subscribe to both
    /// notify streams.
    ///
    /// `tx` receives [`TransportEvent::Connected`] followed by every
    /// Notification Source and Data Source value, until [`Self::disconnect`].
    pub async fn connect(peripheral: Peripheral, tx: mpsc::Sender<TransportEvent>) -> Result<Self, TransportError> {
        info!(address = %peripheral.address(), "connecting");
        peripheral.connect().await?;
        if !peripheral.is_connected().await? {
            return Err(TransportError::NotConnected);
        }
        info!("connected");

        peripheral.discover_services().await?;
        if !peripheral.services().iter().any(|s| s.uuid == ANCS_SERVICE_UUID) {
            warn!("ANCS service not present, pairing/bonding may be required");
        }

        let characteristics = peripheral.characteristics();
        let notification_source = find_characteristic(&characteristics, NOTIFICATION_SOURCE_UUID, "notification source")?;
        let control_point = find_characteristic(&characteristics, CONTROL_POINT_UUID, "control point")?;
        let data_source = find_characteristic(&characteristics, DATA_SOURCE_UUID, "data source")?;

        // iOS replays every existing notification as soon as the Notification
        // Source subscription lands, and btleplug only delivers values to
        // streams that already exist. The stream must be open first.
        let notifications = peripheral
            .notifications()
            .await?
            .map(|notification| (notification.uuid, notification.value));
        let forwarder = spawn_forwarder(notifications, tx);

        let subscribed = async {
            peripheral.subscribe(&notification_source).await?;
            peripheral.subscribe(&data_source).await
        };
        if let Err(e) = subscribed.await {
            forwarder.abort();
            return Err(e.into());
        }
        info!("subscribed to notification and data sources");

        Ok(Self {
            peripheral,
            notification_source,
            control_point,
            data_source,
            forwarder,
        })
    }

    pub fn address(&self) -> String {
        self.peripheral.address().to_string()
    }

    /// Control Point writer handed to the engine
    pub fn control_point(&self) -> BleControlPoint {
        BleControlPoint {
            peripheral: self.peripheral.clone(),
            characteristic: self.control_point.clone(),
        }
    }

    /// Send [`TransportEvent::Disconnected`] when the adapter reports this
    /// peripheral gone. The task finishes after sending it.
    pub async fn watch_disconnect(
        &self,
        adapter: &Adapter,
        tx: mpsc::Sender<TransportEvent>,
    ) -> Result<JoinHandle<()>, TransportError> {
        let mut events = adapter.events().await?;
        let id = self.peripheral.id();

        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(gone) = event {
                    if gone == id {
                        info!("peripheral disconnected");
                        let _ = tx.send(TransportEvent::Disconnected).await;
                        break;
                    }
                }
            }
        }))
    }

    /// Stop forwarding, unsubscribe and disconnect
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.forwarder.abort();
        if self.peripheral.is_connected().await? {
            if let Err(e) = self.peripheral.unsubscribe(&self.notification_source).await {
                debug!("unsubscribe notification source: {e}");
            }
            if let Err(e) = self.peripheral.unsubscribe(&self.data_source).await {
                debug!("unsubscribe data source: {e}");
            }
            self.peripheral.disconnect().await?;
        }
        info!("disconnected");
        Ok(())
    }
}

/// Queue [`TransportEvent::Connected`], then forward Notification Source and
/// Data Source values in arrival order until the stream ends or the receiver
/// goes away.
fn spawn_forwarder<S>(mut notifications: S, tx: mpsc::Sender<TransportEvent>) -> JoinHandle<()>
where
    S: Stream<Item = (Uuid, Vec<u8>)> + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        if tx.send(TransportEvent::Connected).await.is_err() {
            return;
        }

        while let Some((uuid, value)) = notifications.next().await {
            let event = if uuid == NOTIFICATION_SOURCE_UUID {
                TransportEvent::NotificationSource(value)
            } else if uuid == DATA_SOURCE_UUID {
                TransportEvent::DataSource(value)
            } else {
                debug!(%uuid, "ignoring notification");
                continue;
            };

            if tx.send(event).await.is_err() {
                break;
            }
        }
        debug!("notification stream ended");
    })
}

/// Writes commands to the ANCS Control Point with response
pub struct BleControlPoint {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

impl ControlPoint for BleControlPoint {
    async fn write(&self, data: Vec<u8>) -> Result<(), TransportError> {
        self.peripheral
            .write(&self.characteristic, &data, WriteType::WithResponse)
            .await?;
        Ok(())
    }
}
