//! ANCS Client
//!
//! Turns the two ANCS notify streams into notification summaries: every
//! `Added` event triggers a "get notification attributes" request on the
//! Control Point, and the answer arriving on the Data Source is matched back
//! to it by UID.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ancs_client::{ble, AncsConnection, DispatcherConfig, Engine, EngineOutput};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = ble::get_adapter().await?;
//!     let phone = ble::find_device(&adapter, None, std::time::Duration::from_secs(5)).await?;
//!
//!     let (event_tx, event_rx) = mpsc::channel(64);
//!     let (output_tx, mut output_rx) = mpsc::channel(64);
//!     let connection = AncsConnection::connect(phone, event_tx).await?;
//!
//!     let engine = Engine::new(DispatcherConfig::default(), Arc::new(connection.control_point()), output_tx);
//!     tokio::spawn(engine.run(event_rx));
//!
//!     while let Some(output) = output_rx.recv().await {
//!         if let EngineOutput::Summary(summary) = output {
//!             println!("{:?}", summary);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod ble;
mod dispatcher;
mod engine;
mod error;
mod pending;
mod transport;

pub use ble::{AncsConnection, AncsDevice, BleControlPoint};
pub use dispatcher::{Dispatcher, DispatcherConfig, EventOutcome, NotificationSummary, OutgoingRequest};
pub use engine::{Engine, EngineOutput};
pub use error::EngineError;
pub use pending::{PendingRequest, PendingRequestTable, RequestState};
pub use transport::{ControlPoint, TransportError, TransportEvent};

pub use ancs_proto::{Category, EventFlags, EventKind, NotificationEvent, ProtocolError};
