//! # spalink-mqtt
//!
//! Bus gateway: one long-lived broker connection that publishes telemetry
//! snapshots and surfaces inbound control messages as a command channel.

pub mod gateway;

pub use gateway::{BusConfig, BusError, BusGateway};
