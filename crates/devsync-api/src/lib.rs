// devsync-api: Async HTTP+JSON client for polled smart-home devices

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{
    CredentialPlacement, DEFAULT_CREDENTIAL_HEADER, DeviceClient, WriteMethod, hashed_pin,
};
pub use error::Error;
pub use models::{DeviceState, RestExceptionResponse};
pub use transport::{TlsMode, TransportConfig};
