//! Voxa client library.
//!
//! Authenticated access to the Voxa recording backend: session token
//! lifecycle, JSON and multipart transports, and a single normalized
//! error shape for every failure.

pub mod client;
pub mod config;
pub mod error;
mod fs_util;
pub mod models;
pub mod request;
pub mod token_store;

pub use client::{SessionClient, SessionState};
pub use config::{ClientConfig, StorageBackend};
pub use error::{ApiError, ErrorKind, StorageError};
pub use models::{AuthResponse, ContentCategory, Recording, Role, UserProfile};
pub use request::{FilePart, MultipartBody, ProfileUpdate, RecordingUpload, RequestBody};
pub use token_store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
