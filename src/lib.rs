pub mod app_config;
pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod debug;
pub mod error;
pub mod masked_email;
pub mod output;
pub mod protocol;
pub mod transport;

pub use client::{Client, ClientConfig, CredentialStore, Credentials};
pub use error::FastmailError;
pub use masked_email::{MaskedEmail, MaskedEmailState};
pub use transport::{ReqwestTransport, Transport};
