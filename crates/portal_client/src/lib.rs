pub mod actions;
pub mod auth;
pub mod config;
pub mod controller;
pub mod credential;
pub mod descriptor;
pub mod error;
pub mod outcome;
pub mod resources;
pub mod session;
pub mod transport;
pub mod view;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

pub use actions::{ActionError, Decision};
pub use auth::AuthClient;
pub use config::{load_settings, ClientSettings};
pub use controller::DataFetchController;
pub use credential::{Credential, CredentialStore, MemoryCredentialStore};
pub use descriptor::{Method, RequestDescriptor, ResourceKey};
pub use error::ClientError;
pub use outcome::{AuthFailureReason, FetchOutcome, NetworkCause, ViewError};
pub use session::{Navigator, SessionCheck, SessionGate, SessionInvalidReason, TracingNavigator};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};
pub use view::{View, ViewState};
