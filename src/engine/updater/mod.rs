//! Self-Update System
//!
//! Check a manifest endpoint, download the offered artifact, swap it in.
//!
//! Components:
//! - `state` - Update session state machine
//! - `agent` - Check / download / apply orchestration
//! - `apply` - Replacement of the installed artifact
//! - `manifest` - Manifest parsing
//! - `transport` - HTTP capability and its reqwest implementation
//! - `layout` - Install paths and updatability
//! - `version` - Version comparison policy
//! - `notify` - Log file and completion callbacks
//! - `error` - Error taxonomy

pub mod agent;
pub mod apply;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod notify;
pub mod state;
pub mod transport;
pub mod version;

pub use agent::{CheckOutcome, Updater};
pub use apply::{ApplyEngine, ApplyReport, ApplyStrategy, RemovalOutcome};
pub use error::{ErrorKind, UpdateError};
pub use layout::InstallLayout;
pub use manifest::RemoteManifest;
pub use notify::{Completion, NotificationSink, Operation, UpdateLog};
pub use state::{Phase, UpdateSession};
pub use transport::{BodyFormat, Payload, ReqwestTransport, RequestOptions, Transport, TransportError};
pub use version::VersionPolicy;
