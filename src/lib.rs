//! Wizard API client — the client-side navigation state model.
//!
//! The server drives the wizard; this crate owns the client half: parsing
//! the flat step structure (`"step|substep"` identifiers) into a hierarchy,
//! tracking the current position, and reconciling it with the server
//! response after every navigation action. HTTP and page navigation are
//! injected seams (`WizardTransport`, `WizardNavigator`); everything else
//! is pure data transformation.

pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod state;
pub mod transport;

pub use config::{init_tracing, WizardConfig};
pub use controller::{WizardController, WizardNavigator};
pub use error::{
    FormatError, StructureInconsistency, TransportError, WizardError, WizardResult,
};
pub use state::{
    CurrentPosition, StepDescriptor, StepIdentifier, StepValue, StepValueMap, WizardPayload,
    WizardState, WizardStructure,
};
pub use transport::{FormPayload, HttpTransport, WizardTransport};

pub type Result<T> = std::result::Result<T, WizardError>;
