// ABOUTME: Library for linking a printer controller to a cloud account
// ABOUTME: Races automatic discovery against the operator, then falls back to a verification code

pub mod config;
pub mod console;
pub mod discovery;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod session;
pub mod verify;
pub mod waiter;

pub use config::{ConfigSnapshot, ConfigStore, FileConfigStore, LinkConfig};
pub use console::{Console, HiddenCursor, TerminalConsole};
pub use discovery::{DiscoveryHandle, DiscoveryListener, ServerDiscovery};
pub use error::{LinkError, Result, VerifyError};
pub use orchestrator::{CodeSource, LinkOptions, LinkOrchestrator, DISCOVERY_BUDGET};
pub use session::{DiscoveryState, LinkMode, LinkOutcome, LinkSession};
pub use verify::{HttpVerificationClient, VerificationClient};
pub use waiter::{CancellableWaiter, WaitOutcome};
