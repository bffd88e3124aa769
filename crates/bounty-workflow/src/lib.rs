//! Bounty write workflows
//!
//! Creating and submitting share one shape: the document goes to the blob
//! store first, and only its content identifier goes on chain. Nothing is
//! written on chain until the upload succeeded, and nothing is declared done
//! until the receipt reports success.
//!
//! # Flow
//!
//! ```text
//! form → checks → upload → allowance → approve? → write → receipt → observer
//!          ↓         ↓                     ↓                 ↓
//!        Failed   Failed            NeedsAttention   Failed (reverted / ambiguous)
//! ```
//!
//! Each workflow owns a [`WorkflowHandle`]; a second run is refused while one
//! is in flight, and `reset` makes whatever is still running irrelevant.

mod context;
mod create;
mod settle;
mod state;
mod submit;

pub use context::WriteContext;
pub use create::CreateBountyWorkflow;
pub use settle::SettlementWorkflow;
pub use state::{Attempt, StepRecord, WorkflowHandle, WorkflowState, WriteOutcome};
pub use submit::SubmitWorkflow;
