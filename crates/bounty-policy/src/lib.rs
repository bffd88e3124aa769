//! Bountyboard Policy: access control and pre-flight checks
//!
//! ```text
//! form        → validation  → Verdict (ALLOW / BLOCK)
//! chain facts → eligibility → Result<(), BountyError>
//! view state  → access      → bool
//! ```
//!
//! Nothing in this crate performs I/O; callers gather the facts.

pub mod access;
pub mod eligibility;
pub mod validation;
pub mod verdict;

pub use access::{can_view_submission_details, is_bounty_creator};
pub use eligibility::{
    check_cancel, check_contract_deployed, check_submit_eligibility, require_connected, SubmitFacts,
};
pub use validation::{check_balance, parse_deadline, validate_bounty_form, validate_submission_form};
pub use verdict::{Verdict, Violation};
