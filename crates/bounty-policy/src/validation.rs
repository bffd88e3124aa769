//! Form validation and the create-bounty balance check
//!
//! All checks here run before any upload or chain call.

use bounty_core::{
    format_units, parse_units, BountyError, BountyForm, Result, SubmissionForm, REWARD_DECIMALS,
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::verdict::{Verdict, Violation};

/// Validate a create-bounty form against the current time.
pub fn validate_bounty_form(form: &BountyForm, now: DateTime<Utc>) -> Verdict {
    let mut violations = Vec::new();

    if form.title.trim().is_empty() {
        violations.push(Violation::new("title_required", "Title is required").on_field("title"));
    }

    if form.description.trim().is_empty() {
        violations.push(
            Violation::new("description_required", "Description is required").on_field("description"),
        );
    }

    match parse_units(&form.reward, REWARD_DECIMALS) {
        Ok(units) if units > 0 => {}
        Ok(_) => violations.push(
            Violation::new("reward_positive", "Reward must be greater than 0").on_field("reward"),
        ),
        Err(_) => violations.push(
            Violation::new("reward_invalid", "Valid reward amount is required").on_field("reward"),
        ),
    }

    if form.deadline.trim().is_empty() {
        violations.push(Violation::new("deadline_required", "Deadline is required").on_field("deadline"));
    } else {
        match parse_deadline(&form.deadline) {
            Some(deadline) if deadline > now => {}
            Some(_) => violations.push(
                Violation::new("deadline_future", "Deadline must be in the future").on_field("deadline"),
            ),
            None => violations.push(
                Violation::new("deadline_invalid", "Deadline is not a valid date").on_field("deadline"),
            ),
        }
    }

    Verdict::from_violations("Invalid bounty form", violations)
}

pub fn validate_submission_form(form: &SubmissionForm) -> Verdict {
    let mut violations = Vec::new();

    if form.title.trim().is_empty() {
        violations.push(
            Violation::new("submission_title_required", "Submission title is required").on_field("title"),
        );
    }
    if form.description.trim().is_empty() {
        violations.push(
            Violation::new(
                "submission_description_required",
                "Submission description is required",
            )
            .on_field("description"),
        );
    }

    Verdict::from_violations("Invalid submission form", violations)
}

/// Accepts a calendar date (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_deadline(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Reject a create when the wallet cannot cover the reward.
pub fn check_balance(balance: u128, required: u128) -> Result<()> {
    if balance < required {
        return Err(BountyError::InsufficientBalance {
            required: format_units(required, REWARD_DECIMALS),
            available: format_units(balance, REWARD_DECIMALS),
        });
    }
    Ok(())
}
