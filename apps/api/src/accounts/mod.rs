// Per-user collaborators the interview engine and handlers consume:
// resume snapshots, subscription entitlements, and request rate limits.

pub mod entitlement;
pub mod rate_limit;
pub mod resumes;
