//! Domain entities and invariants for audit management.

#![forbid(unsafe_code)]

mod applicability;
mod audit;
mod finding;
mod process;
mod question;
mod referential;
mod response;
mod roles;

pub use applicability::{ApplicabilityFilter, FilterOutcome};
pub use audit::{Audit, AuditStatus};
pub use finding::{ActionStatus, FindingSeverity, FindingStatus};
pub use process::{Process, ProcessCandidates, ProcessToken, decode_stored_tokens, decode_tokens};
pub use question::{Criticality, Question, question_key};
pub use referential::Referential;
pub use response::ResponseValue;
pub use roles::{canonical_economic_role, role_is_generic, role_match_forms, roles_match};
