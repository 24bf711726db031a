pub mod audits;
pub mod catalog;
pub mod directory;
pub mod findings;
pub mod health;
pub mod reports;
