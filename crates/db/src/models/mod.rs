//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts

pub mod content;
pub mod job_record;
pub mod ledger;
pub mod lock;
pub mod run;
pub mod status;
pub mod topic;
