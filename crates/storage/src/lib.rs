#![forbid(unsafe_code)]

pub mod aof;
mod db;
mod entry;

pub use aof::{AppendLog, LogOp, LogRecord, replay};
pub use db::{Db, DbConfig};
pub use entry::{Entry, Value, ValueType, is_expired_at};
