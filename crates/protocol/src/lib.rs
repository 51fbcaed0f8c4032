#![forbid(unsafe_code)]

mod codec;
mod command;
mod frame;
mod parse;

pub use codec::{decode_bulk_string, decode_command};
pub use command::Command;
pub use frame::Frame;
pub use parse::Parse;
