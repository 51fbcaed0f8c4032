use bytes::Bytes;
use emberkv_common::CommandError;

use crate::Parse;

/// Enum com todos os comandos suportados.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    Get(String),
    Set { key: String, value: String },
    Del(Vec<String>),
    Exists(Vec<String>),
    Type(String),
    LPush { key: String, value: String },
    LPop(String),
    LRange { key: String, start: i64, stop: i64 },
    Unknown(String),
}

impl Command {
    /// Faz o parse do vetor de argumentos em um Command.
    ///
    /// A aridade é validada aqui; o nome é comparado sem diferenciar caixa.
    pub fn from_args(args: Vec<Bytes>) -> Result<Command, CommandError> {
        let mut parse = Parse::new(args)?;
        let cmd_name = parse.name().to_uppercase();

        let cmd = match cmd_name.as_str() {
            "PING" => {
                parse.finish()?;
                Command::Ping
            }
            "GET" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::Get(key)
            }
            "SET" => {
                let key = parse.next_string()?;
                let value = parse.next_string()?;
                parse.finish()?;
                Command::Set { key, value }
            }
            "DEL" => Command::Del(parse_keys(&mut parse)?),
            "EXISTS" => Command::Exists(parse_keys(&mut parse)?),
            "TYPE" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::Type(key)
            }
            "LPUSH" => {
                let key = parse.next_string()?;
                let value = parse.next_string()?;
                parse.finish()?;
                Command::LPush { key, value }
            }
            "LPOP" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Command::LPop(key)
            }
            "LRANGE" => {
                let key = parse.next_string()?;
                let start = parse.next_int()?;
                let stop = parse.next_int()?;
                parse.finish()?;
                Command::LRange { key, start, stop }
            }
            _ => Command::Unknown(parse.name().to_string()),
        };

        Ok(cmd)
    }
}

/// Uma ou mais chaves (DEL, EXISTS).
fn parse_keys(parse: &mut Parse) -> Result<Vec<String>, CommandError> {
    if !parse.has_remaining() {
        return Err(CommandError::WrongArity(parse.name().to_string()));
    }
    let mut keys = Vec::new();
    while parse.has_remaining() {
        keys.push(parse.next_string()?);
    }
    Ok(keys)
}
