use bytes::Bytes;
use emberkv_common::CommandError;
use std::vec;

/// Cursor sobre o vetor de argumentos de um comando.
///
/// O primeiro argumento (nome do comando) é consumido em `new`; faltas ou
/// sobras de argumentos viram `CommandError::WrongArity` com esse nome.
pub struct Parse {
    name: String,
    parts: vec::IntoIter<Bytes>,
}

impl Parse {
    /// Cria um Parse a partir dos argumentos decodificados.
    pub fn new(args: Vec<Bytes>) -> Result<Parse, CommandError> {
        let mut parts = args.into_iter();
        let name = match parts.next() {
            Some(raw) => into_string(raw)?,
            None => return Err(CommandError::InvalidArgument("comando vazio".into())),
        };
        Ok(Parse { name, parts })
    }

    /// Nome do comando como enviado pelo cliente.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Retorna o próximo argumento como String UTF-8.
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        let raw = self.next()?;
        into_string(raw)
    }

    /// Retorna o próximo argumento como i64.
    pub fn next_int(&mut self) -> Result<i64, CommandError> {
        let s = self.next_string()?;
        s.parse::<i64>()
            .map_err(|_| CommandError::InvalidArgument(format!("'{s}' não é um inteiro")))
    }

    /// Verifica se todos os argumentos foram consumidos.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.has_remaining() {
            Err(CommandError::WrongArity(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Verifica se ainda há argumentos restantes.
    pub fn has_remaining(&self) -> bool {
        self.parts.len() > 0
    }

    fn next(&mut self) -> Result<Bytes, CommandError> {
        match self.parts.next() {
            Some(part) => Ok(part),
            None => Err(CommandError::WrongArity(self.name.clone())),
        }
    }
}

fn into_string(raw: Bytes) -> Result<String, CommandError> {
    String::from_utf8(raw.to_vec())
        .map_err(|_| CommandError::InvalidArgument("string UTF-8 inválida".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<Bytes> {
        strs.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
    }

    #[test]
    fn parse_extracts_strings() {
        let mut parse = Parse::new(args(&["SET", "key", "value"])).unwrap();
        assert_eq!(parse.name(), "SET");
        assert_eq!(parse.next_string().unwrap(), "key");
        assert_eq!(parse.next_string().unwrap(), "value");
        parse.finish().unwrap();
    }

    #[test]
    fn parse_extracts_negative_int() {
        let mut parse = Parse::new(args(&["LRANGE", "list", "-1"])).unwrap();
        parse.next_string().unwrap();
        assert_eq!(parse.next_int().unwrap(), -1);
    }

    #[test]
    fn parse_empty_fails() {
        assert!(matches!(
            Parse::new(Vec::new()),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parse_extra_args_fails_finish() {
        let parse = Parse::new(args(&["PING", "extra"])).unwrap();
        assert!(matches!(parse.finish(), Err(CommandError::WrongArity(name)) if name == "PING"));
    }

    #[test]
    fn parse_insufficient_args() {
        let mut parse = Parse::new(args(&["get"])).unwrap();
        assert!(matches!(
            parse.next_string(),
            Err(CommandError::WrongArity(name)) if name == "get"
        ));
    }

    #[test]
    fn parse_invalid_utf8() {
        let raw = vec![Bytes::from_static(b"GET"), Bytes::from_static(&[0xff, 0xfe])];
        let mut parse = Parse::new(raw).unwrap();
        assert!(matches!(
            parse.next_string(),
            Err(CommandError::InvalidArgument(_))
        ));
    }
}
