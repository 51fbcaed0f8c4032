/// Erros de parsing do protocolo RESP.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("byte de tipo inválido: {0:#x}")]
    InvalidFrameType(u8),
    #[error("inteiro inválido: {0}")]
    InvalidInteger(String),
    #[error("comprimento de bulk inválido: {0}")]
    InvalidBulkLength(i64),
    #[error("quantidade de elementos inválida: {0}")]
    InvalidArrayLength(i64),
    #[error("CRLF ausente após o payload do bulk")]
    MissingTerminator,
    #[error("frame excede tamanho máximo ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

/// Erros de armazenamento/engine de dados.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("operação contra chave com tipo errado")]
    WrongType,
}

/// Erros do log de persistência (AOF).
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O no AOF: {0}")]
    Io(#[from] std::io::Error),
    #[error("registro malformado: {0:?}")]
    MalformedRecord(String),
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("protocolo: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros de parsing/validação de comandos.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("número errado de argumentos para '{0}'")]
    WrongArity(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}

/// Erro top-level do EmberKV.
#[derive(Debug, thiserror::Error)]
pub enum EmberError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type alias.
pub type EmberResult<T> = Result<T, EmberError>;

// Conversão implícita de io::Error → EmberError (via ConnectionError)
impl From<std::io::Error> for EmberError {
    fn from(e: std::io::Error) -> Self {
        EmberError::Connection(ConnectionError::Io(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::Incomplete;
        assert_eq!(err.to_string(), "frame incompleto");
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::WrongType;
        assert_eq!(err.to_string(), "operação contra chave com tipo errado");
    }

    #[test]
    fn ember_error_from_protocol() {
        let err: EmberError = ProtocolError::MissingTerminator.into();
        assert!(matches!(
            err,
            EmberError::Protocol(ProtocolError::MissingTerminator)
        ));
    }

    #[test]
    fn ember_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken");
        let err: EmberError = io_err.into();
        assert!(matches!(
            err,
            EmberError::Connection(ConnectionError::Io(_))
        ));
    }

    #[test]
    fn connection_error_wraps_protocol() {
        let err: ConnectionError = ProtocolError::InvalidBulkLength(-2).into();
        assert_eq!(
            err.to_string(),
            "protocolo: comprimento de bulk inválido: -2"
        );
    }

    #[test]
    fn persistence_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PersistenceError = io_err.into();
        assert!(matches!(err, PersistenceError::Io(_)));
    }

    #[test]
    fn command_error_display() {
        let err = CommandError::WrongArity("GET".into());
        assert_eq!(err.to_string(), "número errado de argumentos para 'GET'");
    }
}
