use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use emberkv_common::{ConnectionError, INITIAL_BUFFER_CAPACITY, ProtocolError};
use emberkv_protocol::{Frame, decode_command};

/// Wrapper sobre TcpStream com buffer para leitura de comandos e escrita de frames RESP.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Lê um comando completo (vetor de argumentos). Retorna None no EOF.
    ///
    /// EOF no meio de um frame vira `ConnectionReset`; frame malformado vira
    /// `ConnectionError::Protocol`. Em ambos os casos a conexão deve ser fechada.
    pub async fn read_command(&mut self) -> Result<Option<Vec<Bytes>>, ConnectionError> {
        loop {
            if let Some(args) = self.parse_command()? {
                return Ok(Some(args));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    /// Escreve um frame no stream.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn parse_command(&mut self) -> Result<Option<Vec<Bytes>>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match decode_command(&mut cursor) {
            Ok(args) => {
                let len = cursor.position() as usize;
                self.buffer.advance(len);
                Ok(Some(args))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
