use bytes::{BufMut, Bytes, BytesMut};
use emberkv_common::ProtocolError;
use std::io::Cursor;

use crate::codec::{get_decimal, get_line, get_u8, read_bulk_payload};

/// Representação de um frame RESP2.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Faz o parse de um frame completo (qualquer tipo) a partir do cursor.
    /// Retorna `Err(Incomplete)` se o buffer ainda não contém o frame inteiro.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        match get_u8(src)? {
            b'+' => {
                let line = get_line(src)?;
                let s = String::from_utf8(line.to_vec())
                    .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
                Ok(Frame::Simple(s))
            }
            b'-' => {
                let line = get_line(src)?;
                let s = String::from_utf8(line.to_vec())
                    .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
                Ok(Frame::Error(s))
            }
            b':' => {
                let n = get_decimal(src)?;
                Ok(Frame::Integer(n))
            }
            b'$' => {
                let len = get_decimal(src)?;
                match read_bulk_payload(src, len)? {
                    Some(data) => Ok(Frame::Bulk(data)),
                    None => Ok(Frame::Null),
                }
            }
            b'*' => {
                let count = get_decimal(src)?;
                if count == -1 {
                    return Ok(Frame::Null);
                }
                if count < 0 {
                    return Err(ProtocolError::InvalidArrayLength(count));
                }
                let count = count as usize;
                let mut frames = Vec::with_capacity(count.min(16));
                for _ in 0..count {
                    frames.push(Frame::parse(src)?);
                }
                Ok(Frame::Array(frames))
            }
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Encoda o frame no buffer de saída em formato RESP2.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(b'+');
                dst.put(s.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Error(s) => {
                dst.put_u8(b'-');
                dst.put(s.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Integer(n) => {
                dst.put_u8(b':');
                dst.put(n.to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put(data.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                dst.put(data.as_ref());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Null => {
                dst.put(&b"$-1\r\n"[..]);
            }
            Frame::Array(frames) => {
                dst.put_u8(b'*');
                dst.put(frames.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                for frame in frames {
                    frame.encode(dst);
                }
            }
        }
    }

    /// Helper: cria um Frame::Bulk a partir de &str.
    pub fn bulk(s: &str) -> Frame {
        Frame::Bulk(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Bulk de resposta: payload vazio vira `$-1`.
    ///
    /// O cliente não consegue distinguir string vazia de chave ausente.
    pub fn bulk_or_null(data: impl Into<Bytes>) -> Frame {
        let data = data.into();
        if data.is_empty() {
            Frame::Null
        } else {
            Frame::Bulk(data)
        }
    }

    /// Helper: cria um Array de Bulk strings a partir de &[&str].
    pub fn array_from_strs(strs: &[&str]) -> Frame {
        Frame::Array(strs.iter().map(|s| Frame::bulk(s)).collect())
    }
}
