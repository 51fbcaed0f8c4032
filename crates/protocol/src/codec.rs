//! Decodificação das requisições no formato RESP.
//!
//! Uma requisição é sempre `*N\r\n` seguido de exatamente N bulk strings.
//! As funções operam sobre um cursor em memória: quando o buffer ainda não
//! contém o frame inteiro, retornam `ProtocolError::Incomplete` e o chamador
//! deve ler mais bytes e tentar de novo a partir do início.

use bytes::{Buf, Bytes};
use emberkv_common::{MAX_FRAME_SIZE, MAX_LINE_LENGTH, ProtocolError};
use std::io::Cursor;

/// Lê um bulk string (`$<len>\r\n<payload>\r\n`).
///
/// `$-1` devolve payload vazio sem erro, espelhando o encoder, que usa o
/// null bulk para a string vazia.
pub fn decode_bulk_string(src: &mut Cursor<&[u8]>) -> Result<Bytes, ProtocolError> {
    decode_bulk(src, 0)
}

/// Bulk string de um frame que já consumiu `used` bytes.
fn decode_bulk(src: &mut Cursor<&[u8]>, used: usize) -> Result<Bytes, ProtocolError> {
    match get_u8(src)? {
        b'$' => {}
        byte => return Err(ProtocolError::InvalidFrameType(byte)),
    }
    let len = get_decimal(src)?;

    // Recusa antes de esperar pelo payload
    let total = used.saturating_add(usize::try_from(len).unwrap_or(0));
    if total > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(total));
    }
    Ok(read_bulk_payload(src, len)?.unwrap_or_default())
}

/// Lê um comando completo: header `*N` e N bulk strings.
///
/// Qualquer falha em um elemento aborta o comando inteiro. O frame inteiro,
/// somando todos os elementos, não passa de `MAX_FRAME_SIZE`.
pub fn decode_command(src: &mut Cursor<&[u8]>) -> Result<Vec<Bytes>, ProtocolError> {
    let start = src.position() as usize;
    match get_u8(src)? {
        b'*' => {}
        byte => return Err(ProtocolError::InvalidFrameType(byte)),
    }
    let count = get_decimal(src)?;
    if count < 0 {
        return Err(ProtocolError::InvalidArrayLength(count));
    }

    let count = count as usize;
    // Não confiar no header para pré-alocar
    let mut args = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let used = src.position() as usize - start;
        args.push(decode_bulk(src, used)?);
    }
    Ok(args)
}

/// Lê o payload de um bulk cujo header já foi consumido.
/// Retorna `None` para o null bulk (`-1`).
pub(crate) fn read_bulk_payload(
    src: &mut Cursor<&[u8]>,
    len: i64,
) -> Result<Option<Bytes>, ProtocolError> {
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(ProtocolError::InvalidBulkLength(len));
    }
    let len = len as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    if src.remaining() < len + 2 {
        return Err(ProtocolError::Incomplete);
    }

    let start = src.position() as usize;
    let buf: &[u8] = *src.get_ref();
    let raw = &buf[start..start + len + 2];
    if &raw[len..] != b"\r\n" {
        return Err(ProtocolError::MissingTerminator);
    }
    let data = Bytes::copy_from_slice(&raw[..len]);
    src.set_position((start + len + 2) as u64);
    Ok(Some(data))
}

pub(crate) fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, ProtocolError> {
    if !src.has_remaining() {
        return Err(ProtocolError::Incomplete);
    }
    Ok(src.get_u8())
}

/// Lê uma linha terminada em CRLF com no máximo `MAX_LINE_LENGTH` bytes.
pub(crate) fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();
    // Inclui o CRLF de uma linha com tamanho exatamente no limite
    let end = buf.len().min(start.saturating_add(MAX_LINE_LENGTH + 2));

    for i in start..end.saturating_sub(1) {
        if buf[i] == b'\r' && buf[i + 1] == b'\n' {
            src.set_position((i + 2) as u64);
            return Ok(&buf[start..i]);
        }
    }

    let pending = buf.len().saturating_sub(start);
    if pending > MAX_LINE_LENGTH + 1 {
        return Err(ProtocolError::FrameTooLarge(pending));
    }
    Err(ProtocolError::Incomplete)
}

pub(crate) fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, ProtocolError> {
    let line = get_line(src)?;
    let s = std::str::from_utf8(line).map_err(|e| ProtocolError::InvalidInteger(e.to_string()))?;
    s.parse::<i64>()
        .map_err(|_| ProtocolError::InvalidInteger(s.to_string()))
}
