// Signed-File Codec
// Layout: <original bytes> "--SIGNATURE--" <decimal signature digits>

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{Error, Result};
use crate::rsa::bigint::RsaBigInt;
use crate::rsa::hash::compute_hash_range;
use crate::rsa::validate::parse_decimal_str;

/// Marker placed between the content and the signature. Never escaped.
pub const SIGNATURE_DELIMITER: &[u8] = b"--SIGNATURE--";

/// Number of trailing bytes searched for the delimiter
pub const DEFAULT_TAIL_WINDOW: usize = 8192;

/// A signed file split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSignedFile {
    /// Byte offset of the delimiter, i.e. the length of the original content
    pub content_len: u64,
    /// Block hash of `[0, content_len)`
    pub content_hash: RsaBigInt,
    pub signature: RsaBigInt,
}

/// Stream `content` into `out` followed by the delimiter and the signature.
///
/// Content bytes are copied verbatim. Returns the total number of bytes written.
pub fn encode<R: Read, W: Write>(
    content: &mut R,
    out: &mut W,
    signature: &RsaBigInt,
) -> Result<u64> {
    let copied = io::copy(content, out)?;
    let digits = signature.to_string();

    out.write_all(SIGNATURE_DELIMITER)?;
    out.write_all(digits.as_bytes())?;
    out.flush()?;

    Ok(copied + SIGNATURE_DELIMITER.len() as u64 + digits.len() as u64)
}

/// In-memory form of [`encode`]
pub fn encode_to_vec(content: &[u8], signature: &RsaBigInt) -> Vec<u8> {
    let digits = signature.to_string();
    let mut out = Vec::with_capacity(content.len() + SIGNATURE_DELIMITER.len() + digits.len());
    out.extend_from_slice(content);
    out.extend_from_slice(SIGNATURE_DELIMITER);
    out.extend_from_slice(digits.as_bytes());
    out
}

/// Offset of the last delimiter within the trailing `tail_window` bytes
pub fn find_delimiter<R: Read + Seek>(reader: &mut R, tail_window: usize) -> Result<u64> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let tail_len = (tail_window as u64).min(file_len);
    let tail_start = file_len - tail_len;

    reader.seek(SeekFrom::Start(tail_start))?;
    let mut tail = vec![0u8; tail_len as usize];
    reader.read_exact(&mut tail)?;

    let idx = tail
        .windows(SIGNATURE_DELIMITER.len())
        .rposition(|w| w == SIGNATURE_DELIMITER)
        .ok_or_else(|| {
            Error::Format(format!(
                "delimiter '{}' not found in the last {} bytes",
                String::from_utf8_lossy(SIGNATURE_DELIMITER),
                tail_len
            ))
        })?;

    Ok(tail_start + idx as u64)
}

fn read_signature<R: Read + Seek>(reader: &mut R, start: u64) -> Result<RsaBigInt> {
    reader.seek(SeekFrom::Start(start))?;
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;

    let text = std::str::from_utf8(&raw)
        .map_err(|_| Error::Format("signature is not valid text".to_string()))?;

    parse_decimal_str(text)
        .ok_or_else(|| Error::Format(format!("invalid signature format: {:?}", text.trim())))
}

/// Split a signed file into the hash of its content and its signature.
///
/// The last delimiter in the trailing window wins, so content that happens
/// to contain the delimiter is still hashed in full.
pub fn decode<R: Read + Seek>(
    reader: &mut R,
    modulus: &RsaBigInt,
    tail_window: usize,
) -> Result<DecodedSignedFile> {
    let content_len = find_delimiter(reader, tail_window)?;
    let signature = read_signature(reader, content_len + SIGNATURE_DELIMITER.len() as u64)?;
    let content_hash = compute_hash_range(reader, 0, content_len, modulus)?;

    tracing::debug!(content_len, %content_hash, %signature, "decoded signed file");

    Ok(DecodedSignedFile {
        content_len,
        content_hash,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;
    use crate::rsa::hash::hash_bytes;
    use std::io::Cursor;

    fn n() -> RsaBigInt {
        from_u64(3233)
    }

    #[test]
    fn test_encode_layout() {
        let mut out = Vec::new();
        let written = encode(&mut Cursor::new(b"A".to_vec()), &mut out, &from_u64(1388)).unwrap();
        assert_eq!(out, b"A--SIGNATURE--1388".to_vec());
        assert_eq!(written, out.len() as u64);
        assert_eq!(encode_to_vec(b"A", &from_u64(1388)), out);
    }

    #[test]
    fn test_round_trip() {
        let content = "Привет, мир!\r\nline two\n".as_bytes();
        let signature = from_u64(2_718);
        let signed = encode_to_vec(content, &signature);

        let decoded = decode(&mut Cursor::new(signed), &n(), DEFAULT_TAIL_WINDOW).unwrap();
        assert_eq!(decoded.content_len, content.len() as u64);
        assert_eq!(decoded.content_hash, hash_bytes(content, &n()).unwrap());
        assert_eq!(decoded.signature, signature);
    }

    #[test]
    fn test_golden_file() {
        let decoded = decode(
            &mut Cursor::new(b"A--SIGNATURE--1388".to_vec()),
            &n(),
            DEFAULT_TAIL_WINDOW,
        )
        .unwrap();
        assert_eq!(decoded.content_hash, from_u64(1361));
        assert_eq!(decoded.signature, from_u64(1388));
    }

    #[test]
    fn test_last_delimiter_wins() {
        let content = b"quoting --SIGNATURE--42 inside the body";
        let signed = encode_to_vec(content, &from_u64(7));

        let decoded = decode(&mut Cursor::new(signed), &n(), DEFAULT_TAIL_WINDOW).unwrap();
        assert_eq!(decoded.content_len, content.len() as u64);
        assert_eq!(decoded.signature, from_u64(7));
    }

    #[test]
    fn test_large_content_uses_tail_window() {
        let content: Vec<u8> = (0..50_000u32).map(|i| (i % 97) as u8 + b' ').collect();
        let signed = encode_to_vec(&content, &from_u64(3000));

        let decoded = decode(&mut Cursor::new(signed), &n(), DEFAULT_TAIL_WINDOW).unwrap();
        assert_eq!(decoded.content_len, 50_000);
        assert_eq!(decoded.content_hash, hash_bytes(&content, &n()).unwrap());
    }

    #[test]
    fn test_delimiter_outside_window_not_found() {
        let mut signed = encode_to_vec(b"body", &from_u64(5));
        signed.extend(std::iter::repeat(b' ').take(100));

        let err = decode(&mut Cursor::new(signed), &n(), 64).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_trailing_whitespace_tolerated() {
        let decoded = decode(
            &mut Cursor::new(b"A--SIGNATURE--1388\r\n".to_vec()),
            &n(),
            DEFAULT_TAIL_WINDOW,
        )
        .unwrap();
        assert_eq!(decoded.signature, from_u64(1388));
    }

    #[test]
    fn test_signature_must_be_plain_digits() {
        for tail in [&b"1_388"[..], b"13 88", b"1388\xc2\xa0", b"+-1388"] {
            let mut signed = b"A--SIGNATURE--".to_vec();
            signed.extend_from_slice(tail);
            let err = decode(&mut Cursor::new(signed), &n(), DEFAULT_TAIL_WINDOW).unwrap_err();
            assert!(matches!(err, Error::Format(_)), "{:?} must be rejected", tail);
        }

        let decoded = decode(
            &mut Cursor::new(b"A--SIGNATURE--+1388".to_vec()),
            &n(),
            DEFAULT_TAIL_WINDOW,
        )
        .unwrap();
        assert_eq!(decoded.signature, from_u64(1388));
    }

    #[test]
    fn test_missing_delimiter() {
        let err = decode(&mut Cursor::new(b"no marker here".to_vec()), &n(), DEFAULT_TAIL_WINDOW)
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let err = decode(&mut Cursor::new(Vec::new()), &n(), DEFAULT_TAIL_WINDOW).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_non_numeric_signature() {
        let err = decode(
            &mut Cursor::new(b"--SIGNATURE--abc".to_vec()),
            &n(),
            DEFAULT_TAIL_WINDOW,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let err = decode(&mut Cursor::new(b"text--SIGNATURE--".to_vec()), &n(), DEFAULT_TAIL_WINDOW)
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let mut bad_utf8 = b"text--SIGNATURE--".to_vec();
        bad_utf8.extend_from_slice(&[0xFF, 0xFE]);
        let err = decode(&mut Cursor::new(bad_utf8), &n(), DEFAULT_TAIL_WINDOW).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }
}
