//! Compact binary documents (`.bin`, `.dat`).
//!
//! ```text
//! "FLCB" | version u8 | count u32 | count x entry
//! entry  = key_len u16 | key | tag u8 | payload
//! payload: Str  u32 len | bytes
//!          Int  i64
//!          Float f64
//!          Bool u8
//!          List u32 count | count x (u32 len | bytes)
//! ```
//! All integers are big-endian.

use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::config::{
    config_value::{ConfigMap, ConfigValue},
    format::FormatError,
};

const MAGIC: &[u8; 4] = b"FLCB";
const VERSION: u8 = 1;

const TAG_STR: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_LIST: u8 = 4;

pub(crate) fn encode(map: &ConfigMap) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::new();
    write_all(&mut buf, map).map_err(|e| FormatError::unrepresentable("", e.to_string()))?;
    Ok(buf)
}

fn write_all(buf: &mut Vec<u8>, map: &ConfigMap) -> io::Result<()> {
    buf.extend_from_slice(MAGIC);
    buf.write_u8(VERSION)?;
    buf.write_u32::<BigEndian>(len_u32(map.len())?)?;
    for (key, value) in map {
        let key_len = u16::try_from(key.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "key longer than 65535 bytes"))?;
        buf.write_u16::<BigEndian>(key_len)?;
        buf.extend_from_slice(key.as_bytes());
        match value {
            ConfigValue::Str(s) => {
                buf.write_u8(TAG_STR)?;
                write_str(buf, s)?;
            }
            ConfigValue::Int(i) => {
                buf.write_u8(TAG_INT)?;
                buf.write_i64::<BigEndian>(*i)?;
            }
            ConfigValue::Float(f) => {
                buf.write_u8(TAG_FLOAT)?;
                buf.write_f64::<BigEndian>(*f)?;
            }
            ConfigValue::Bool(b) => {
                buf.write_u8(TAG_BOOL)?;
                buf.write_u8(u8::from(*b))?;
            }
            ConfigValue::List(items) => {
                buf.write_u8(TAG_LIST)?;
                buf.write_u32::<BigEndian>(len_u32(items.len())?)?;
                for item in items {
                    write_str(buf, item)?;
                }
            }
        }
    }
    Ok(())
}

fn len_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length overflows u32"))
}

fn write_str(buf: &mut Vec<u8>, s: &str) -> io::Result<()> {
    buf.write_u32::<BigEndian>(len_u32(s.len())?)?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

pub(crate) fn decode(data: &[u8]) -> Result<ConfigMap, FormatError> {
    read_all(data).map_err(|e| FormatError::Parse(e.to_string()))
}

fn read_all(data: &[u8]) -> io::Result<ConfigMap> {
    let mut cursor = Cursor::new(data);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(invalid("bad magic"));
    }
    let version = cursor.read_u8()?;
    if version != VERSION {
        return Err(invalid(&format!("unsupported version {version}")));
    }

    let count = cursor.read_u32::<BigEndian>()?;
    let mut map = ConfigMap::new();
    for _ in 0..count {
        let key_len = cursor.read_u16::<BigEndian>()?;
        let key = read_bytes_as_string(&mut cursor, usize::from(key_len))?;
        let value = match cursor.read_u8()? {
            TAG_STR => ConfigValue::Str(read_str(&mut cursor)?),
            TAG_INT => ConfigValue::Int(cursor.read_i64::<BigEndian>()?),
            TAG_FLOAT => ConfigValue::Float(cursor.read_f64::<BigEndian>()?),
            TAG_BOOL => ConfigValue::Bool(cursor.read_u8()? != 0),
            TAG_LIST => {
                let n = cursor.read_u32::<BigEndian>()?;
                let mut items = Vec::new();
                for _ in 0..n {
                    items.push(read_str(&mut cursor)?);
                }
                ConfigValue::List(items)
            }
            other => return Err(invalid(&format!("unknown tag {other}"))),
        };
        map.insert(key, value);
    }
    if usize::try_from(cursor.position()).ok() != Some(data.len()) {
        return Err(invalid("trailing bytes"));
    }
    Ok(map)
}

fn read_str(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
    let len = cursor.read_u32::<BigEndian>()?;
    let len = usize::try_from(len).map_err(|_| invalid("length overflows usize"))?;
    read_bytes_as_string(cursor, len)
}

fn read_bytes_as_string(cursor: &mut Cursor<&[u8]>, len: usize) -> io::Result<String> {
    let remaining = cursor.get_ref().len().saturating_sub(usize::try_from(cursor.position()).unwrap_or(usize::MAX));
    if len > remaining {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated string"));
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| invalid("string is not UTF-8"))
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn header_layout() {
        let mut map = ConfigMap::new();
        map.insert("a".into(), ConfigValue::Bool(true));
        let bytes = encode(&map).unwrap();
        assert_eq!(&bytes[..4], b"FLCB");
        assert_eq!(bytes[4], VERSION);
        assert_eq!(&bytes[5..9], &[0, 0, 0, 1]);
        assert_eq!(&bytes[9..11], &[0, 1]);
        assert_eq!(bytes[11], b'a');
        assert_eq!(&bytes[12..], &[TAG_BOOL, 1]);
    }

    #[test]
    fn truncated_and_corrupt_input_is_rejected() {
        let mut map = ConfigMap::new();
        map.insert("name".into(), ConfigValue::Str("Aria".into()));
        let bytes = encode(&map).unwrap();
        assert!(decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(decode(b"NOPE").is_err());

        let mut extra = bytes.clone();
        extra.push(0);
        assert!(decode(&extra).is_err());

        // Length prefix far beyond the buffer must not allocate it.
        let mut huge = bytes[..11].to_vec();
        huge.extend_from_slice(b"name");
        huge.push(TAG_STR);
        huge.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(decode(&huge).is_err());
    }
}
