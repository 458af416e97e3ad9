// Copyright Rouven Bauer
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A minimal PackStream marker-byte codec for [`ValueSend`]/[`ValueReceive`].
//!
//! The wire codec proper (richer domain types layered on top of a
//! structure's tag byte) is out of scope for this crate; this module only
//! carries enough of PackStream to put a request on the wire and read a
//! response metadata/record back off of it.

use std::collections::HashMap;
use std::io::{Read, Write};

use usize_cast::IntoUsize;

use crate::error::{Neo4jError, Result};
use crate::value::{ValueReceive, ValueSend};

mod marker {
    pub(super) const TINY_STRING: u8 = 0x80;
    pub(super) const TINY_LIST: u8 = 0x90;
    pub(super) const TINY_MAP: u8 = 0xA0;
    pub(super) const TINY_STRUCT: u8 = 0xB0;
    pub(super) const NULL: u8 = 0xC0;
    pub(super) const FLOAT_64: u8 = 0xC1;
    pub(super) const FALSE: u8 = 0xC2;
    pub(super) const TRUE: u8 = 0xC3;
    pub(super) const INT_8: u8 = 0xC8;
    pub(super) const INT_16: u8 = 0xC9;
    pub(super) const INT_32: u8 = 0xCA;
    pub(super) const INT_64: u8 = 0xCB;
    pub(super) const BYTES_8: u8 = 0xCC;
    pub(super) const BYTES_16: u8 = 0xCD;
    pub(super) const BYTES_32: u8 = 0xCE;
    pub(super) const STRING_8: u8 = 0xD0;
    pub(super) const STRING_16: u8 = 0xD1;
    pub(super) const STRING_32: u8 = 0xD2;
    pub(super) const LIST_8: u8 = 0xD4;
    pub(super) const LIST_16: u8 = 0xD5;
    pub(super) const LIST_32: u8 = 0xD6;
    pub(super) const MAP_8: u8 = 0xD8;
    pub(super) const MAP_16: u8 = 0xD9;
    pub(super) const MAP_32: u8 = 0xDA;
}

pub(crate) fn write_value<W: Write>(w: &mut W, value: &ValueSend) -> Result<()> {
    match value {
        ValueSend::Null => write_null(w),
        ValueSend::Boolean(v) => write_bool(w, *v),
        ValueSend::Integer(v) => write_int(w, *v),
        ValueSend::Float(v) => write_float(w, *v),
        ValueSend::Bytes(v) => write_bytes(w, v),
        ValueSend::String(v) => write_string(w, v),
        ValueSend::List(v) => write_list(w, v),
        ValueSend::Map(v) => write_map(w, v),
        ValueSend::Structure { tag, fields } => write_struct(w, *tag, fields),
    }
}

fn io(res: std::io::Result<()>) -> Result<()> {
    Neo4jError::wrap_write(res)
}

fn write_null<W: Write>(w: &mut W) -> Result<()> {
    io(w.write_all(&[marker::NULL]))
}

fn write_bool<W: Write>(w: &mut W, v: bool) -> Result<()> {
    io(w.write_all(&[if v { marker::TRUE } else { marker::FALSE }]))
}

fn write_int<W: Write>(w: &mut W, v: i64) -> Result<()> {
    if (-16..=127).contains(&v) {
        io(w.write_all(&[v as i8 as u8]))
    } else if (i8::MIN as i64..i8::MAX as i64).contains(&v) {
        io(w.write_all(&[marker::INT_8, v as i8 as u8]))
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&v) {
        let mut buf = vec![marker::INT_16];
        buf.extend_from_slice(&(v as i16).to_be_bytes());
        io(w.write_all(&buf))
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&v) {
        let mut buf = vec![marker::INT_32];
        buf.extend_from_slice(&(v as i32).to_be_bytes());
        io(w.write_all(&buf))
    } else {
        let mut buf = vec![marker::INT_64];
        buf.extend_from_slice(&v.to_be_bytes());
        io(w.write_all(&buf))
    }
}

fn write_float<W: Write>(w: &mut W, v: f64) -> Result<()> {
    let mut buf = vec![marker::FLOAT_64];
    buf.extend_from_slice(&v.to_be_bytes());
    io(w.write_all(&buf))
}

fn write_sized<W: Write>(w: &mut W, len: usize, tiny: u8, small: u8, medium: u8, large: u8) -> Result<()> {
    if len <= 15 && tiny != 0 {
        io(w.write_all(&[tiny | len as u8]))
    } else if len <= u8::MAX as usize {
        io(w.write_all(&[small, len as u8]))
    } else if len <= u16::MAX as usize {
        let mut buf = vec![medium];
        buf.extend_from_slice(&(len as u16).to_be_bytes());
        io(w.write_all(&buf))
    } else if len <= u32::MAX as usize {
        let mut buf = vec![large];
        buf.extend_from_slice(&(len as u32).to_be_bytes());
        io(w.write_all(&buf))
    } else {
        Err(Neo4jError::service(format!(
            "PackStream cannot encode a container of {len} elements"
        )))
    }
}

fn write_bytes<W: Write>(w: &mut W, v: &[u8]) -> Result<()> {
    write_sized(w, v.len(), 0, marker::BYTES_8, marker::BYTES_16, marker::BYTES_32)?;
    io(w.write_all(v))
}

fn write_string<W: Write>(w: &mut W, v: &str) -> Result<()> {
    let bytes = v.as_bytes();
    write_sized(
        w,
        bytes.len(),
        marker::TINY_STRING,
        marker::STRING_8,
        marker::STRING_16,
        marker::STRING_32,
    )?;
    io(w.write_all(bytes))
}

fn write_list<W: Write>(w: &mut W, v: &[ValueSend]) -> Result<()> {
    write_sized(w, v.len(), marker::TINY_LIST, marker::LIST_8, marker::LIST_16, marker::LIST_32)?;
    for item in v {
        write_value(w, item)?;
    }
    Ok(())
}

fn write_map<W: Write>(w: &mut W, v: &HashMap<String, ValueSend>) -> Result<()> {
    write_sized(w, v.len(), marker::TINY_MAP, marker::MAP_8, marker::MAP_16, marker::MAP_32)?;
    for (key, value) in v {
        write_string(w, key)?;
        write_value(w, value)?;
    }
    Ok(())
}

fn write_struct<W: Write>(w: &mut W, tag: u8, fields: &[ValueSend]) -> Result<()> {
    write_struct_header(w, tag, fields.len())?;
    for field in fields {
        write_value(w, field)?;
    }
    Ok(())
}

/// Writes a structure's marker/field-count byte and its tag, without
/// writing any fields. Used by the message layer, which already holds its
/// fields as a flat `Vec<ValueSend>` rather than packed into one
/// `ValueSend::Structure`.
pub(crate) fn write_struct_header<W: Write>(w: &mut W, tag: u8, field_count: usize) -> Result<()> {
    if field_count > 15 {
        return Err(Neo4jError::service(
            "PackStream cannot encode a structure with more than 15 fields",
        ));
    }
    io(w.write_all(&[marker::TINY_STRUCT | field_count as u8, tag]))
}

/// Inverse of [`write_struct_header`]: reads the marker/field-count byte and
/// tag, returning `(tag, field_count)` without reading any fields.
pub(crate) fn read_struct_header<R: Read>(r: &mut R) -> Result<(u8, usize)> {
    let marker = read_u8(r)?;
    if marker & 0xF0 != marker::TINY_STRUCT {
        return Err(Neo4jError::protocol(format!(
            "expected a structure, got marker byte 0x{marker:02X}"
        )));
    }
    let field_count = (marker & 0x0F) as usize;
    let tag = read_u8(r)?;
    Ok((tag, field_count))
}

pub(crate) fn read_value<R: Read>(r: &mut R) -> Result<ValueReceive> {
    let marker = read_u8(r)?;
    read_value_with_marker(r, marker)
}

fn read_value_with_marker<R: Read>(r: &mut R, marker: u8) -> Result<ValueReceive> {
    match marker {
        marker::NULL => Ok(ValueReceive::Null),
        marker::TRUE => Ok(ValueReceive::Boolean(true)),
        marker::FALSE => Ok(ValueReceive::Boolean(false)),
        marker::FLOAT_64 => Ok(ValueReceive::Float(f64::from_be_bytes(read_n(r)?))),
        marker::INT_8 => Ok(ValueReceive::Integer(i8::from_be_bytes(read_n(r)?) as i64)),
        marker::INT_16 => Ok(ValueReceive::Integer(i16::from_be_bytes(read_n(r)?) as i64)),
        marker::INT_32 => Ok(ValueReceive::Integer(i32::from_be_bytes(read_n(r)?) as i64)),
        marker::INT_64 => Ok(ValueReceive::Integer(i64::from_be_bytes(read_n(r)?))),
        marker::BYTES_8 => {
            let len = read_u8(r)? as usize;
            Ok(ValueReceive::Bytes(read_vec(r, len)?))
        }
        marker::BYTES_16 => {
            let len = u16::from_be_bytes(read_n(r)?).into_usize();
            Ok(ValueReceive::Bytes(read_vec(r, len)?))
        }
        marker::BYTES_32 => {
            let len = u32::from_be_bytes(read_n(r)?) as usize;
            Ok(ValueReceive::Bytes(read_vec(r, len)?))
        }
        marker::STRING_8 => {
            let len = read_u8(r)? as usize;
            Ok(ValueReceive::String(read_string(r, len)?))
        }
        marker::STRING_16 => {
            let len = u16::from_be_bytes(read_n(r)?).into_usize();
            Ok(ValueReceive::String(read_string(r, len)?))
        }
        marker::STRING_32 => {
            let len = u32::from_be_bytes(read_n(r)?) as usize;
            Ok(ValueReceive::String(read_string(r, len)?))
        }
        marker::LIST_8 => {
            let len = read_u8(r)? as usize;
            read_list(r, len)
        }
        marker::LIST_16 => {
            let len = u16::from_be_bytes(read_n(r)?).into_usize();
            read_list(r, len)
        }
        marker::LIST_32 => {
            let len = u32::from_be_bytes(read_n(r)?) as usize;
            read_list(r, len)
        }
        marker::MAP_8 => {
            let len = read_u8(r)? as usize;
            read_map(r, len)
        }
        marker::MAP_16 => {
            let len = u16::from_be_bytes(read_n(r)?).into_usize();
            read_map(r, len)
        }
        marker::MAP_32 => {
            let len = u32::from_be_bytes(read_n(r)?) as usize;
            read_map(r, len)
        }
        _ if marker & 0xF0 == marker::TINY_STRING => read_string(r, (marker & 0x0F) as usize).map(ValueReceive::String),
        _ if marker & 0xF0 == marker::TINY_LIST => read_list(r, (marker & 0x0F) as usize),
        _ if marker & 0xF0 == marker::TINY_MAP => read_map(r, (marker & 0x0F) as usize),
        _ if marker & 0xF0 == marker::TINY_STRUCT => read_struct(r, (marker & 0x0F) as usize),
        _ if marker as i8 >= -16 => Ok(ValueReceive::Integer(marker as i8 as i64)),
        _ => Ok(ValueReceive::BrokenValue {
            reason: format!("unknown PackStream marker byte 0x{marker:02X}"),
        }),
    }
}

fn read_struct<R: Read>(r: &mut R, len: usize) -> Result<ValueReceive> {
    let tag = read_u8(r)?;
    let mut fields = Vec::with_capacity(len);
    for _ in 0..len {
        fields.push(read_value(r)?);
    }
    Ok(ValueReceive::Structure { tag, fields })
}

fn read_list<R: Read>(r: &mut R, len: usize) -> Result<ValueReceive> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_value(r)?);
    }
    Ok(ValueReceive::List(out))
}

fn read_map<R: Read>(r: &mut R, len: usize) -> Result<ValueReceive> {
    let mut out = HashMap::with_capacity(len);
    for _ in 0..len {
        let key = read_value(r)?;
        let key = match key {
            ValueReceive::String(s) => s,
            other => {
                return Err(Neo4jError::protocol(format!(
                    "expected a string map key, got {other:?}"
                )))
            }
        };
        out.insert(key, read_value(r)?);
    }
    Ok(ValueReceive::Map(out))
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    Ok(read_n::<R, 1>(r)?[0])
}

fn read_n<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    Neo4jError::wrap_read(r.read_exact(&mut buf))?;
    Ok(buf)
}

fn read_vec<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    Neo4jError::wrap_read(r.read_exact(&mut buf))?;
    Ok(buf)
}

fn read_string<R: Read>(r: &mut R, len: usize) -> Result<String> {
    let buf = read_vec(r, len)?;
    String::from_utf8(buf).map_err(|err| Neo4jError::protocol(format!("invalid UTF-8 string: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: ValueSend) -> ValueReceive {
        let mut buf = Vec::new();
        write_value(&mut buf, &value).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        read_value(&mut cursor).unwrap()
    }

    #[test]
    fn test_roundtrip_null() {
        assert_eq!(roundtrip(ValueSend::Null), ValueReceive::Null);
    }

    #[test]
    fn test_roundtrip_bool() {
        assert_eq!(roundtrip(ValueSend::Boolean(true)), ValueReceive::Boolean(true));
        assert_eq!(roundtrip(ValueSend::Boolean(false)), ValueReceive::Boolean(false));
    }

    #[test]
    fn test_roundtrip_tiny_int() {
        assert_eq!(roundtrip(ValueSend::Integer(42)), ValueReceive::Integer(42));
        assert_eq!(roundtrip(ValueSend::Integer(-5)), ValueReceive::Integer(-5));
    }

    #[test]
    fn test_roundtrip_large_int() {
        assert_eq!(
            roundtrip(ValueSend::Integer(i64::MAX)),
            ValueReceive::Integer(i64::MAX)
        );
        assert_eq!(
            roundtrip(ValueSend::Integer(i64::MIN)),
            ValueReceive::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_roundtrip_float() {
        assert_eq!(roundtrip(ValueSend::Float(3.5)), ValueReceive::Float(3.5));
    }

    #[test]
    fn test_roundtrip_string() {
        assert_eq!(
            roundtrip(ValueSend::String("hello bolt".into())),
            ValueReceive::String("hello bolt".into())
        );
    }

    #[test]
    fn test_roundtrip_long_string() {
        let s = "x".repeat(100_000);
        assert_eq!(
            roundtrip(ValueSend::String(s.clone())),
            ValueReceive::String(s)
        );
    }

    #[test]
    fn test_roundtrip_list() {
        let v = ValueSend::List(vec![ValueSend::Integer(1), ValueSend::String("a".into())]);
        assert_eq!(
            roundtrip(v),
            ValueReceive::List(vec![ValueReceive::Integer(1), ValueReceive::String("a".into())])
        );
    }

    #[test]
    fn test_roundtrip_map() {
        let v = ValueSend::Map(HashMap::from([("k".to_string(), ValueSend::Integer(7))]));
        let back = roundtrip(v);
        assert_eq!(
            back.as_map().unwrap().get("k"),
            Some(&ValueReceive::Integer(7))
        );
    }

    #[test]
    fn test_roundtrip_structure() {
        let v = ValueSend::Structure {
            tag: 0x4E,
            fields: vec![ValueSend::Integer(1), ValueSend::String("Person".into())],
        };
        let back = roundtrip(v);
        let (tag, fields) = back.as_structure().unwrap();
        assert_eq!(tag, 0x4E);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_unknown_marker_becomes_broken_value() {
        let mut cursor = std::io::Cursor::new(vec![0xC5u8]);
        let v = read_value(&mut cursor).unwrap();
        assert!(v.is_broken());
    }
}
