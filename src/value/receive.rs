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

use std::collections::HashMap;

/// A value received from the server: record fields, response metadata.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValueReceive {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<ValueReceive>),
    Map(HashMap<String, ValueReceive>),
    /// A structure the core did not need to interpret itself: a graph
    /// entity, a spatial or temporal value, or anything else the codec
    /// knows how to turn into a richer type. `tag` is the structure's
    /// marker byte.
    Structure { tag: u8, fields: Vec<ValueReceive> },
    /// Placeholder for a value that failed to deserialize; carried instead
    /// of aborting the whole record so that sibling fields remain usable.
    BrokenValue { reason: String },
}

impl ValueReceive {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ValueReceive::Null)
    }

    #[inline]
    pub fn is_broken(&self) -> bool {
        matches!(self, ValueReceive::BrokenValue { .. })
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueReceive::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ValueReceive::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ValueReceive::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ValueReceive::Bytes(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueReceive::String(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[ValueReceive]> {
        match self {
            ValueReceive::List(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&HashMap<String, ValueReceive>> {
        match self {
            ValueReceive::Map(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn into_map(self) -> Option<HashMap<String, ValueReceive>> {
        match self {
            ValueReceive::Map(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn into_string(self) -> Option<String> {
        match self {
            ValueReceive::String(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn into_list(self) -> Option<Vec<ValueReceive>> {
        match self {
            ValueReceive::List(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_structure(&self) -> Option<(u8, &[ValueReceive])> {
        match self {
            ValueReceive::Structure { tag, fields } => Some((*tag, fields)),
            _ => None,
        }
    }
}

impl TryFrom<ValueReceive> for bool {
    type Error = ValueReceive;

    fn try_from(value: ValueReceive) -> Result<Self, Self::Error> {
        match value {
            ValueReceive::Boolean(v) => Ok(v),
            _ => Err(value),
        }
    }
}

impl TryFrom<ValueReceive> for i64 {
    type Error = ValueReceive;

    fn try_from(value: ValueReceive) -> Result<Self, Self::Error> {
        match value {
            ValueReceive::Integer(v) => Ok(v),
            _ => Err(value),
        }
    }
}

impl TryFrom<ValueReceive> for f64 {
    type Error = ValueReceive;

    fn try_from(value: ValueReceive) -> Result<Self, Self::Error> {
        match value {
            ValueReceive::Float(v) => Ok(v),
            _ => Err(value),
        }
    }
}

impl TryFrom<ValueReceive> for String {
    type Error = ValueReceive;

    fn try_from(value: ValueReceive) -> Result<Self, Self::Error> {
        match value {
            ValueReceive::String(v) => Ok(v),
            _ => Err(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        let v = ValueReceive::String("foo".into());
        assert_eq!(v.as_str(), Some("foo"));
        assert_eq!(ValueReceive::Null.as_str(), None);
    }

    #[test]
    fn test_as_structure() {
        let v = ValueReceive::Structure {
            tag: 0x4e,
            fields: vec![ValueReceive::Integer(1)],
        };
        let (tag, fields) = v.as_structure().unwrap();
        assert_eq!(tag, 0x4e);
        assert_eq!(fields, &[ValueReceive::Integer(1)]);
    }

    #[test]
    fn test_broken_value_is_not_null() {
        let v = ValueReceive::BrokenValue {
            reason: "bad marker".into(),
        };
        assert!(v.is_broken());
        assert!(!v.is_null());
    }
}
