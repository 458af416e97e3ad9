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

/// A value this crate sends to the server: request parameters, option-bag
/// entries, bookmarks.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValueSend {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<ValueSend>),
    Map(HashMap<String, ValueSend>),
    /// A tagged structure the codec encodes by signature byte; the core
    /// never constructs one of these for its own requests (HELLO, RUN, ...
    /// are all plain maps/lists), but callers reaching past the core into
    /// richer domain types may need to send one back (e.g. a `Point`).
    Structure { tag: u8, fields: Vec<ValueSend> },
}

impl ValueSend {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ValueSend::Null)
    }
}

impl From<bool> for ValueSend {
    fn from(v: bool) -> Self {
        ValueSend::Boolean(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for ValueSend {
                fn from(v: $t) -> Self {
                    ValueSend::Integer(v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for ValueSend {
    fn from(v: f32) -> Self {
        ValueSend::Float(v as f64)
    }
}

impl From<f64> for ValueSend {
    fn from(v: f64) -> Self {
        ValueSend::Float(v)
    }
}

impl From<Vec<u8>> for ValueSend {
    fn from(v: Vec<u8>) -> Self {
        ValueSend::Bytes(v)
    }
}

impl From<String> for ValueSend {
    fn from(v: String) -> Self {
        ValueSend::String(v)
    }
}

impl From<&str> for ValueSend {
    fn from(v: &str) -> Self {
        ValueSend::String(v.to_owned())
    }
}

impl<T: Into<ValueSend>> From<Vec<T>> for ValueSend {
    fn from(v: Vec<T>) -> Self {
        ValueSend::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ValueSend>> From<Option<T>> for ValueSend {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => ValueSend::Null,
        }
    }
}

impl From<HashMap<String, ValueSend>> for ValueSend {
    fn from(v: HashMap<String, ValueSend>) -> Self {
        ValueSend::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(ValueSend::from("foo"), ValueSend::String("foo".into()));
    }

    #[test]
    fn test_from_option_none() {
        let v: ValueSend = Option::<i64>::None.into();
        assert_eq!(v, ValueSend::Null);
    }

    #[test]
    fn test_from_option_some() {
        let v: ValueSend = Some(42i64).into();
        assert_eq!(v, ValueSend::Integer(42));
    }

    #[test]
    fn test_from_vec() {
        let v: ValueSend = vec![1i64, 2, 3].into();
        assert_eq!(
            v,
            ValueSend::List(vec![
                ValueSend::Integer(1),
                ValueSend::Integer(2),
                ValueSend::Integer(3),
            ])
        );
    }
}
