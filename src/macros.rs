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

/// Build a `HashMap<String, ValueSend>` option-bag: `value_map!({"scheme":
/// "basic", "principal": user})`. Every value is converted with `.into()`,
/// so literals, owned `String`s and any other `Into<ValueSend>` type may be
/// mixed freely.
macro_rules! value_map {
    ({$($key:expr : $value:expr),* $(,)?}) => {
        {
            #[allow(unused_mut)]
            let mut m: std::collections::HashMap<String, $crate::value::ValueSend> =
                std::collections::HashMap::new();
            $(
                m.insert(($key).into(), ($value).into());
            )*
            m
        }
    };
}

pub(crate) use value_map;
