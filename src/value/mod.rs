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

//! Dynamically typed message items.
//!
//! Bolt messages are heterogeneous: strings, integers, floats, booleans,
//! byte arrays, lists, maps, null, and tagged structures. This module only
//! models the currency the core itself inspects (response metadata, option
//! bags, record fields); the byte-level encoding of every variant, and any
//! richer domain typing built on top of a structure tag (nodes,
//! relationships, spatial and temporal values), belongs to the value codec
//! this crate treats as an external collaborator.

mod receive;
mod send;

pub use receive::ValueReceive;
pub use send::ValueSend;
