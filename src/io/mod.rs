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

//! Everything below the public [`bolt::Connection`]: chunked framing,
//! deadline-bounded I/O, the abstract transport contract, and LEB128
//! varints used by the manifest handshake.

pub mod bolt;
pub(crate) mod chunk;
pub(crate) mod deadline;
pub mod transport;
pub(crate) mod varint;
pub mod version;
