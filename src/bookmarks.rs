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

use std::collections::HashSet;

/// An unordered set of opaque, server-issued causal-consistency tokens.
///
/// A connection tracks the most recently observed bookmark (see
/// [`crate::io::bolt::Connection`]) and folds it into `bookmarks` for a
/// caller that did not supply any of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bookmarks {
    bookmarks: HashSet<String>,
}

impl Bookmarks {
    pub fn from_raw(raw: impl IntoIterator<Item = String>) -> Self {
        Bookmarks {
            bookmarks: raw.into_iter().collect(),
        }
    }

    pub(crate) fn empty() -> Self {
        Bookmarks::default()
    }

    pub(crate) fn single(bookmark: String) -> Self {
        Bookmarks {
            bookmarks: HashSet::from([bookmark]),
        }
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn raw(&self) -> impl Iterator<Item = &str> {
        self.bookmarks.iter().map(String::as_str)
    }

    pub(crate) fn insert(&mut self, bookmark: String) {
        self.bookmarks.insert(bookmark);
    }
}

impl FromIterator<String> for Bookmarks {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Bookmarks::from_raw(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_empty() {
        assert!(Bookmarks::empty().is_empty());
        assert_eq!(Bookmarks::empty().len(), 0);
    }

    #[test]
    fn test_single() {
        let bm = Bookmarks::single("nb:v1:tx42".into());
        assert_eq!(bm.raw().collect::<Vec<_>>(), vec!["nb:v1:tx42"]);
    }

    #[test]
    fn test_dedups() {
        let bm = Bookmarks::from_raw(["a".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(bm.len(), 2);
    }
}
