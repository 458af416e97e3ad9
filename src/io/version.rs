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

//! Bolt protocol version and the capabilities it implies.

/// A negotiated (or proposed) Bolt protocol version, totally ordered by
/// `(major, minor)`. `(0, 0)` is reserved for "uninitialized."
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const UNINITIALIZED: Version = Version { major: 0, minor: 0 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn is_initialized(&self) -> bool {
        self.major != 0
    }

    /// 4-byte wire form: `[minor, 0, 0, major]`.
    pub fn encode(&self) -> [u8; 4] {
        [self.minor, 0, 0, self.major]
    }

    /// 4-byte wire form proposing a contiguous band of `range` minor
    /// versions ending at `self`: `[minor, range, 0, major]`.
    pub fn encode_with_range(&self, range: u8) -> [u8; 4] {
        [self.minor, range, 0, self.major]
    }

    /// Inverse of [`Version::encode`]. Returns `None` when `major == 0`,
    /// i.e. the bytes don't name a real version.
    pub fn parse(bytes: [u8; 4]) -> Option<Self> {
        let major = bytes[3];
        let minor = bytes[0];
        if major == 0 {
            return None;
        }
        Some(Version { major, minor })
    }

    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::for_version(*self)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Which protocol features are available over a negotiated version. Purely
/// a function of the version; never tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    pub transactions: bool,
    pub bookmarks: bool,
    pub streaming: bool,
    pub query_id: bool,
    pub notifications: bool,
    pub routing: bool,
    pub reauth: bool,
    pub notification_filtering: bool,
    pub telemetry: bool,
}

impl CapabilitySet {
    pub fn for_version(v: Version) -> Self {
        Self {
            transactions: true,
            bookmarks: true,
            streaming: v >= Version::new(4, 0),
            query_id: v >= Version::new(4, 0),
            notifications: v >= Version::new(4, 1),
            routing: v >= Version::new(4, 3),
            reauth: v >= Version::new(5, 1),
            notification_filtering: v >= Version::new(5, 2),
            telemetry: v >= Version::new(5, 4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_encode() {
        assert_eq!(Version::new(5, 4).encode(), [4, 0, 0, 5]);
    }

    #[test]
    fn test_encode_with_range() {
        assert_eq!(Version::new(5, 6).encode_with_range(6), [6, 6, 0, 5]);
    }

    #[rstest]
    #[case([4, 0, 0, 5], Some(Version::new(5, 4)))]
    #[case([0, 0, 0, 0], None)]
    #[case([0, 0, 0, 3], Some(Version::new(3, 0)))]
    fn test_parse(#[case] bytes: [u8; 4], #[case] expected: Option<Version>) {
        assert_eq!(Version::parse(bytes), expected);
    }

    #[test]
    fn test_roundtrip() {
        for major in 3..=5u8 {
            for minor in 0..=9u8 {
                let v = Version::new(major, minor);
                assert_eq!(Version::parse(v.encode()), Some(v));
            }
        }
    }

    #[rstest]
    #[case(Version::new(3, 0), Version::new(4, 0))]
    #[case(Version::new(4, 0), Version::new(4, 1))]
    #[case(Version::new(4, 4), Version::new(5, 0))]
    #[case(Version::new(5, 0), Version::new(5, 6))]
    fn test_capabilities_monotonic(#[case] lower: Version, #[case] higher: Version) {
        assert!(lower < higher);
        let lower_caps = lower.capabilities();
        let higher_caps = higher.capabilities();
        macro_rules! implies {
            ($field:ident) => {
                if lower_caps.$field {
                    assert!(
                        higher_caps.$field,
                        "{} regressed from {} to {}",
                        stringify!($field),
                        lower,
                        higher
                    );
                }
            };
        }
        implies!(transactions);
        implies!(bookmarks);
        implies!(streaming);
        implies!(query_id);
        implies!(notifications);
        implies!(routing);
        implies!(reauth);
        implies!(notification_filtering);
        implies!(telemetry);
    }

    #[test]
    fn test_5_4_has_telemetry_and_routing() {
        let caps = Version::new(5, 4).capabilities();
        assert!(caps.telemetry);
        assert!(caps.routing);
    }

    #[test]
    fn test_3_0_has_only_tx_and_bookmarks() {
        let caps = Version::new(3, 0).capabilities();
        assert!(caps.transactions);
        assert!(caps.bookmarks);
        assert!(!caps.streaming);
        assert!(!caps.routing);
        assert!(!caps.telemetry);
    }
}
