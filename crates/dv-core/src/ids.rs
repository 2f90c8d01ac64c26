//! Opaque identifiers handed to us by the command layer

use core::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// A channel or other session key
    SessionId
);
string_id!(
    /// A participating user
    PlayerId
);
string_id!(
    /// A generated dungeon, also the snapshot file stem
    DungeonId
);

impl PlayerId {
    /// Stable palette slot for this player.
    ///
    /// Numeric ids map by value so colours match across renders; other ids
    /// use a byte fold that does not depend on the hasher in use.
    pub fn palette_index(&self, palette_size: usize) -> usize {
        if palette_size == 0 {
            return 0;
        }
        let value = match self.0.parse::<u64>() {
            Ok(n) => n,
            Err(_) => self
                .0
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b))),
        };
        (value % palette_size as u64) as usize
    }
}
