use std::fmt;

use chrono::{DateTime, Utc};
use rand::distr::{Distribution, StandardUniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

// Declares a closed set of labels that is drawn uniformly and travels over
// the wire under its exact label.
macro_rules! labels {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Distribution<$name> for StandardUniform {
            fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> $name {
                $name::ALL[rng.random_range(0..$name::ALL.len())]
            }
        }
    };
}

labels! {
    /// What the synthetic user did.
    EventType {
        Login => "Login",
        Logout => "Logout",
        Download => "Download",
        Share => "Share",
    }
}

labels! {
    /// Subscription tier of the synthetic user.
    UserType {
        Free => "Free",
        Premium => "Premium",
        Enterprise => "Enterprise",
    }
}

labels! {
    /// Region the activity is attributed to.
    Location {
        Us => "US",
        Br => "BR",
        Eu => "EU",
        In => "IN",
    }
}

/// Highest user id handed out by the generator.
pub const MAX_USER_ID: u8 = 99;

/// One synthetic user activity record, published as a JSON object keyed by
/// its `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: u8,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub user_type: UserType,
    pub location: Location,
}

impl Event {
    /// Message key: the decimal form of `user_id`.
    pub fn key(&self) -> String {
        self.user_id.to_string()
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user {} ({}, {}) {} at {}",
            self.user_id,
            self.user_type,
            self.location,
            self.event_type,
            self.timestamp.to_rfc3339()
        )
    }
}
