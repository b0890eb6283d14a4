use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::event::{Event, MAX_USER_ID};

/// Fabricates events with every field drawn independently and uniformly.
pub struct EventGenerator<R> {
    rng: R,
}

impl EventGenerator<StdRng> {
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> EventGenerator<R> {
    pub fn new(rng: R) -> Self {
        EventGenerator { rng }
    }

    /// The timestamp is taken here, at creation, not when the event is sent.
    pub fn next(&mut self) -> Event {
        Event {
            user_id: self.rng.random_range(0..=MAX_USER_ID),
            event_type: self.rng.random(),
            timestamp: Utc::now(),
            user_type: self.rng.random(),
            location: self.rng.random(),
        }
    }
}
