//! Synthetic user activity producer.
//!
//! Fabricates randomized user events at a fixed rate and publishes them to the
//! `user_events` Kafka topic until asked to stop:
//!
//! - [`generator::EventGenerator`] draws each [`event::Event`] field uniformly
//! - [`publisher::PublisherLoop`] paces generate, serialize and publish, and
//!   releases its [`sink::EventSink`] once on the way out
//! - [`shutdown`] turns SIGINT/SIGTERM into a one-shot stop request

pub mod cadence;
pub mod config;
pub mod event;
pub mod generator;
pub mod publisher;
pub mod shutdown;
pub mod sink;
