//! Common test utilities and infrastructure
//!
//! Hand-written fakes for the collaborator traits plus fixtures shared by the
//! workflow scenario tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{FakeBattlelog, FakeLeaderboard, FakeNormalizer, TestHelpers};
