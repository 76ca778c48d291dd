//! Tests for the concrete collaborators
//!
//! The HTTP client is exercised against a local wiremock server; the
//! normalizer against hand-built battlelog entries.
