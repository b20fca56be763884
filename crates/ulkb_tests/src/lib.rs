//! Integration tests for the ulkb workspace live in `tests/`.
