//! Rendered tree snapshot tests using insta
//!
//! These tests pin the canonical serialization of settled trees, so a
//! change in markup shows up as a reviewable snapshot diff.

#[path = "common/mod.rs"]
mod common;

#[path = "ui/test_render.rs"]
mod test_render;
