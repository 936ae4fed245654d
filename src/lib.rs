//! Workspace root package.
//!
//! Exists so `cargo-husky` can install its git hooks on the first build; all
//! functionality lives in the `crates/` members.
