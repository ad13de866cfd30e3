//! Shared test utilities for integration tests
//!
//! Provides the fixture project and reply snippets used across
//! multiple test files.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// Minimal project: one single-line file and one multi-line source.
pub fn make_project() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("test.txt")
        .write_str("const foo = 2")
        .expect("write test.txt");

    tmp.child("src/lib.rs")
        .write_str("pub fn a() {}\npub fn b() {}\npub fn c() {}\n")
        .expect("write lib.rs");

    tmp
}

/// Reply with a single REPLACE block, fenced the way models write it.
pub fn replace_reply(start: usize, end: usize, path: &str, body: &str) -> String
{
    format!("REPLACE {start}-{end} {path}\n```\n{body}\n```\n")
}
