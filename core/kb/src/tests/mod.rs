// Path and File Name : /home/diamondeye/rebuild/core/kb/src/tests/mod.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tests for the knowledge base crate - entity model mapping and in-memory store semantics

#[cfg(test)]
mod model_tests;
