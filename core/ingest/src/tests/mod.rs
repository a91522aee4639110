// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/tests/mod.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tests for the ingestion pipeline - normalization, identity resolution, link building, batched writes and end-to-end runs

#[cfg(test)]
mod resolver_tests;
#[cfg(test)]
mod linker_tests;
