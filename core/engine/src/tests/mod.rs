// Path and File Name : /home/diamondeye/rebuild/core/engine/src/tests/mod.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tests for the attribution engine - verdicts, scoring, failure semantics
