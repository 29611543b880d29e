//! rnnt CLI library surface, exposed for integration tests.

pub mod cli;
pub mod fbank;
pub mod transcribe;
