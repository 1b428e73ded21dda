//! # docchat core
//!
//! Runtime-agnostic logic shared by the docchat assistant: document and
//! chunk models, the overlapping window chunker, the vector store
//! abstraction with its in-memory implementation, and the embedding trait.
//!
//! This crate performs no filesystem or network I/O. Providers that talk
//! to models, and the code that reads files, live in the `docchat` crate.

pub mod chunk;
pub mod embedding;
pub mod models;
pub mod store;
