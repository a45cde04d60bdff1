//! Data models for the Bookshelf server

pub mod book;

pub use book::{Book, BookPayload};
