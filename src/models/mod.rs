//! Data models for the library server

pub mod book;

pub use book::{Book, BookEntity};
