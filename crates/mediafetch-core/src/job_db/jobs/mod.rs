//! Job CRUD split by direction: `read` for queries, `write` for state changes.

mod read;
mod write;
