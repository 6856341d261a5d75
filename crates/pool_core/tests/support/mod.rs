pub mod books;
pub mod schedule;
pub mod world;
