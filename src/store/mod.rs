pub mod activity;
pub mod db;
pub mod flashcards;
pub mod reviews;
pub mod topics;

pub use db::Store;
