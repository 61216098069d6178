pub mod typesense;

pub use typesense::{TypesenseConfig, TypesenseStore};
