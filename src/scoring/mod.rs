pub mod phrase;
pub mod ranks;
pub mod scorer;
