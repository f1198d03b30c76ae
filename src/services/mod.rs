pub mod admission;
pub mod directory;
pub mod mail;
pub mod notify;
pub mod slots;
