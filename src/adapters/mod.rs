// Adapters layer: concrete implementations of the search port.

pub mod redbiom;
pub mod webdis;

pub use redbiom::RedbiomBackend;
pub use webdis::WebdisClient;
