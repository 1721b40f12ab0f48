pub mod connections;
pub mod http;
pub mod reload;
pub mod watch;
