pub mod relay;

pub use relay::ws_handler;
