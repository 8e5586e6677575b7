pub(crate) mod upstream;
#[path = "core/runtime_config.rs"]
mod runtime_config;
#[path = "request/chat_flow.rs"]
mod chat_flow;

pub use chat_flow::{build_invoker, ChatError, ChatGateway};
pub use runtime_config::{ConfigError, GatewayConfig};
