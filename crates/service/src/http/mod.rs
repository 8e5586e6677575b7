pub(crate) mod chat_route;
mod responses;
mod router;
pub(crate) mod server;
