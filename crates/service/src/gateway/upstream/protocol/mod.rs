pub(crate) mod chat_proxy;
pub(crate) mod gemini;
