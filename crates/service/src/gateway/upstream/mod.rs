pub(crate) mod backoff;
pub(crate) mod config;
pub(crate) mod outcome;
pub(crate) mod protocol;
pub(crate) mod retry;
pub(crate) mod transport;
