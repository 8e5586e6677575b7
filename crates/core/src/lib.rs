pub mod chat;
pub mod completion;
pub mod followups;
pub mod locale;
pub mod prompt;

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
