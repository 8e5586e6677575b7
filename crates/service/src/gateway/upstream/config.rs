pub(crate) const DEFAULT_UPSTREAM_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta";
const CHAT_ROUTE_PATH: &str = "/api/chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Call the provider's generateContent endpoint with the server-held key.
    #[default]
    Direct,
    /// Forward to another assistant proxy that speaks the chat contract.
    Proxy,
}

impl TransportMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" | "gemini" | "provider" => Some(TransportMode::Direct),
            "proxy" | "chat_proxy" | "chat-proxy" => Some(TransportMode::Proxy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Direct => "direct",
            TransportMode::Proxy => "proxy",
        }
    }
}

pub(crate) fn normalize_upstream_base_url(base: &str) -> String {
    let mut normalized = base.trim().trim_end_matches('/').to_string();
    let lower = normalized.to_ascii_lowercase();
    if lower.starts_with("https://generativelanguage.googleapis.com")
        && !lower.contains("/v1")
    {
        // 中文注释：只填域名时补上 API 版本段，避免请求落到根路径 404。
        normalized = format!("{normalized}/v1beta");
    }
    normalized
}

/// A bare origin (`http://host:port`) gets the chat route appended; full URLs pass through.
pub(crate) fn normalize_proxy_endpoint(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let after_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    if after_scheme.contains('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}{CHAT_ROUTE_PATH}")
    }
}
