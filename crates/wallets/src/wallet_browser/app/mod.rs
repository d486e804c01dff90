pub(crate) mod contents {
    /// Replaced with the per-run session token when the page is served.
    pub(crate) const TOKEN_PLACEHOLDER: &str = "__TRONTRUST_SESSION_TOKEN__";

    pub(crate) const INDEX_HTML: &str = include_str!("assets/index.html");
}
