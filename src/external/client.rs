use std::sync::LazyLock;
use std::time::Duration;

/// Global HTTP client instance shared by the collector and the webhook
/// provider.
///
/// Initialized lazily on first access and reused for connection pooling and
/// DNS caching. Uses Rustls for TLS.
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        // Timeouts
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        // Compression
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .zstd(true)
        .use_rustls_tls()
        .user_agent(concat!("clubwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client")
});
