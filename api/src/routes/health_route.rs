/// Liveness probe.
pub async fn health_route() -> &'static str {
    "OK"
}
