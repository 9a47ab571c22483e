/// Plain-text greeting, used as a liveness check.
#[utoipa::path(
    get,
    path = "/hello",
    responses(
        (status = OK, description = "Gateway is up", content_type = "text/plain", body = String)
    ))]
pub async fn hello() -> &'static str {
    "Hello from the weather gateway!"
}
