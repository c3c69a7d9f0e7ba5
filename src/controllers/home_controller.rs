use serde::Serialize;

use crate::utils::response::ApiResponse;

#[derive(Serialize)]
pub struct ServiceInfo {
    service: &'static str,
    version: &'static str,
}

pub async fn index() -> ApiResponse<ServiceInfo> {
    ApiResponse::success(
        ServiceInfo {
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
        "Showtime API is running",
    )
}
