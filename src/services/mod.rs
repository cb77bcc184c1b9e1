pub mod bootstrap_service;
pub mod broadcast_service;
pub mod health_service;
pub mod ping_service;
pub mod price_service;

pub use health_service::HealthService;
pub use price_service::PriceService;
