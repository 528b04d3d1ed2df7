pub mod health;
pub mod links;
pub mod pages;
pub mod redirect;
pub mod response;

pub use health::{HealthService, HealthState, health_routes};
pub use links::{LinkView, LinksService, json_config, links_routes};
pub use pages::{OutcomePages, PagesService, page_routes};
pub use redirect::{RedirectService, redirect_routes};
pub use response::{ApiResponse, ErrorCode};
