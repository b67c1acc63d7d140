pub mod artifacts;
pub mod handlers;
pub mod middleware;
pub mod processes;
pub mod routes;

pub use routes::create_router;
