pub mod handlers;

// Re-export the route table for the binary and the HTTP tests
pub use handlers::configure;
