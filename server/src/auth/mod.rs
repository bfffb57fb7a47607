pub mod admission;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod ratelimit;
