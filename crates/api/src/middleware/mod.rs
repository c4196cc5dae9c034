//! Request middleware: identity extraction, queue/course context loading,
//! client-ip resolution, and rate limiting.

pub mod context;
pub mod identity;
pub mod rate_limit;
pub mod real_ip;
