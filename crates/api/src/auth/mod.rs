//! Session cookies and the OIDC login flow.

pub mod oidc;
pub mod session;
