//! Routing-and-forwarding decision pipeline.
//!
//! Every inbound request or upgrade is turned into a [`WorkingProxy`], run
//! through the policy chain, and only then handed to a forwarder.

pub mod error;
pub mod policy;
pub mod redirect;
pub mod working;

pub use error::ProxyError;
pub use policy::{run_policy_chain, Responder};
pub use redirect::{get_redirect_url, RedirectOverride};
pub use working::WorkingProxy;
