pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{base_origin, cookie_domain, is_secure_target, is_valid_url, resolve_href};
