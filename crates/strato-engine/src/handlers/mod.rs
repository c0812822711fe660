//! One handler per action, grouped by resource family

pub mod instance;
pub mod keypair;
pub mod resource;

use serde_json::Value;

/// A handler's result: the response root element name and the plain
/// nested tree handed to the markup encoder. Every tree carries the
/// fixed request-correlation token.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub root: &'static str,
    pub body: Value,
}
