//! Signing methods and the registry that names them
//!
//! A [`SigningMethod`] turns a signing string into a base64url signature and
//! back. Methods are looked up by their `alg` name through a
//! [`MethodRegistry`] that is built once at startup and shared read-only.

mod hmac_method;
mod method;
mod registry;

pub use hmac_method::{HashAlgorithm, HmacMethod};
pub use method::SigningMethod;
pub use registry::{MethodConstructor, MethodRegistry};
