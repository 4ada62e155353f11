//! Configuration access port trait.
//!
//! Lookups never fail: a missing or unparseable value yields the caller's
//! default, and validation is done separately by
//! [`config_validation`](crate::domain::config_validation).

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
