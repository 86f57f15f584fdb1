//! Configuration module

mod site;

pub use site::ConverterConfig;
pub use site::SiteConfig;
