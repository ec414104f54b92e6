pub mod dns;
pub mod suffix;
