// tests/property/mod.rs

mod expansion;
mod resolution;
mod watch_session;
