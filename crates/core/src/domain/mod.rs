pub mod oauth;
pub mod team;
