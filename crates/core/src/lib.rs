pub mod config;
pub mod domain;
pub mod errors;
pub mod roll;

pub use domain::oauth::OAuthState;
pub use domain::team::{redact_token, Team, TeamId};
pub use errors::{ApplicationError, InterfaceError};
pub use roll::{
    evaluate_roll, DieSource, FixedDieSource, RngDieSource, RollContext, RollError, RollOutcome,
    RollRequest, RollResponse, RolledMessage,
};
