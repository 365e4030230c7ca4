#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod error;
pub mod rounds;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use auth::{
    AuthService, AuthSnapshot, IdentityProvider, LoginHandshake, ProviderResponse, TokenGrant,
    TwitchConfig, TwitchProvider,
};
pub use error::{AppServicesError, AuthFlowError, RoundFlowError};
pub use rounds::{
    HostRegistry, OptionView, QuestionView, RoundHost, RoundLoopService, RoundSnapshot, ScoreRow,
};
