use std::path::PathBuf;

use crate::token::Token;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Config {
    /// `User-Agent` sent with every catalog request.
    pub user_agent: String,

    /// OAuth token; anonymous requests are made without one.
    pub token: Option<Token>,

    /// Directory that downloaded tracks are saved into.
    pub output_dir: PathBuf,
}

impl Config {
    /// Default directory for downloaded tracks, relative to the working
    /// directory.
    pub const DEFAULT_OUTPUT_DIR: &'static str = "./downloads";

    /// The catalog expects this exact `User-Agent`.
    pub const USER_AGENT: &'static str = "Yandex-Music-API";

    #[must_use]
    pub fn with_token(token: Option<Token>) -> Self {
        trace!("user agent: {}", Self::USER_AGENT);

        Self {
            user_agent: Self::USER_AGENT.to_owned(),

            token,

            output_dir: PathBuf::from(Self::DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_token(None)
    }
}
