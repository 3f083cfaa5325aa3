use quick_from::QuickFrom;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(QuickFrom, Debug)]
pub enum Error {
    // bad user input, the message is shown inline on the form
    Invalid(&'static str),
    // a uniqueness constraint caught what validation let through
    Integrity(String),
    TokenDurationTooBig,
    Unauthorized,
    RouteNotFound,

    #[quick_from]
    Sqlite(rusqlite::Error),

    #[quick_from]
    Time(std::time::SystemTimeError),

    #[quick_from]
    TimeFormat(time::error::Format),

    #[quick_from]
    Token(jsonwebtoken::errors::ErrorKind),

    #[quick_from]
    Password(argon2::Error),

    #[quick_from]
    Render(handlebars::RenderError),

    #[quick_from]
    Template(handlebars::TemplateError),

    #[quick_from]
    Config(config::ConfigError),

    #[quick_from]
    AddrParse(std::net::AddrParseError),
}
