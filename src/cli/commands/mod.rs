use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("tessera")
        .about("Authentication and authorization service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TESSERA_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("issuer")
                .long("issuer")
                .help("Issuer label shown in authenticator apps")
                .default_value("Tessera")
                .env("TESSERA_ISSUER"),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend origin allowed by CORS; https enables secure cookies")
                .default_value("http://localhost:3000")
                .env("TESSERA_FRONTEND_URL"),
        )
        .arg(
            Arg::new("resource-url")
                .long("resource-url")
                .help("Base URL of the protected resource server")
                .env("TESSERA_RESOURCE_URL")
                .required(true),
        )
        .arg(
            Arg::new("token-url")
                .long("token-url")
                .help("Token endpoint of the resource server, example: https://resource.tld/v1/auth/token")
                .env("TESSERA_TOKEN_URL")
                .required(true),
        )
        .arg(
            Arg::new("client-id")
                .long("client-id")
                .help("Client id for the token endpoint")
                .env("TESSERA_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("client-secret")
                .long("client-secret")
                .help("Client secret for the token endpoint")
                .env("TESSERA_CLIENT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("lockout-minutes")
                .long("lockout-minutes")
                .help("Lockout window after too many failed sign-in attempts")
                .default_value("15")
                .env("TESSERA_LOCKOUT_MINUTES")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("max-failed-attempts")
                .long("max-failed-attempts")
                .help("Failed sign-in attempts before lockout")
                .default_value("5")
                .env("TESSERA_MAX_FAILED_ATTEMPTS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("TESSERA_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
