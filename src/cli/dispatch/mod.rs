use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .map(std::string::ToString::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
    };

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        issuer: required("issuer")?,
        frontend_url: required("frontend-url")?,
        resource_url: required("resource-url")?,
        token_url: required("token-url")?,
        client_id: required("client-id")?,
        client_secret: SecretString::from(required("client-secret")?),
        lockout_minutes: matches
            .get_one::<i64>("lockout-minutes")
            .copied()
            .unwrap_or(15),
        max_failed_attempts: matches
            .get_one::<u32>("max-failed-attempts")
            .copied()
            .unwrap_or(5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn handler_builds_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "tessera",
            "--resource-url",
            "https://resource.tld",
            "--token-url",
            "https://resource.tld/v1/auth/token",
            "--client-id",
            "tessera",
            "--client-secret",
            "secret",
            "--lockout-minutes",
            "30",
            "--max-failed-attempts",
            "3",
        ]);

        let Action::Server {
            port,
            issuer,
            frontend_url,
            resource_url,
            token_url,
            client_id,
            client_secret,
            lockout_minutes,
            max_failed_attempts,
        } = handler(&matches).unwrap();

        assert_eq!(port, 8080);
        assert_eq!(issuer, "Tessera");
        assert_eq!(frontend_url, "http://localhost:3000");
        assert_eq!(resource_url, "https://resource.tld");
        assert_eq!(token_url, "https://resource.tld/v1/auth/token");
        assert_eq!(client_id, "tessera");
        assert_eq!(client_secret.expose_secret(), "secret");
        assert_eq!(lockout_minutes, 30);
        assert_eq!(max_failed_attempts, 3);
    }
}
