use crate::api;
use crate::auth::{state::AuthConfig, token::HttpTokenClient};
use crate::cli::actions::Action;
use anyhow::Result;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            issuer,
            frontend_url,
            resource_url,
            token_url,
            client_id,
            client_secret,
            lockout_minutes,
            max_failed_attempts,
        } => {
            // Fail early on malformed URLs instead of at first use
            Url::parse(&frontend_url)?;
            Url::parse(&resource_url)?;
            Url::parse(&token_url)?;

            let config = AuthConfig::new(frontend_url, resource_url)
                .with_issuer(issuer)
                .with_lockout_minutes(lockout_minutes)
                .with_max_failed_attempts(max_failed_attempts);

            let token_client = HttpTokenClient::new(token_url, client_id, client_secret)?;

            api::new(port, config, token_client).await?;
        }
    }

    Ok(())
}
