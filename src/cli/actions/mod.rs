pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        issuer: String,
        frontend_url: String,
        resource_url: String,
        token_url: String,
        client_id: String,
        client_secret: SecretString,
        lockout_minutes: i64,
        max_failed_attempts: u32,
    },
}
