//! SASL mechanisms the connection layer can speak during the handshake (§4.4, §6).

pub mod oauth_bearer;
pub mod plain;
pub mod scram;

use crate::errors::Result;

/// One SASL exchange round. A mechanism may need more than one round (SCRAM does); the
/// connection layer keeps calling `step` with the broker's last response until `is_complete`.
pub trait SaslMechanism: Send {
    fn name(&self) -> &'static str;
    /// Produces the next message to send the broker, given its last response (empty on the
    /// first call).
    fn step(&mut self, server_response: &[u8]) -> Result<Vec<u8>>;
    fn is_complete(&self) -> bool;
}

#[derive(Debug, Clone)]
pub enum Credentials {
    Plain { username: String, password: String },
    OAuthBearer { token: String },
    ScramSha256 { username: String, password: String },
    ScramSha512 { username: String, password: String },
}

impl Credentials {
    pub fn mechanism_name(&self) -> &'static str {
        match self {
            Credentials::Plain { .. } => "PLAIN",
            Credentials::OAuthBearer { .. } => "OAUTHBEARER",
            Credentials::ScramSha256 { .. } => "SCRAM-SHA-256",
            Credentials::ScramSha512 { .. } => "SCRAM-SHA-512",
        }
    }

    pub fn build(&self) -> Box<dyn SaslMechanism> {
        match self {
            Credentials::Plain { username, password } => {
                Box::new(plain::PlainMechanism::new(username, password))
            }
            Credentials::OAuthBearer { token } => {
                Box::new(oauth_bearer::OAuthBearerMechanism::new(token))
            }
            Credentials::ScramSha256{ username, password } => {
                Box::new(scram::ScramMechanism::sha256(username, password))
            }
            Credentials::ScramSha512 { username, password } => {
                Box::new(scram::ScramMechanism::sha512(username, password))
            }
        }
    }
}
