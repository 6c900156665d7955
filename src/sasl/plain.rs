//! SASL/PLAIN (RFC 4616): a single message, `\0username\0password`, sent in the clear. Only
//! appropriate over TLS, which per §1's Non-goals this client does not itself negotiate.

use crate::errors::Result;
use crate::sasl::SaslMechanism;

pub struct PlainMechanism {
    username: String,
    password: String,
    complete: bool,
}

impl PlainMechanism {
    pub fn new(username: &str, password: &str) -> Self {
        PlainMechanism {
            username: username.to_owned(),
            password: password.to_owned(),
            complete: false,
        }
    }
}

impl SaslMechanism for PlainMechanism {
    fn name(&self) -> &'static str {
        "PLAIN"
    }

    fn step(&mut self, _server_response: &[u8]) -> Result<Vec<u8>> {
        self.complete = true;
        let mut msg = Vec::with_capacity(2 + self.username.len() + self.password.len());
        msg.push(0u8);
        msg.extend_from_slice(self.username.as_bytes());
        msg.push(0u8);
        msg.extend_from_slice(self.password.as_bytes());
        Ok(msg)
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_format() {
        let mut m = PlainMechanism::new("alice", "secret");
        let msg = m.step(&[]).unwrap();
        assert_eq!(msg, b"\0alice\0secret");
        assert!(m.is_complete());
    }
}
