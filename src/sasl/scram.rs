//! SASL/SCRAM-SHA-256 and SASL/SCRAM-SHA-512 (RFC 5802), the full challenge-response exchange:
//! client-first-message, server-first-message (salt + iteration count), client-final-message
//! (channel binding + nonce + proof), server-final-message (signature verification).
//!
//! Channel binding is always the no-TLS-binding GS2 header `"n,,"` (§6) — this client does not
//! bind to a TLS channel. The minimum iteration count accepted from a server is 4096, matching
//! the floor the Java client and most broker deployments enforce.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::{Digest, Sha256, Sha512};

use crate::errors::{ErrorKind, Result};
use crate::sasl::SaslMechanism;

const MIN_ITERATIONS: u32 = 4096;
const GS2_HEADER: &str = "n,,";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "SCRAM-SHA-256",
            Algorithm::Sha512 => "SCRAM-SHA-512",
        }
    }

    fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => Sha256::digest(data).to_vec(),
            Algorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn hmac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .expect("HMAC accepts a key of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Algorithm::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)
                    .expect("HMAC accepts a key of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    fn pbkdf2(self, password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => {
                let mut out = vec![0u8; 32];
                pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
                out
            }
            Algorithm::Sha512 => {
                let mut out = vec![0u8; 64];
                pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out);
                out
            }
        }
    }
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

fn gen_nonce() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 24] = rng.gen();
    BASE64.encode(bytes)
}

/// Parses a SCRAM attribute-value message (`a=b,c=d,...`) into an ordered list of pairs.
fn parse_attrs(s: &str) -> Vec<(char, String)> {
    s.split(',')
        .filter_map(|pair| {
            let mut it = pair.splitn(2, '=');
            let key = it.next()?.chars().next()?;
            let val = it.next()?.to_owned();
            Some((key, val))
        })
        .collect()
}

enum Step {
    SendClientFirst,
    AwaitServerFirst,
    AwaitServerFinal,
    Done,
}

pub struct ScramMechanism {
    algorithm: Algorithm,
    password: String,
    client_nonce: String,
    client_first_bare: String,
    step: Step,
    server_signature: Option<Vec<u8>>,
}

impl ScramMechanism {
    pub fn sha256(username: &str, password: &str) -> Self {
        Self::new(Algorithm::Sha256, username, password)
    }

    pub fn sha512(username: &str, password: &str) -> Self {
        Self::new(Algorithm::Sha512, username, password)
    }

    fn new(algorithm: Algorithm, username: &str, password: &str) -> Self {
        let client_nonce = gen_nonce();
        let client_first_bare = format!("n={},r={}", saslprep_escape(username), client_nonce);
        ScramMechanism {
            algorithm,
            password: password.to_owned(),
            client_nonce,
            client_first_bare,
            step: Step::SendClientFirst,
            server_signature: None,
        }
    }
}

/// Escapes `=` and `,` per RFC 5802 §5.1 (`=2C`, `=3D`); this client does not perform full
/// SASLprep normalization, matching what most lightweight client implementations do in practice.
fn saslprep_escape(s: &str) -> String {
    s.replace('=', "=3D").replace(',', "=2C")
}

impl SaslMechanism for ScramMechanism {
    fn name(&self) -> &'static str {
        self.algorithm.name()
    }

    fn step(&mut self, server_response: &[u8]) -> Result<Vec<u8>> {
        match self.step {
            Step::SendClientFirst => {
                self.step = Step::AwaitServerFirst;
                Ok(format!("{}{}", GS2_HEADER, self.client_first_bare).into_bytes())
            }
            Step::AwaitServerFirst => {
                let server_first = std::str::from_utf8(server_response)
                    .map_err(|e| ErrorKind::Authentication(format!("invalid utf8: {}", e)))?;
                let attrs = parse_attrs(server_first);
                let nonce = attrs
                    .iter()
                    .find(|(k, _)| *k == 'r')
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| ErrorKind::Authentication("missing nonce".into()))?;
                if !nonce.starts_with(&self.client_nonce) {
                    return Err(ErrorKind::Authentication(
                        "server nonce does not extend client nonce".into(),
                    )
                    .into());
                }
                let salt_b64 = attrs
                    .iter()
                    .find(|(k, _)| *k == 's')
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| ErrorKind::Authentication("missing salt".into()))?;
                let salt = BASE64
                    .decode(salt_b64)
                    .map_err(|e| ErrorKind::Authentication(format!("bad salt: {}", e)))?;
                let iterations: u32 = attrs
                    .iter()
                    .find(|(k, _)| *k == 'i')
                    .and_then(|(_, v)| v.parse().ok())
                    .ok_or_else(|| ErrorKind::Authentication("missing iteration count".into()))?;
                if iterations < MIN_ITERATIONS {
                    return Err(ErrorKind::Authentication(format!(
                        "server requested only {} iterations, minimum is {}",
                        iterations, MIN_ITERATIONS
                    ))
                    .into());
                }

                let salted_password = self.algorithm.pbkdf2(self.password.as_bytes(), &salt, iterations);
                let client_key = self.algorithm.hmac(&salted_password, b"Client Key");
                let stored_key = self.algorithm.hash(&client_key);

                let channel_binding = BASE64.encode(GS2_HEADER.as_bytes());
                let client_final_without_proof = format!("c={},r={}", channel_binding, nonce);
                let auth_message = format!(
                    "{},{},{}",
                    self.client_first_bare, server_first, client_final_without_proof
                );

                let client_signature = self.algorithm.hmac(&stored_key, auth_message.as_bytes());
                let client_proof = xor(&client_key, &client_signature);

                let server_key = self.algorithm.hmac(&salted_password, b"Server Key");
                self.server_signature = Some(self.algorithm.hmac(&server_key, auth_message.as_bytes()));

                self.step = Step::AwaitServerFinal;
                Ok(format!(
                    "{},p={}",
                    client_final_without_proof,
                    BASE64.encode(client_proof)
                )
                .into_bytes())
            }
            Step::AwaitServerFinal => {
                let server_final = std::str::from_utf8(server_response)
                    .map_err(|e| ErrorKind::Authentication(format!("invalid utf8: {}", e)))?;
                let attrs = parse_attrs(server_final);
                if let Some((_, err)) = attrs.iter().find(|(k, _)| *k == 'e') {
                    return Err(ErrorKind::Authentication(format!("server rejected: {}", err)).into());
                }
                let v = attrs
                    .iter()
                    .find(|(k, _)| *k == 'v')
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| ErrorKind::Authentication("missing server signature".into()))?;
                let got = BASE64
                    .decode(v)
                    .map_err(|e| ErrorKind::Authentication(format!("bad signature: {}", e)))?;
                if Some(&got) != self.server_signature.as_ref() {
                    return Err(ErrorKind::Authentication(
                        "server signature verification failed".into(),
                    )
                    .into());
                }
                self.step = Step::Done;
                Ok(Vec::new())
            }
            Step::Done => Ok(Vec::new()),
        }
    }

    fn is_complete(&self) -> bool {
        matches!(self.step, Step::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_first_message_carries_gs2_header_and_nonce() {
        let mut m = ScramMechanism::sha256("alice", "secret");
        let msg = String::from_utf8(m.step(&[]).unwrap()).unwrap();
        assert!(msg.starts_with("n,,n=alice,r="));
    }

    #[test]
    fn rejects_iteration_count_below_minimum() {
        let mut m = ScramMechanism::sha256("alice", "secret");
        m.step(&[]).unwrap();
        let server_first = format!("r={}fakeservernonce,s={},i=100", m.client_nonce, BASE64.encode(b"salt"));
        let err = m.step(server_first.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("iteration"));
    }

    #[test]
    fn username_with_special_chars_is_escaped() {
        assert_eq!(saslprep_escape("a,b=c"), "a=2Cb=3Dc");
    }

    #[test]
    fn rejects_server_nonce_not_extending_client_nonce() {
        let mut m = ScramMechanism::sha256("alice", "secret");
        m.step(&[]).unwrap();
        let server_first = format!("r=totally-different,s={},i=4096", BASE64.encode(b"salt"));
        assert!(m.step(server_first.as_bytes()).is_err());
    }
}
