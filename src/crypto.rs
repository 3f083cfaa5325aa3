use std::time;

use jsonwebtoken as jwt;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::models::Identity;
use crate::{Error, Result};

pub fn encode_password(pass : &[u8]) -> Result<String> {
    let mut salt = [0u8; 32];
    thread_rng().fill(&mut salt);

    tokio::task::block_in_place(|| {
        Ok(argon2::hash_encoded(pass, &salt, &Default::default())?)
    })
}

pub fn verify_password(encoded : &str, pass : &[u8]) -> Result<bool> {
    tokio::task::block_in_place(|| Ok(argon2::verify_encoded(encoded, pass)?))
}

/// Signed identity carried in the session cookie.
pub struct Token {
    pub iss :  String,
    pub aud :  String,
    pub sub :  String,
    pub name : String,
}

#[derive(Serialize, Deserialize)]
struct TokenFull {
    iss :  String,
    aud :  String,
    sub :  String,
    name : String,
    iat :  u64,
    exp :  u64,
}

impl Token {
    pub fn for_identity(identity : &Identity, server_name : &str) -> Self {
        Self {
            iss :  server_name.to_string(),
            aud :  server_name.to_string(),
            sub :  identity.user_id.to_string(),
            name : identity.username.clone(),
        }
    }

    pub fn issue(
        &self,
        secret : &[u8],
        exp_duration : time::Duration,
    ) -> Result<String> {
        let now = time::SystemTime::now();

        let iat = now.duration_since(time::UNIX_EPOCH)?.as_secs();

        let exp = now
            .checked_add(exp_duration)
            .ok_or(Error::TokenDurationTooBig)?
            .duration_since(time::UNIX_EPOCH)?
            .as_secs();

        let tok = TokenFull {
            iss : self.iss.clone(),
            aud : self.aud.clone(),
            sub : self.sub.clone(),
            name : self.name.clone(),
            iat,
            exp,
        };

        Ok(jwt::encode(
            &Default::default(),
            &tok,
            &jwt::EncodingKey::from_secret(secret),
        )
        .map_err(|err| err.into_kind())?)
    }

    pub fn validate(token : &str, secret : &[u8], iss : &str) -> Result<Self> {
        let mut validation = jwt::Validation::default();
        validation.set_issuer(&[iss]);
        validation.set_audience(&[iss]);

        let tok : TokenFull = jwt::decode(
            token,
            &jwt::DecodingKey::from_secret(secret),
            &validation,
        )
        .map_err(|err| err.into_kind())?
        .claims;

        Ok(Self {
            iss :  tok.iss,
            aud :  tok.aud,
            sub :  tok.sub,
            name : tok.name,
        })
    }

    pub fn identity(&self) -> Result<Identity> {
        let user_id = self.sub.parse().map_err(|_| Error::Unauthorized)?;

        Ok(Identity {
            user_id,
            username : self.name.clone(),
        })
    }
}
