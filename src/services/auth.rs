use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::config::AuthSettings;

/// Capability required to list or size audiences
pub const MANAGE_PANELISTS: &str = "manage_panelists";

/// Reasons a caller is refused. Never shown to the client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Principal {user_id} lacks capability {capability}")]
    MissingCapability { user_id: String, capability: String },
}

/// Claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub role: Option<String>,
    pub capabilities: HashSet<String>,
}

impl Principal {
    pub fn has(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Capability check in front of privileged routes
///
/// Verifies HS256 bearer tokens and expands the token's role into
/// capabilities using the configured role grants.
pub struct AuthGate {
    key: DecodingKey,
    validation: Validation,
    role_grants: HashMap<String, Vec<String>>,
}

impl AuthGate {
    pub fn new(
        secret: &str,
        audience: Option<&str>,
        role_grants: HashMap<String, Vec<String>>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            role_grants,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            &settings.jwt_secret,
            settings.audience.as_deref(),
            settings.roles.clone(),
        )
    }

    /// Resolve a bearer token into a principal
    pub fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;

        let mut capabilities: HashSet<String> = claims.capabilities.into_iter().collect();
        if let Some(grants) = claims.role.as_ref().and_then(|r| self.role_grants.get(r)) {
            capabilities.extend(grants.iter().cloned());
        }

        Ok(Principal {
            user_id: claims.sub,
            role: claims.role,
            capabilities,
        })
    }

    /// Authenticate and, when a capability is named, require it
    pub fn require(
        &self,
        token: Option<&str>,
        capability: Option<&str>,
    ) -> Result<Principal, AuthError> {
        let principal = self.authenticate(token.ok_or(AuthError::MissingToken)?)?;

        match capability {
            Some(cap) if !principal.has(cap) => Err(AuthError::MissingCapability {
                user_id: principal.user_id,
                capability: cap.to_string(),
            }),
            _ => Ok(principal),
        }
    }
}

/// Extract the token from an `Authorization: Bearer ...` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn gate() -> AuthGate {
        let mut roles = HashMap::new();
        roles.insert("admin".to_string(), vec![MANAGE_PANELISTS.to_string()]);
        AuthGate::new(SECRET, None, roles)
    }

    fn token(role: Option<&str>, capabilities: &[&str], exp_offset: i64) -> String {
        let claims = Claims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
            role: role.map(str::to_string),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[test]
    fn test_role_grants_capability() {
        let principal = gate()
            .require(Some(&token(Some("admin"), &[], 3600)), Some(MANAGE_PANELISTS))
            .unwrap();

        assert_eq!(principal.user_id, "user-1");
        assert!(principal.has(MANAGE_PANELISTS));
    }

    #[test]
    fn test_explicit_capability_claim() {
        let result = gate().require(
            Some(&token(Some("panelist"), &[MANAGE_PANELISTS], 3600)),
            Some(MANAGE_PANELISTS),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_capability() {
        let result = gate().require(
            Some(&token(Some("panelist"), &[], 3600)),
            Some(MANAGE_PANELISTS),
        );
        assert!(matches!(result, Err(AuthError::MissingCapability { .. })));
    }

    #[test]
    fn test_no_capability_required() {
        assert!(gate().require(Some(&token(None, &[], 3600)), None).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let result = gate().require(Some(&token(Some("admin"), &[], -3600)), None);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = AuthGate::new("another-secret", None, HashMap::new());
        let result = other.require(Some(&token(Some("admin"), &[], 3600)), None);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(gate().require(None, None), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("BEARER  abc ")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearerabc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
