//! Token restriction and license response templates.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::error::TemplateError;

/// Length of generated symmetric verification keys.
pub const SYMMETRIC_KEY_LEN: usize = 64;

/// Claim type identifying the content key a token grants access to.
pub const CONTENT_KEY_ID_CLAIM_TYPE: &str = "urn:microsoft:azure:mediaservices:contentkeyidentifier";

/// A symmetric key tokens are signed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricVerificationKey {
    /// Base64-encoded key bytes.
    pub key_value: String,
}

impl SymmetricVerificationKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
        rand::rng().fill(&mut bytes[..]);
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            key_value: STANDARD.encode(bytes),
        }
    }
}

/// A claim a token must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaim {
    pub claim_type: String,
    /// Required value; `None` accepts any value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_value: Option<String>,
}

impl TokenClaim {
    pub fn new(claim_type: impl Into<String>, claim_value: Option<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            claim_value,
        }
    }

    /// The token must name the content key it is used for.
    pub fn content_key_identifier() -> Self {
        Self::new(CONTENT_KEY_ID_CLAIM_TYPE, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    #[default]
    Swt,
    Jwt,
}

/// Requirements a license request token must meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRestrictionTemplate {
    pub primary_verification_key: SymmetricVerificationKey,
    pub alternate_verification_keys: Vec<SymmetricVerificationKey>,
    pub audience: String,
    pub issuer: String,
    pub required_claims: Vec<TokenClaim>,
    pub token_type: TokenType,
}

impl TokenRestrictionTemplate {
    /// Builds a template with a fresh primary key, one fresh alternate key,
    /// and the content-key-identifier claim.
    pub fn new(issuer: &str, audience: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            primary_verification_key: SymmetricVerificationKey::generate(),
            alternate_verification_keys: vec![SymmetricVerificationKey::generate()],
            audience: absolute_url("audience", audience)?,
            issuer: absolute_url("issuer", issuer)?,
            required_claims: vec![TokenClaim::content_key_identifier()],
            token_type: TokenType::default(),
        })
    }

    pub fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    pub fn with_claim(mut self, claim: TokenClaim) -> Self {
        self.required_claims.push(claim);
        self
    }
}

fn absolute_url(field: &'static str, value: &str) -> Result<String, TemplateError> {
    let invalid = |reason: String| TemplateError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("not an absolute URL".to_string()));
    }
    Ok(url.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    #[default]
    NonPersistent,
    Persistent,
}

/// Rights granted by one issued license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTemplate {
    #[serde(default)]
    pub license_type: LicenseType,
    #[serde(default)]
    pub allow_test_devices: bool,
    /// Seconds the license stays valid after it is first used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_expiration_secs: Option<u64>,
}

/// What the license service returns for an authorized request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseResponseTemplate {
    pub license_templates: Vec<LicenseTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_custom_data: Option<String>,
}

impl LicenseResponseTemplate {
    /// A response with a single default license.
    pub fn single() -> Self {
        Self {
            license_templates: vec![LicenseTemplate::default()],
            response_custom_data: None,
        }
    }
}

/// Serializes a token restriction template to an opaque string.
pub fn serialize_token_template(
    template: &TokenRestrictionTemplate,
) -> Result<String, TemplateError> {
    Ok(serde_json::to_string(template)?)
}

/// Serializes a license response template to an opaque string.
pub fn serialize_license_template(
    template: &LicenseResponseTemplate,
) -> Result<String, TemplateError> {
    if template.license_templates.is_empty() {
        return Err(TemplateError::NoLicenseTemplates);
    }
    Ok(serde_json::to_string(template)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_64_bytes_and_distinct() {
        let template =
            TokenRestrictionTemplate::new("http://issuer.example/", "https://audience.example/").unwrap();

        let primary = STANDARD
            .decode(&template.primary_verification_key.key_value)
            .unwrap();
        assert_eq!(primary.len(), SYMMETRIC_KEY_LEN);
        assert_eq!(template.alternate_verification_keys.len(), 1);
        assert_ne!(
            template.primary_verification_key,
            template.alternate_verification_keys[0]
        );
        assert_eq!(
            template.required_claims,
            vec![TokenClaim::content_key_identifier()]
        );
    }

    #[test]
    fn test_relative_issuer_is_rejected() {
        let err = TokenRestrictionTemplate::new("not a url", "https://audience.example/").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidUrl { field: "issuer", .. }));

        let err = TokenRestrictionTemplate::new("https://issuer.example/", "mailto:x").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidUrl { field: "audience", .. }));
    }

    #[test]
    fn test_token_template_serializes_claims_and_type() {
        let template = TokenRestrictionTemplate::new("https://issuer.example/", "https://audience.example/")
            .unwrap()
            .with_token_type(TokenType::Jwt);

        let json = serialize_token_template(&template).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["token_type"], "JWT");
        assert_eq!(value["issuer"], "https://issuer.example/");
        assert_eq!(
            value["required_claims"][0]["claim_type"],
            CONTENT_KEY_ID_CLAIM_TYPE
        );
    }

    #[test]
    fn test_license_template_requires_a_license() {
        let err = serialize_license_template(&LicenseResponseTemplate::default()).unwrap_err();
        assert!(matches!(err, TemplateError::NoLicenseTemplates));

        let json = serialize_license_template(&LicenseResponseTemplate::single()).unwrap();
        assert!(json.contains("non_persistent"));
    }
}
