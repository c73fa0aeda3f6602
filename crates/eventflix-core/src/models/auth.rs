use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    // Backend sends "rol" on older deployments
    #[serde(default, alias = "rol")]
    pub role: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_accepts_rol_alias() {
        let parsed: LoginResponse =
            serde_json::from_str(r#"{"token":"abc","rol":"organizador","userId":7}"#).unwrap();
        assert_eq!(parsed.token.as_deref(), Some("abc"));
        assert_eq!(parsed.role.as_deref(), Some("organizador"));
        assert_eq!(parsed.user_id, Some(7));
    }

    #[test]
    fn test_login_response_without_token() {
        let parsed: LoginResponse = serde_json::from_str(r#"{"message":"bad credentials"}"#).unwrap();
        assert!(parsed.token.is_none());
        assert_eq!(parsed.message.as_deref(), Some("bad credentials"));
    }

    #[test]
    fn test_register_request_omits_missing_phone() {
        let request = RegisterRequest {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret1".to_string(),
            phone: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("phone"));
    }
}
