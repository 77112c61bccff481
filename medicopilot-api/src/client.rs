//! Backend API client implementation

use medicopilot_core::{ErrorContext, MediError, MediResult, Medicine, Treatment, TreatmentInput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Configuration for the backend API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the backend
    pub base_url: String,
    /// Signed token attached as a bearer credential, when logged in
    pub identity: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Additional headers
    pub headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            identity: None,
            timeout_seconds: 30,
            user_agent: "medicopilot/0.1".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    /// Create a configuration pointing at a backend
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Attach a session identity to every request
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set additional header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Login response: the newer backend returns a signed token, the older one a
/// raw user id. Either value is the identity the session manager persists.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

impl LoginResponse {
    /// The identity value to hand to the session manager, preferring the
    /// token-shaped one
    pub fn identity(&self) -> Option<&str> {
        self.token.as_deref().or(self.user_id.as_deref())
    }
}

/// Registration response
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    phone: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    phone: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AddMedicineRequest<'a> {
    name: &'a str,
    quantity: u32,
    expiry_date: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct AddMedicineResponse {
    medicine_id: String,
}

#[derive(Debug, Deserialize)]
struct AddTreatmentResponse {
    treatment_id: String,
}

#[derive(Debug, Deserialize)]
struct ExtractTextResponse {
    extracted_text: String,
}

#[derive(Debug, Deserialize)]
struct BackendError {
    error: String,
}

/// Backend API client
pub struct MediApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
}

impl MediApiClient {
    /// Create a new API client
    pub fn new(config: ApiClientConfig) -> MediResult<Self> {
        let client = create_http_client(&config)?;

        info!("Created API client for {}", config.base_url);

        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn auth_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(ref identity) = self.config.identity {
            if let Ok(auth_value) =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", identity))
            {
                headers.insert(reqwest::header::AUTHORIZATION, auth_value);
            }
        }

        headers
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> MediResult<T> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .headers(self.auth_headers())
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        self.parse_response(response, endpoint).await
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> MediResult<T> {
        let url = self.url(endpoint);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(body)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        self.parse_response(response, endpoint).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> MediResult<T> {
        if !response.status().is_success() {
            return Err(handle_response_error(response, operation).await);
        }

        response.json::<T>().await.map_err(|e| MediError::Api {
            message: format!("Failed to parse {} response: {}", operation, e),
            status: None,
            context: ErrorContext::new("api_client").with_operation(operation),
        })
    }

    /// Check backend reachability
    pub async fn test_connection(&self) -> MediResult<()> {
        let _: serde_json::Value = self.get_json("test-connection", &[]).await?;
        Ok(())
    }

    /// Register a new user
    pub async fn register(
        &self,
        name: &str,
        phone: &str,
        password: &str,
    ) -> MediResult<RegisterResponse> {
        let request = RegisterRequest {
            name,
            phone,
            password,
        };
        let response: RegisterResponse = self.post_json("register", &request).await?;
        info!(user_id = %response.user_id, "User registered");
        Ok(response)
    }

    /// Log in and obtain a session identity
    pub async fn login(&self, phone: &str, password: &str) -> MediResult<LoginResponse> {
        let request = LoginRequest { phone, password };
        let response: LoginResponse = self.post_json("login", &request).await?;

        if response.identity().is_none() {
            return Err(MediError::Api {
                message: "Login response carried neither token nor user_id".to_string(),
                status: None,
                context: ErrorContext::new("api_client")
                    .with_operation("login")
                    .with_suggestion("Check the backend revision against this client"),
            });
        }

        info!("User logged in");
        Ok(response)
    }

    /// Add a medicine to the user's cabinet
    pub async fn add_medicine(&self, user_id: &str, medicine: &Medicine) -> MediResult<String> {
        let request = AddMedicineRequest {
            name: &medicine.name,
            quantity: medicine.quantity,
            expiry_date: &medicine.expiry_date,
            user_id,
        };
        let response: AddMedicineResponse = self.post_json("add_medicine", &request).await?;
        info!(medicine_id = %response.medicine_id, "Medicine added");
        Ok(response.medicine_id)
    }

    /// Create a treatment schedule
    pub async fn add_treatment(&self, treatment: &TreatmentInput) -> MediResult<String> {
        let response: AddTreatmentResponse = self.post_json("add_treatment", treatment).await?;
        info!(treatment_id = %response.treatment_id, "Treatment added");
        Ok(response.treatment_id)
    }

    /// Fetch the user's treatment schedules
    pub async fn get_treatments(&self, user_id: &str) -> MediResult<Vec<Treatment>> {
        self.get_json("treatments", &[("user_id", user_id)]).await
    }

    /// Upload a photo of a medicine label and get the recognized text back
    pub async fn extract_text(&self, image_path: &Path) -> MediResult<String> {
        let bytes = tokio::fs::read(image_path).await?;

        let mime = match image_path.extension().and_then(|e| e.to_str()) {
            Some("png") => "image/png",
            _ => "image/jpeg",
        };

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("medicine.jpg")
            .mime_str(mime)
            .map_err(|e| MediError::Api {
                message: format!("Invalid image content type: {}", e),
                status: None,
                context: ErrorContext::new("api_client").with_operation("extract_text"),
            })?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let url = self.url("extract-text");
        debug!("POST {} (multipart)", url);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let response: ExtractTextResponse = self.parse_response(response, "extract_text").await?;
        info!(chars = response.extracted_text.len(), "Label text extracted");
        Ok(response.extracted_text)
    }
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(config: &ApiClientConfig) -> MediResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            MediError::Api {
                message: format!("Invalid user agent: {}", e),
                status: None,
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    for (key, value) in &config.headers {
        let header_name =
            reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| MediError::Api {
                message: format!("Invalid header name '{}': {}", key, e),
                status: None,
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        let header_value =
            reqwest::header::HeaderValue::from_str(value).map_err(|e| MediError::Api {
                message: format!("Invalid header value for '{}': {}", key, e),
                status: None,
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        headers.insert(header_name, header_value);
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| MediError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })?;

    Ok(client)
}

fn request_error(url: &str, e: reqwest::Error) -> MediError {
    MediError::Network {
        message: format!("Failed to reach backend at {}: {}", url, e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("api_client")
            .with_operation("send_request")
            .with_suggestion("Check network connectivity and the configured base URL"),
    }
}

/// Map a non-success HTTP response onto the error taxonomy, keeping the
/// backend's own error message when it sends one
pub(crate) async fn handle_response_error(
    response: reqwest::Response,
    operation: &str,
) -> MediError {
    let status = response.status();
    let url = response.url().clone();

    let body = response.text().await.unwrap_or_default();
    let backend_message = serde_json::from_str::<BackendError>(&body)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        });

    if status.as_u16() == 401 {
        return MediError::Authentication {
            message: backend_message,
            context: ErrorContext::new("api_client")
                .with_operation(operation)
                .with_suggestion("Log in again to refresh your session"),
        };
    }

    if status.as_u16() == 404 {
        return MediError::NotFound {
            resource: url.to_string(),
            context: ErrorContext::new("api_client")
                .with_operation(operation)
                .with_suggestion("Check the backend base URL and route"),
        };
    }

    MediError::Api {
        message: format!("HTTP {} error for {}: {}", status.as_u16(), url, backend_message),
        status: Some(status.as_u16()),
        context: ErrorContext::new("api_client")
            .with_operation(operation)
            .with_suggestion(match status.as_u16() {
                400 => "Check the submitted fields",
                _ => "Check network connectivity and backend status",
            }),
    }
}
