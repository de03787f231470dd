// libs/provider-cell/src/services/catalog.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateServiceRequest, ProviderError, Service, UpdateServiceRequest};

pub struct CatalogService {
    supabase: SupabaseClient,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// All services owned by a provider.
    pub async fn list_services(
        &self,
        provider_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<Service>, ProviderError> {
        let path = format!(
            "/rest/v1/services?provider_id=eq.{}&order=title.asc",
            provider_id
        );
        self.fetch_services(&path, auth_token).await
    }

    /// Only the services a user can book against.
    pub async fn list_active_services(
        &self,
        provider_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<Service>, ProviderError> {
        let path = format!(
            "/rest/v1/services?provider_id=eq.{}&is_active=eq.true&order=title.asc",
            provider_id
        );
        self.fetch_services(&path, auth_token).await
    }

    /// Look up one service scoped to its owning provider. Used by the
    /// booking pipeline to verify the service/provider pairing.
    pub async fn find_provider_service(
        &self,
        service_id: Uuid,
        provider_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<Service>, ProviderError> {
        let path = format!(
            "/rest/v1/services?id=eq.{}&provider_id=eq.{}",
            service_id, provider_id
        );
        let mut services = self.fetch_services(&path, auth_token).await?;
        Ok(services.pop())
    }

    pub async fn create_service(
        &self,
        provider_id: Uuid,
        request: CreateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, ProviderError> {
        debug!("Creating service for provider: {}", provider_id);

        validate_duration(request.duration_minutes)?;
        if request.title.trim().is_empty() {
            return Err(ProviderError::InvalidService("title must not be empty".to_string()));
        }

        let service_data = json!({
            "id": Uuid::new_v4(),
            "provider_id": provider_id,
            "title": request.title,
            "category": request.category,
            "description": request.description,
            "price": request.price,
            "duration_minutes": request.duration_minutes,
            "is_active": true,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/services",
            Some(auth_token),
            Some(service_data),
            Some(headers),
        ).await.map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProviderError::DatabaseError("Failed to create service".to_string()));
        }

        let service: Service = serde_json::from_value(result[0].clone())
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse service: {}", e)))?;

        Ok(service)
    }

    pub async fn update_service(
        &self,
        provider_id: Uuid,
        service_id: Uuid,
        request: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, ProviderError> {
        debug!("Updating service {} for provider {}", service_id, provider_id);

        let mut update_data = serde_json::Map::new();

        if let Some(title) = request.title {
            if title.trim().is_empty() {
                return Err(ProviderError::InvalidService("title must not be empty".to_string()));
            }
            update_data.insert("title".to_string(), json!(title));
        }
        if let Some(category) = request.category {
            update_data.insert("category".to_string(), json!(category));
        }
        if let Some(description) = request.description {
            update_data.insert("description".to_string(), json!(description));
        }
        if let Some(price) = request.price {
            update_data.insert("price".to_string(), json!(price));
        }
        if let Some(duration) = request.duration_minutes {
            validate_duration(duration)?;
            update_data.insert("duration_minutes".to_string(), json!(duration));
        }
        if let Some(is_active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/services?id=eq.{}&provider_id=eq.{}",
            service_id, provider_id
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProviderError::ServiceNotFound);
        }

        let service: Service = serde_json::from_value(result[0].clone())
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse service: {}", e)))?;

        Ok(service)
    }

    pub async fn delete_service(
        &self,
        provider_id: Uuid,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ProviderError> {
        debug!("Deleting service {} for provider {}", service_id, provider_id);

        let path = format!(
            "/rest/v1/services?id=eq.{}&provider_id=eq.{}",
            service_id, provider_id
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProviderError::ServiceNotFound);
        }

        Ok(())
    }

    async fn fetch_services(
        &self,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<Service>, ProviderError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            auth_token,
            None,
        ).await.map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let services: Vec<Service> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Service>, _>>()
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse services: {}", e)))?;

        Ok(services)
    }
}

fn validate_duration(duration_minutes: i32) -> Result<(), ProviderError> {
    if duration_minutes <= 0 || duration_minutes > crate::timeslot::MINUTES_PER_DAY {
        return Err(ProviderError::InvalidService(
            "duration_minutes must be between 1 and 1440".to_string(),
        ));
    }
    Ok(())
}
