// libs/provider-cell/src/services/provider.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Provider, ProviderDashboard, ProviderError, PublicProviderProfile, WeeklyTemplate,
};
use crate::services::catalog::CatalogService;

pub struct ProviderService {
    supabase: SupabaseClient,
    catalog: CatalogService,
}

impl ProviderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            catalog: CatalogService::new(config),
        }
    }

    /// Fetch a provider row by id.
    pub async fn get_provider(
        &self,
        provider_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Provider, ProviderError> {
        debug!("Fetching provider: {}", provider_id);

        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProviderError::NotFound);
        }

        let provider: Provider = serde_json::from_value(result[0].clone())
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse provider: {}", e)))?;

        Ok(provider)
    }

    /// Public profile: provider plus their active services. Blocked
    /// providers are not exposed.
    pub async fn get_public_profile(
        &self,
        provider_id: Uuid,
    ) -> Result<PublicProviderProfile, ProviderError> {
        let provider = self.get_provider(provider_id, None).await?;

        if provider.is_blocked {
            return Err(ProviderError::NotFound);
        }

        let services = self.catalog.list_active_services(provider_id, None).await?;

        Ok(PublicProviderProfile {
            id: provider.id,
            name: provider.name,
            bio: provider.bio,
            specialization: provider.specialization,
            available: provider.available,
            services,
        })
    }

    /// The provider's recurring weekly template.
    pub async fn get_weekly_template(
        &self,
        provider_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<WeeklyTemplate, ProviderError> {
        let provider = self.get_provider(provider_id, auth_token).await?;
        Ok(provider.available)
    }

    /// Replace the weekly template wholesale. There is no per-day patch;
    /// the stored value is overwritten with the validated request.
    pub async fn replace_weekly_template(
        &self,
        provider_id: Uuid,
        template: WeeklyTemplate,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        debug!("Replacing weekly template for provider: {}", provider_id);

        template.validate().map_err(ProviderError::InvalidTemplate)?;

        let update_data = json!({
            "available": template,
            "updated_at": chrono::Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProviderError::NotFound);
        }

        let provider: Provider = serde_json::from_value(result[0].clone())
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse provider: {}", e)))?;

        Ok(provider)
    }

    /// Summary counts for the provider dashboard.
    pub async fn get_dashboard(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<ProviderDashboard, ProviderError> {
        let total_services = self.count(
            &format!("/rest/v1/services?provider_id=eq.{}&select=count", provider_id),
            auth_token,
        ).await?;

        let upcoming_appointments = self.count(
            &format!(
                "/rest/v1/appointments?provider_id=eq.{}&status=eq.upcoming&select=count",
                provider_id
            ),
            auth_token,
        ).await?;

        let total_appointments = self.count(
            &format!("/rest/v1/appointments?provider_id=eq.{}&select=count", provider_id),
            auth_token,
        ).await?;

        Ok(ProviderDashboard {
            total_services,
            upcoming_appointments,
            total_appointments,
        })
    }

    async fn count(&self, path: &str, auth_token: &str) -> Result<u64, ProviderError> {
        let result: Value = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let count = result
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|obj| obj.get("count"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        Ok(count)
    }
}
