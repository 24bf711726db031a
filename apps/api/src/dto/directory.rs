use conforma_application::{OrganisationInput, OrganisationRecord, SiteInput, SiteRecord};
use conforma_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Incoming payload for organisation creation and updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-organisation-request.ts"
)]
pub struct SaveOrganisationRequest {
    pub name: String,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
}

impl From<SaveOrganisationRequest> for OrganisationInput {
    fn from(payload: SaveOrganisationRequest) -> Self {
        Self {
            name: payload.name,
            description: payload.description,
            sector: payload.sector,
            country: payload.country,
        }
    }
}

/// API representation of an organisation.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/organisation-response.ts"
)]
pub struct OrganisationResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub created_at: String,
}

impl From<OrganisationRecord> for OrganisationResponse {
    fn from(record: OrganisationRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            description: record.description,
            sector: record.sector,
            country: record.country,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Incoming payload for site creation and updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-site-request.ts"
)]
pub struct SaveSiteRequest {
    pub organisation_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl SaveSiteRequest {
    /// Converts the payload into a validated service input.
    pub fn into_input(self) -> AppResult<SiteInput> {
        let organisation_id = self
            .organisation_id
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                Uuid::parse_str(value.as_str()).map_err(|error| {
                    AppError::Validation(format!("invalid organisation id: {error}"))
                })
            })
            .transpose()?;

        Ok(SiteInput {
            organisation_id,
            name: self.name,
            address: self.address,
            city: self.city,
            country: self.country,
        })
    }
}

/// API representation of a site.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/site-response.ts"
)]
pub struct SiteResponse {
    pub id: String,
    pub organisation_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: String,
}

impl From<SiteRecord> for SiteResponse {
    fn from(record: SiteRecord) -> Self {
        Self {
            id: record.id.to_string(),
            organisation_id: record.organisation_id.map(|id| id.to_string()),
            name: record.name,
            address: record.address,
            city: record.city,
            country: record.country,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}
