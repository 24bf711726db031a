//! Organisation and site ports and application service.
//!
//! Every record is owned by exactly one user; "not owned" surfaces as
//! not-found so resource existence never leaks across accounts.

use std::sync::Arc;

use async_trait::async_trait;
use conforma_core::{AppError, AppResult, UserId, UserIdentity};
use uuid::Uuid;

/// Organisation record returned by repository queries.
#[derive(Debug, Clone)]
pub struct OrganisationRecord {
    /// Unique organisation identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: UserId,
    /// Organisation name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Industry sector label.
    pub sector: Option<String>,
    /// Country label.
    pub country: Option<String>,
    /// Creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Site record returned by repository queries.
#[derive(Debug, Clone)]
pub struct SiteRecord {
    /// Unique site identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: UserId,
    /// Parent organisation, if grouped under one.
    pub organisation_id: Option<Uuid>,
    /// Site name.
    pub name: String,
    /// Street address.
    pub address: Option<String>,
    /// City label.
    pub city: Option<String>,
    /// Country label.
    pub country: Option<String>,
    /// Creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Incoming organisation payload.
#[derive(Debug, Clone)]
pub struct OrganisationInput {
    /// Organisation name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Industry sector label.
    pub sector: Option<String>,
    /// Country label.
    pub country: Option<String>,
}

/// Incoming site payload.
#[derive(Debug, Clone)]
pub struct SiteInput {
    /// Parent organisation, if grouped under one.
    pub organisation_id: Option<Uuid>,
    /// Site name.
    pub name: String,
    /// Street address.
    pub address: Option<String>,
    /// City label.
    pub city: Option<String>,
    /// Country label.
    pub country: Option<String>,
}

/// Repository port for organisations and sites.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Inserts an organisation for the owner.
    async fn insert_organisation(
        &self,
        user_id: UserId,
        input: &OrganisationInput,
    ) -> AppResult<OrganisationRecord>;

    /// Lists the owner's organisations.
    async fn list_organisations(&self, user_id: UserId) -> AppResult<Vec<OrganisationRecord>>;

    /// Finds an organisation by id.
    async fn find_organisation(&self, id: Uuid) -> AppResult<Option<OrganisationRecord>>;

    /// Updates an organisation in place.
    async fn update_organisation(
        &self,
        id: Uuid,
        input: &OrganisationInput,
    ) -> AppResult<OrganisationRecord>;

    /// Deletes an organisation.
    async fn delete_organisation(&self, id: Uuid) -> AppResult<()>;

    /// Inserts a site for the owner.
    async fn insert_site(&self, user_id: UserId, input: &SiteInput) -> AppResult<SiteRecord>;

    /// Lists the owner's sites.
    async fn list_sites(&self, user_id: UserId) -> AppResult<Vec<SiteRecord>>;

    /// Finds a site by id.
    async fn find_site(&self, id: Uuid) -> AppResult<Option<SiteRecord>>;

    /// Updates a site in place.
    async fn update_site(&self, id: Uuid, input: &SiteInput) -> AppResult<SiteRecord>;

    /// Deletes a site.
    async fn delete_site(&self, id: Uuid) -> AppResult<()>;
}

/// Application service for organisations and sites.
#[derive(Clone)]
pub struct DirectoryService {
    repository: Arc<dyn DirectoryRepository>,
}

impl DirectoryService {
    /// Creates a new directory service.
    #[must_use]
    pub fn new(repository: Arc<dyn DirectoryRepository>) -> Self {
        Self { repository }
    }

    fn validate_name(name: &str) -> AppResult<()> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_owned()));
        }
        Ok(())
    }

    /// Creates an organisation owned by the requester.
    pub async fn create_organisation(
        &self,
        identity: &UserIdentity,
        input: OrganisationInput,
    ) -> AppResult<OrganisationRecord> {
        Self::validate_name(&input.name)?;
        self.repository
            .insert_organisation(identity.user_id(), &input)
            .await
    }

    /// Lists the requester's organisations.
    pub async fn list_organisations(
        &self,
        identity: &UserIdentity,
    ) -> AppResult<Vec<OrganisationRecord>> {
        self.repository.list_organisations(identity.user_id()).await
    }

    /// Returns one organisation, requiring ownership.
    pub async fn get_organisation(
        &self,
        identity: &UserIdentity,
        id: Uuid,
    ) -> AppResult<OrganisationRecord> {
        self.owned_organisation(identity, id).await
    }

    /// Updates an organisation, requiring ownership.
    pub async fn update_organisation(
        &self,
        identity: &UserIdentity,
        id: Uuid,
        input: OrganisationInput,
    ) -> AppResult<OrganisationRecord> {
        Self::validate_name(&input.name)?;
        self.owned_organisation(identity, id).await?;
        self.repository.update_organisation(id, &input).await
    }

    /// Deletes an organisation, requiring ownership.
    pub async fn delete_organisation(&self, identity: &UserIdentity, id: Uuid) -> AppResult<()> {
        self.owned_organisation(identity, id).await?;
        self.repository.delete_organisation(id).await
    }

    /// Creates a site owned by the requester; a parent organisation, when
    /// given, must belong to the requester too.
    pub async fn create_site(
        &self,
        identity: &UserIdentity,
        input: SiteInput,
    ) -> AppResult<SiteRecord> {
        Self::validate_name(&input.name)?;

        if let Some(organisation_id) = input.organisation_id {
            self.owned_organisation(identity, organisation_id).await?;
        }

        self.repository.insert_site(identity.user_id(), &input).await
    }

    /// Lists the requester's sites.
    pub async fn list_sites(&self, identity: &UserIdentity) -> AppResult<Vec<SiteRecord>> {
        self.repository.list_sites(identity.user_id()).await
    }

    /// Returns one site, requiring ownership.
    pub async fn get_site(&self, identity: &UserIdentity, id: Uuid) -> AppResult<SiteRecord> {
        self.owned_site(identity, id).await
    }

    /// Updates a site, requiring ownership.
    pub async fn update_site(
        &self,
        identity: &UserIdentity,
        id: Uuid,
        input: SiteInput,
    ) -> AppResult<SiteRecord> {
        Self::validate_name(&input.name)?;
        self.owned_site(identity, id).await?;

        if let Some(organisation_id) = input.organisation_id {
            self.owned_organisation(identity, organisation_id).await?;
        }

        self.repository.update_site(id, &input).await
    }

    /// Deletes a site, requiring ownership.
    pub async fn delete_site(&self, identity: &UserIdentity, id: Uuid) -> AppResult<()> {
        self.owned_site(identity, id).await?;
        self.repository.delete_site(id).await
    }

    async fn owned_organisation(
        &self,
        identity: &UserIdentity,
        id: Uuid,
    ) -> AppResult<OrganisationRecord> {
        self.repository
            .find_organisation(id)
            .await?
            .filter(|record| record.user_id == identity.user_id())
            .ok_or_else(|| AppError::NotFound(format!("organisation '{id}' does not exist")))
    }

    async fn owned_site(&self, identity: &UserIdentity, id: Uuid) -> AppResult<SiteRecord> {
        self.repository
            .find_site(id)
            .await?
            .filter(|record| record.user_id == identity.user_id())
            .ok_or_else(|| AppError::NotFound(format!("site '{id}' does not exist")))
    }
}
