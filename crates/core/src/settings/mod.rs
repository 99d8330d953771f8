use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use crate::cpq::catalog::PlanCatalog;
use crate::cpq::payback::PaybackVariant;
use crate::cpq::profile::FamilyProfile;
use crate::cpq::tax::TaxConfig;
use crate::domain::actor::Actor;
use crate::domain::family::ProductFamily;
use crate::errors::{ApplicationError, StoreError};

/// Key/value store for JSON-encoded settings documents.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn save(&self, key: &str, value_json: &str) -> Result<(), StoreError>;
}

pub fn tax_key(user_id: &str) -> String {
    format!("tax:{user_id}")
}

pub fn catalog_key(family: ProductFamily) -> String {
    format!("catalog:{}", family.as_str())
}

/// Typed, permission-checked access to tax rates and plan catalog overrides.
pub struct SettingsService<R> {
    repository: R,
    payback_variants: BTreeMap<ProductFamily, PaybackVariant>,
    audit: Arc<dyn AuditSink>,
}

impl<R: SettingsRepository> SettingsService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository, payback_variants: BTreeMap::new(), audit: Arc::new(TracingAuditSink) }
    }

    /// Per-family payback thresholds that replace the built-in defaults.
    pub fn with_payback_variants(
        mut self,
        variants: BTreeMap<ProductFamily, PaybackVariant>,
    ) -> Self {
        self.payback_variants = variants;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Stored tax rates for a user, or the defaults when none were saved.
    pub async fn tax_config(&self, user_id: &str) -> Result<TaxConfig, ApplicationError> {
        Ok(self.load_json(&tax_key(user_id)).await?.unwrap_or_default())
    }

    pub async fn save_tax_config(
        &self,
        actor: &Actor,
        config: &TaxConfig,
    ) -> Result<(), ApplicationError> {
        if let Err(error) = actor.require(actor.permissions.can_edit_taxes, "edit tax rates") {
            self.emit_rejection(actor, "settings.taxes_rejected", &error.to_string());
            return Err(error.into());
        }
        config.validate()?;

        let key = tax_key(&actor.user_id);
        self.save_json(&key, config).await?;
        self.emit_saved(actor, "settings.taxes_saved", &key);
        Ok(())
    }

    /// Plans stored for a family on top of the built-in catalog.
    pub async fn catalog_overrides(
        &self,
        family: ProductFamily,
    ) -> Result<PlanCatalog, ApplicationError> {
        Ok(self.load_json(&catalog_key(family)).await?.unwrap_or_default())
    }

    pub async fn save_catalog_overrides(
        &self,
        actor: &Actor,
        family: ProductFamily,
        overrides: &PlanCatalog,
    ) -> Result<(), ApplicationError> {
        if let Err(error) = actor.require(actor.permissions.can_edit_plans, "edit plan catalogs") {
            self.emit_rejection(actor, "settings.catalog_rejected", &error.to_string());
            return Err(error.into());
        }
        FamilyProfile::default_for(family).catalog.with_overrides(overrides.clone()).validate()?;

        let key = catalog_key(family);
        self.save_json(&key, overrides).await?;
        self.emit_saved(actor, "settings.catalog_saved", &key);
        Ok(())
    }

    /// Effective profile for a family: default catalog merged with stored
    /// overrides, and the configured payback variant.
    pub async fn profile(&self, family: ProductFamily) -> Result<FamilyProfile, ApplicationError> {
        let mut profile = FamilyProfile::default_for(family);
        let overrides = self.catalog_overrides(family).await?;
        if !overrides.is_empty() {
            let merged = profile.catalog.clone().with_overrides(overrides);
            merged.validate()?;
            profile = profile.with_catalog(merged);
        }
        if let Some(variant) = self.payback_variants.get(&family) {
            profile = profile.with_payback(variant.table());
        }
        Ok(profile)
    }

    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.repository.load(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|error| StoreError::Decode(format!("setting `{key}`: {error}")))
    }

    async fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|error| StoreError::Decode(format!("setting `{key}`: {error}")))?;
        self.repository.save(key, &raw).await
    }

    fn emit_saved(&self, actor: &Actor, event_type: &str, key: &str) {
        info!(event_name = event_type, actor = %actor.user_id, key, "settings saved");
        self.audit.emit(
            AuditEvent::new(
                None,
                Uuid::new_v4().to_string(),
                event_type,
                AuditCategory::Settings,
                &actor.user_id,
                AuditOutcome::Success,
            )
            .with_metadata("key", key),
        );
    }

    fn emit_rejection(&self, actor: &Actor, event_type: &str, reason: &str) {
        self.audit.emit(
            AuditEvent::new(
                None,
                Uuid::new_v4().to_string(),
                event_type,
                AuditCategory::Settings,
                &actor.user_id,
                AuditOutcome::Rejected,
            )
            .with_metadata("role", actor.role.to_string())
            .with_metadata("reason", reason),
        );
    }
}
