use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pass_catalog::Booking;
use pass_finance::LedgerSnapshot;
use pass_reimbursement::CustomReimbursementRule;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::repository::{BookingRepository, CustomRuleRepository, LedgerRepository};
use crate::{StoreError, StoreResult};

/// Repositories backed by plain JSON files.
#[derive(Debug, Clone, Default)]
pub struct JsonFileStore {
    bookings: Option<PathBuf>,
    custom_rules: Option<PathBuf>,
    ledger: Option<PathBuf>,
}

impl JsonFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookings(mut self, path: impl Into<PathBuf>) -> Self {
        self.bookings = Some(path.into());
        self
    }

    pub fn with_custom_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.custom_rules = Some(path.into());
        self
    }

    pub fn with_ledger(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger = Some(path.into());
        self
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let raw = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Write through a sibling temporary file so readers never see a
/// half-written document.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let raw = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    let io_error = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };
    tokio::fs::write(&tmp, raw).await.map_err(io_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error)
}

#[async_trait]
impl BookingRepository for JsonFileStore {
    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let path = self.bookings.as_deref().ok_or(StoreError::NotConfigured("bookings"))?;
        let bookings: Vec<Booking> = read_json(path).await?;
        tracing::debug!(count = bookings.len(), path = %path.display(), "Loaded bookings");
        Ok(bookings)
    }
}

#[async_trait]
impl CustomRuleRepository for JsonFileStore {
    /// No configured file means no custom rule.
    async fn list_custom_rules(&self) -> StoreResult<Vec<CustomReimbursementRule>> {
        let Some(path) = self.custom_rules.as_deref() else {
            return Ok(Vec::new());
        };
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let rules: Vec<CustomReimbursementRule> = read_json(path).await?;
        for rule in &rules {
            rule.validate()?;
        }
        Ok(rules)
    }

    async fn save_custom_rule(&self, rule: &CustomReimbursementRule) -> StoreResult<()> {
        rule.validate()?;
        let path = self
            .custom_rules
            .as_deref()
            .ok_or(StoreError::NotConfigured("custom rules"))?;
        let mut rules = self.list_custom_rules().await?;
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule.clone(),
            None => rules.push(rule.clone()),
        }
        write_json(path, &rules).await?;
        tracing::info!(rule = %rule.id, "Saved custom reimbursement rule");
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for JsonFileStore {
    /// A missing ledger file is an empty ledger.
    async fn load_ledger(&self) -> StoreResult<LedgerSnapshot> {
        let path = self.ledger.as_deref().ok_or(StoreError::NotConfigured("ledger"))?;
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(LedgerSnapshot::default());
        }
        read_json(path).await
    }

    async fn save_ledger(&self, snapshot: &LedgerSnapshot) -> StoreResult<()> {
        let path = self.ledger.as_deref().ok_or(StoreError::NotConfigured("ledger"))?;
        write_json(path, snapshot).await
    }
}
