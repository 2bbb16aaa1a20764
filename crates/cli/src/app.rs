//! Wiring between the configuration and a file-backed governance manager.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use flagship_common::{MemberId, SystemClock};
use flagship_config::FundConfig;
use flagship_governance::{GovernanceManager, StaticMembership};
use flagship_storage::{FileStorage, JsonStorage, Storage, StorageOptions};

/// Storage key of the eligible voter list
const MEMBERS_KEY: &str = "governance/members";

pub struct App {
    pub manager: GovernanceManager,
    pub membership: Arc<StaticMembership>,
    storage: Arc<dyn Storage>,
    pub json: bool,
}

impl App {
    pub async fn open(config: &FundConfig, json: bool) -> Result<Self> {
        let options = StorageOptions {
            sync_write: true,
            create_dirs: true,
        };
        let storage: Arc<dyn Storage> = Arc::new(
            FileStorage::open(&config.storage.data_dir, Some(options)).with_context(|| {
                format!("failed to open data directory {}", config.storage.data_dir.display())
            })?,
        );
        debug!("Opening data directory {}", config.storage.data_dir.display());

        let members: Vec<MemberId> = storage
            .get_json_opt(MEMBERS_KEY)
            .await
            .context("failed to load the member list")?
            .unwrap_or_default();
        let membership = Arc::new(StaticMembership::from_members(members));

        let manager = GovernanceManager::open(
            storage.clone(),
            membership.clone(),
            Arc::new(SystemClock),
            config.governance.clone(),
        )
        .await
        .context("failed to open governance state")?;

        Ok(Self {
            manager,
            membership,
            storage,
            json,
        })
    }

    /// Write the eligible voter list back to disk
    pub async fn save_members(&self) -> Result<()> {
        let members = self.membership.members().await;
        self.storage
            .put_json(MEMBERS_KEY, &members)
            .await
            .context("failed to save the member list")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagship_governance::MembershipProvider;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_members_persist_between_runs() {
        let dir = tempdir().unwrap();
        let mut config = FundConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();

        let app = App::open(&config, false).await.unwrap();
        app.membership.grant(MemberId::new("alice")).await;
        app.membership.grant(MemberId::new("bob")).await;
        app.save_members().await.unwrap();

        let app = App::open(&config, true).await.unwrap();
        assert_eq!(app.membership.eligible_voter_count().await.unwrap(), 2);
        assert!(app.json);
    }
}
