//! Crawler profiles: which accounts to poll on which sites.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::core::types::CrawlerProfile;
use crate::store::ns;

pub struct UserManager {
    store: Arc<dyn StateStore>,
}

impl UserManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Deduplicated account list for one site; empty after the site is
    /// deleted or was never written.
    pub async fn get_crawling_list(&self, site: &str) -> Result<Vec<String>> {
        match self.store.get(ns::CRAWL_TARGETS, site).await? {
            Some(value) => decode_accounts(site, value),
            None => Ok(Vec::new()),
        }
    }

    /// Append one target; writing the same profile twice is a no-op.
    pub async fn add_crawl_target(&self, profile: &CrawlerProfile) -> Result<()> {
        let mut accounts = self.get_crawling_list(&profile.site).await?;
        if !accounts.contains(&profile.account) {
            accounts.push(profile.account.clone());
        }
        self.store
            .put(ns::CRAWL_TARGETS, &profile.site, json!(accounts))
            .await
    }

    /// Administrative delete of a whole site.
    pub async fn remove_site(&self, site: &str) -> Result<bool> {
        self.store.delete(ns::CRAWL_TARGETS, site).await
    }

    /// Deduplicated site enumeration.
    pub async fn list_sites(&self) -> Result<Vec<String>> {
        self.store.list_keys(ns::CRAWL_TARGETS).await
    }
}

fn decode_accounts(site: &str, value: Value) -> Result<Vec<String>> {
    let items = value.as_array().ok_or_else(|| {
        Error::DataIntegrity(format!("crawl targets for {site} is not a list"))
    })?;
    let mut accounts = Vec::with_capacity(items.len());
    for item in items {
        let account = item.as_str().ok_or_else(|| {
            Error::DataIntegrity(format!("non-string crawl target for {site}"))
        })?;
        if !accounts.iter().any(|a| a == account) {
            accounts.push(account.to_string());
        }
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::engine::StoreEngine;

    #[tokio::test]
    async fn snowden_scenario() {
        let store = Arc::new(StoreEngine::new());
        let users = UserManager::new(store);

        users
            .add_crawl_target(&CrawlerProfile {
                site: "anothernetwork".into(),
                account: "Snowden".into(),
            })
            .await
            .unwrap();

        let list = users.get_crawling_list("anothernetwork").await.unwrap();
        assert!(!list.is_empty());
        assert!(list.contains(&"Snowden".to_string()));
        assert_eq!(users.list_sites().await.unwrap(), vec!["anothernetwork"]);

        assert!(users.remove_site("anothernetwork").await.unwrap());
        assert!(
            users
                .get_crawling_list("anothernetwork")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn duplicate_targets_collapse() {
        let store = Arc::new(StoreEngine::new());
        let users = UserManager::new(store);
        let profile = CrawlerProfile {
            site: "birdsite".into(),
            account: "whistler".into(),
        };
        users.add_crawl_target(&profile).await.unwrap();
        users.add_crawl_target(&profile).await.unwrap();
        assert_eq!(
            users.get_crawling_list("birdsite").await.unwrap(),
            vec!["whistler"]
        );
    }
}
