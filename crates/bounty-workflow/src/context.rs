//! Collaborators shared by every write workflow
use std::sync::Arc;

use bounty_core::config::ContractsConfig;
use bounty_core::{
    BoardObserver, BountyContract, BountyError, BountyId, Receipt, ReceiptSource, Result, RewardToken, TxHash,
};
use bounty_metadata::MetadataUploader;
use tracing::{debug, warn};

pub struct WriteContext {
    pub contract: Arc<dyn BountyContract>,
    pub token: Arc<dyn RewardToken>,
    pub receipts: Arc<dyn ReceiptSource>,
    pub uploader: MetadataUploader,
    /// Told about confirmed writes; usually the bounty aggregator
    pub observer: Option<Arc<dyn BoardObserver>>,
    pub platform: String,
    pub network: String,
}

impl WriteContext {
    pub fn new(
        contract: Arc<dyn BountyContract>,
        token: Arc<dyn RewardToken>,
        receipts: Arc<dyn ReceiptSource>,
        uploader: MetadataUploader,
    ) -> Self {
        let defaults = ContractsConfig::default();
        Self {
            contract,
            token,
            receipts,
            uploader,
            observer: None,
            platform: defaults.platform,
            network: defaults.network,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BoardObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Document labels from config.
    pub fn with_contracts(mut self, config: &ContractsConfig) -> Self {
        self.platform = config.platform.clone();
        self.network = config.network.clone();
        self
    }

    /// Wait for `tx_hash` and require a successful status. A receipt that
    /// cannot be fetched is ambiguous, not a revert.
    pub async fn confirm(&self, tx_hash: &TxHash) -> Result<Receipt> {
        match self.receipts.wait_for_receipt(tx_hash).await {
            Ok(receipt) if receipt.succeeded() => {
                debug!(tx = %tx_hash, block = receipt.block_number, "transaction confirmed");
                Ok(receipt)
            }
            Ok(_) => Err(BountyError::TransactionReverted {
                tx_hash: tx_hash.to_string(),
            }),
            Err(err) => {
                warn!(tx = %tx_hash, error = %err, "receipt unavailable");
                Err(BountyError::AmbiguousConfirmation {
                    tx_hash: tx_hash.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    pub(crate) async fn notify_bounty(&self, bounty_id: BountyId) {
        if let Some(observer) = &self.observer {
            observer.bounty_changed(bounty_id).await;
        }
    }

    pub(crate) async fn notify_list(&self) {
        if let Some(observer) = &self.observer {
            observer.list_changed().await;
        }
    }
}
