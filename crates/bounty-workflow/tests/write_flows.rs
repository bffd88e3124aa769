use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bounty_chain::{ChainReader, MockChain};
use bounty_core::{
    Address, BlobStore, BoardObserver, BountyError, BountyForm, BountyId, ErrorKind, PersistenceOptions, Result,
    SubmissionForm,
};
use bounty_metadata::{MemoryBlobStore, MetadataCache, MetadataUploader, StoreMetadataSource};
use bounty_view::BountyAggregator;
use bounty_workflow::{CreateBountyWorkflow, SubmitWorkflow, WorkflowState, WriteContext, WriteOutcome};
use chrono::Utc;
use tokio::sync::Mutex;

fn addr(n: u8) -> Address {
    Address::new(format!("0x{:040x}", n))
}

fn bounty_form(reward: &str) -> BountyForm {
    BountyForm {
        title: "Audit the vault".to_string(),
        description: "Look for reentrancy".to_string(),
        reward: reward.to_string(),
        deadline: (Utc::now() + chrono::Duration::days(3)).to_rfc3339(),
        tags: vec![],
    }
}

/// Blob store that writes its uploads into the chain's call log.
struct RecordingStore {
    chain: Arc<MockChain>,
    inner: MemoryBlobStore,
}

#[async_trait]
impl BlobStore for RecordingStore {
    async fn put(&self, bytes: Vec<u8>, content_type: &str, filename: &str) -> Result<String> {
        self.chain.record("upload").await;
        self.inner.put(bytes, content_type, filename).await
    }

    async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(cid).await
    }

    async fn request_persistence(&self, cid: &str, options: &PersistenceOptions) -> Result<String> {
        self.inner.request_persistence(cid, options).await
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl BoardObserver for RecordingObserver {
    async fn bounty_changed(&self, bounty_id: BountyId) {
        self.events.lock().await.push(format!("bounty:{}", bounty_id));
    }

    async fn list_changed(&self) {
        self.events.lock().await.push("list".to_string());
    }
}

fn context(chain: &Arc<MockChain>, store: Arc<dyn BlobStore>, observer: Arc<dyn BoardObserver>) -> Arc<WriteContext> {
    Arc::new(
        WriteContext::new(chain.clone(), chain.clone(), chain.clone(), MetadataUploader::new(store))
            .with_observer(observer),
    )
}

#[tokio::test]
async fn test_create_call_order_with_approval() {
    let chain = MockChain::new();
    let me = addr(1);
    chain.fund(&me, 10_000_000).await;
    let store = Arc::new(RecordingStore {
        chain: chain.clone(),
        inner: MemoryBlobStore::new(),
    });
    let observer = Arc::new(RecordingObserver::default());
    let wf = CreateBountyWorkflow::new(context(&chain, store, observer.clone()));

    let outcome = wf.run(Some(&me), &bounty_form("2.5"), Utc::now()).await.unwrap();

    assert_eq!(
        chain.calls().await,
        vec![
            "balance_of",
            "upload",
            "allowance",
            "approve",
            "wait_for_receipt:approve",
            "create_bounty",
            "wait_for_receipt:create_bounty",
        ]
    );
    assert!(matches!(outcome, WriteOutcome::Completed { cid: Some(_), .. }));
    assert_eq!(*observer.events.lock().await, vec!["list"]);

    let steps: Vec<String> = wf.steps().await.into_iter().map(|s| s.step).collect();
    assert_eq!(
        steps,
        vec!["idle", "preparing", "uploading", "checking", "approving", "writing", "confirming"]
    );
}

#[tokio::test]
async fn test_reverted_create_is_failure() {
    let chain = MockChain::new();
    let me = addr(1);
    chain.fund(&me, 10_000_000).await;
    chain.revert_writes("create_bounty").await;
    let observer = Arc::new(RecordingObserver::default());
    let wf = CreateBountyWorkflow::new(context(&chain, Arc::new(MemoryBlobStore::new()), observer.clone()));

    let err = wf.run(Some(&me), &bounty_form("1"), Utc::now()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransactionReverted);
    match wf.state().await {
        WorkflowState::Failed { kind, tx_hash, .. } => {
            assert_eq!(kind, ErrorKind::TransactionReverted);
            assert!(tx_hash.is_some());
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(observer.events.lock().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_submission_uploads_nothing() {
    let chain = MockChain::new();
    let hunter = addr(2);
    let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
    chain.seed_submission(id, &hunter, "earlier").await;
    let store = Arc::new(MemoryBlobStore::new());
    let wf = SubmitWorkflow::new(context(&chain, store.clone(), Arc::new(RecordingObserver::default())));

    let form = SubmissionForm {
        bounty_id: id,
        title: "Again".to_string(),
        description: "Second try".to_string(),
    };
    let err = wf.run(Some(&hunter), &form, Utc::now()).await.unwrap_err();

    assert_eq!(err, BountyError::AlreadySubmitted);
    assert_eq!(err.to_string(), "SUBMIT/You have already submitted to this bounty");
    assert_eq!(store.put_count(), 0);
    assert!(!chain.calls().await.iter().any(|c| c == "submit_to_bounty"));
}

#[tokio::test]
async fn test_submit_notifies_bounty() {
    let chain = MockChain::new();
    let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
    let observer = Arc::new(RecordingObserver::default());
    let wf = SubmitWorkflow::new(context(&chain, Arc::new(MemoryBlobStore::new()), observer.clone()));

    let form = SubmissionForm {
        bounty_id: id,
        title: "Fix".to_string(),
        description: "Done".to_string(),
    };
    wf.run(Some(&addr(2)), &form, Utc::now()).await.unwrap();

    assert_eq!(*observer.events.lock().await, vec![format!("bounty:{}", id)]);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_refused_while_busy() {
    let chain = MockChain::new();
    let me = addr(1);
    chain.fund(&me, 10_000_000).await;
    chain.set_delay("balance_of", Duration::from_secs(5)).await;
    let wf = Arc::new(CreateBountyWorkflow::new(context(
        &chain,
        Arc::new(MemoryBlobStore::new()),
        Arc::new(RecordingObserver::default()),
    )));

    let mut states = wf.handle().subscribe();
    let first = tokio::spawn({
        let wf = wf.clone();
        let me = me.clone();
        async move { wf.run(Some(&me), &bounty_form("1"), Utc::now()).await }
    });
    states.wait_for(|s| s.is_busy()).await.unwrap();

    let err = wf.run(Some(&me), &bounty_form("1"), Utc::now()).await.unwrap_err();
    assert_eq!(err, BountyError::Busy);

    assert!(first.await.unwrap().is_ok());
    let creates = chain.calls().await.iter().filter(|c| c.as_str() == "create_bounty").count();
    assert_eq!(creates, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_mid_confirmation_ignores_completion() {
    let chain = MockChain::new();
    let hunter = addr(2);
    let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
    chain.set_delay("wait_for_receipt", Duration::from_secs(30)).await;
    let observer = Arc::new(RecordingObserver::default());
    let wf = Arc::new(SubmitWorkflow::new(context(
        &chain,
        Arc::new(MemoryBlobStore::new()),
        observer.clone(),
    )));

    let mut states = wf.handle().subscribe();
    let running = tokio::spawn({
        let wf = wf.clone();
        async move {
            let form = SubmissionForm {
                bounty_id: id,
                title: "Fix".to_string(),
                description: "Done".to_string(),
            };
            wf.run(Some(&hunter), &form, Utc::now()).await
        }
    });
    states
        .wait_for(|s| matches!(s, WorkflowState::Confirming { .. }))
        .await
        .unwrap();

    // The abandoned state still names the unconfirmed transaction.
    let WorkflowState::Confirming { tx_hash } = wf.reset().await else {
        panic!("reset outside Confirming");
    };
    assert!(tx_hash.starts_with("0x"));
    assert!(chain.calls().await.iter().any(|c| c == "submit_to_bounty"));
    let late = running.await.unwrap();

    assert_eq!(late, Err(BountyError::Abandoned));
    assert_eq!(wf.state().await, WorkflowState::Idle);
    // The write itself landed; caches still hear about it.
    assert_eq!(observer.events.lock().await.len(), 1);
}

#[tokio::test]
async fn test_ambiguous_approval_then_resume() {
    let chain = MockChain::new();
    let me = addr(1);
    chain.fund(&me, 10_000_000).await;
    chain.fail_receipts("approve").await;
    let store = Arc::new(MemoryBlobStore::new());
    let wf = CreateBountyWorkflow::new(context(&chain, store.clone(), Arc::new(RecordingObserver::default())));

    let outcome = wf.run(Some(&me), &bounty_form("3"), Utc::now()).await.unwrap();
    let WriteOutcome::NeedsAttention { warning, cid } = outcome else {
        panic!("expected a warning");
    };
    assert!(warning.contains("may have succeeded"));
    assert!(matches!(wf.state().await, WorkflowState::NeedsAttention { .. }));
    assert!(!chain.calls().await.iter().any(|c| c == "create_bounty"));

    chain.heal_receipts().await;
    chain.clear_calls().await;
    let resumed = wf.resume().await.unwrap();

    // The approval did land, so resume goes straight to the create.
    assert_eq!(
        chain.calls().await,
        vec!["allowance", "create_bounty", "wait_for_receipt:create_bounty"]
    );
    assert!(matches!(resumed, WriteOutcome::Completed { cid: Some(ref c), .. } if *c == cid));
    assert_eq!(store.put_count(), 1);
}

#[tokio::test]
async fn test_created_bounty_appears_in_aggregated_view() {
    let chain = MockChain::new();
    let me = addr(1);
    chain.fund(&me, 10_000_000).await;
    let store = Arc::new(MemoryBlobStore::new());
    let cache = Arc::new(MetadataCache::new(Arc::new(StoreMetadataSource::new(store.clone()))));
    let aggregator = Arc::new(BountyAggregator::new(ChainReader::new(chain.clone()), cache).with_viewer(Some(me.clone())));
    aggregator.sync().await.unwrap();
    assert!(aggregator.bounties().await.is_empty());

    let wf = CreateBountyWorkflow::new(context(&chain, store, aggregator.clone()));
    wf.run(Some(&me), &bounty_form("0.5"), Utc::now()).await.unwrap();

    let bounties = aggregator.bounties().await;
    assert_eq!(bounties.len(), 1);
    assert_eq!(bounties[0].title, "Audit the vault");
    assert_eq!(bounties[0].reward, "0.5");
    assert!(!bounties[0].is_loading);
}
