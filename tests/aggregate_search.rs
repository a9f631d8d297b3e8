//! Cross-provider search isolation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use reelnab::provider::types::{Catalog, ContentType, EpisodeLink, MetaRecord, Post, PostsPage, ProviderDescriptor};
use reelnab::{Error, ProviderAdapter, ProviderRegistry, Result, SearchAggregator, SearchStatus};

#[derive(Debug, Clone)]
enum Behaviour {
    Finds(usize),
    Fails,
    Hangs,
    /// Hangs, and raises the flag once its search future is dropped.
    HangsTracked(Arc<AtomicBool>),
    Panics,
}

struct RaiseOnDrop(Arc<AtomicBool>);

impl Drop for RaiseOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct FakeProvider {
    descriptor: ProviderDescriptor,
    behaviour: Behaviour,
}

impl FakeProvider {
    fn new(name: &str, behaviour: Behaviour) -> Arc<dyn ProviderAdapter> {
        Self::with_disabled(name, behaviour, false)
    }

    fn with_disabled(name: &str, behaviour: Behaviour, disabled: bool) -> Arc<dyn ProviderAdapter> {
        Arc::new(Self {
            descriptor: ProviderDescriptor {
                name: name.into(),
                display_name: name.to_uppercase(),
                base_url: format!("https://{name}.test"),
                disabled,
            },
            behaviour,
        })
    }
}

#[async_trait]
impl ProviderAdapter for FakeProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::default())
    }

    async fn posts(&self, _filter: &str, _page: u32) -> Result<PostsPage> {
        Ok(PostsPage::default())
    }

    async fn search(&self, query: &str, _page: u32) -> Result<PostsPage> {
        match self.behaviour {
            Behaviour::Finds(n) => Ok(PostsPage {
                posts: (0..n)
                    .map(|i| Post {
                        title: format!("{query} {i}"),
                        link: format!("{}/p/{i}", self.descriptor.base_url),
                        image: String::new(),
                    })
                    .collect(),
                has_next_page: false,
            }),
            Behaviour::Fails => Err(Error::Status {
                status: 503,
                url: self.descriptor.base_url.clone(),
            }),
            Behaviour::Hangs => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(PostsPage::default())
            }
            Behaviour::HangsTracked(ref dropped) => {
                let _raise = RaiseOnDrop(Arc::clone(dropped));
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(PostsPage::default())
            }
            Behaviour::Panics => panic!("adapter bug"),
        }
    }

    async fn meta(&self, _link: &str) -> Result<MetaRecord> {
        Err(Error::NotFound("meta".into()))
    }

    async fn episodes(&self, _url: &str) -> Vec<EpisodeLink> {
        Vec::new()
    }

    async fn stream_links(&self, _link: &str, _content_type: ContentType) -> Vec<EpisodeLink> {
        Vec::new()
    }
}

fn aggregator(adapters: Vec<Arc<dyn ProviderAdapter>>) -> SearchAggregator {
    SearchAggregator::new(ProviderRegistry::new(adapters), Duration::from_millis(200))
}

#[tokio::test]
async fn failing_providers_are_reported_not_dropped() {
    let aggregator = aggregator(vec![
        FakeProvider::new("alpha", Behaviour::Finds(3)),
        FakeProvider::new("beta", Behaviour::Fails),
        FakeProvider::new("gamma", Behaviour::Hangs),
        FakeProvider::new("delta", Behaviour::Finds(0)),
        FakeProvider::new("epsilon", Behaviour::Panics),
    ]);

    let report = aggregator.collect("dark", 1).await;

    assert_eq!(report.outcomes.len(), 5);
    let mut succeeded: Vec<_> = report.succeeded().map(|o| o.provider.as_str()).collect();
    succeeded.sort_unstable();
    assert_eq!(succeeded, ["alpha", "delta"]);
    assert_eq!(report.failed().count(), 3);
    assert_eq!(report.posts().count(), 3);
    assert!(report.posts().all(|(provider, _)| provider == "alpha"));

    let status_of = |name: &str| {
        report
            .outcomes
            .iter()
            .find(|o| o.provider == name)
            .map(|o| o.status.clone())
            .unwrap()
    };
    assert_eq!(status_of("delta"), SearchStatus::Empty);
    assert_eq!(status_of("gamma"), SearchStatus::TimedOut);
    assert!(matches!(status_of("beta"), SearchStatus::Failed { ref error } if error.contains("503")));
    assert!(matches!(status_of("epsilon"), SearchStatus::Failed { .. }));
}

#[tokio::test]
async fn fast_results_arrive_before_slow_ones() {
    let aggregator = aggregator(vec![
        FakeProvider::new("slow", Behaviour::Hangs),
        FakeProvider::new("fast", Behaviour::Finds(1)),
    ]);

    let mut outcomes = Box::pin(aggregator.search_all("x", 1));
    let first = outcomes.next().await.unwrap();
    assert_eq!(first.provider, "fast");
    assert_eq!(first.status, SearchStatus::Found);
    let second = outcomes.next().await.unwrap();
    assert_eq!(second.status, SearchStatus::TimedOut);
    assert!(outcomes.next().await.is_none());
}

#[tokio::test]
async fn disabled_providers_are_not_queried() {
    let aggregator = aggregator(vec![
        FakeProvider::new("on", Behaviour::Finds(1)),
        FakeProvider::with_disabled("off", Behaviour::Panics, true),
    ]);
    let report = aggregator.collect("x", 1).await;
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].provider, "on");
}

#[tokio::test]
async fn outcomes_serialize_with_status_tag() {
    let aggregator = aggregator(vec![FakeProvider::new("beta", Behaviour::Fails)]);
    let report = aggregator.collect("x", 1).await;
    let json = serde_json::to_value(&report).unwrap();
    let outcome = &json["outcomes"][0];
    assert_eq!(outcome["provider"], "beta");
    assert_eq!(outcome["status"], "failed");
    assert!(outcome["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn dropping_the_stream_aborts_pending_searches() {
    let dropped = Arc::new(AtomicBool::new(false));
    let aggregator = SearchAggregator::new(
        ProviderRegistry::new(vec![
            FakeProvider::new("fast", Behaviour::Finds(1)),
            FakeProvider::new("slow", Behaviour::HangsTracked(Arc::clone(&dropped))),
        ]),
        Duration::from_secs(60),
    );

    let mut outcomes = Box::pin(aggregator.search_all("x", 1));
    assert_eq!(outcomes.next().await.unwrap().provider, "fast");
    drop(outcomes);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !dropped.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("abandoned provider search should be aborted");
}
