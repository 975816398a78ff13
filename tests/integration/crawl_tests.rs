//! Integration tests for the crawler
//!
//! These tests drive the full crawl loop against scripted onion sites
//! served by an in-process fetcher.

use crate::support::{
    onion, onion_v3, page, test_config, RecordingSink, Reply, ScriptedFetcher,
};
use onion_crawler::config::IncludeConfig;
use onion_crawler::crawler::FetchFailure;
use onion_crawler::{ConfigError, CrawlError, CrawlEvent, Crawler, LinkType};
use std::sync::Arc;
use std::time::Duration;

const CLEARNET: &str = "http://www.example.com/";

fn with_clearnet() -> IncludeConfig {
    IncludeConfig {
        clearnet: true,
        ..IncludeConfig::default()
    }
}

#[tokio::test]
async fn test_root_page_routes_links() {
    let root = onion_v3("root");
    let (left, right) = (onion("left"), onion("right"));
    let fetcher = ScriptedFetcher::new(vec![(
        root.clone(),
        Reply::Page(page("Root", &[&left, &right, CLEARNET])),
    )]);

    let mut config = test_config(1);
    config.crawler.max_depth = 1;
    config.crawler.max_pages = 0;
    config.include = with_clearnet();
    let crawler = Crawler::with_fetcher(config, fetcher.clone());

    let pages = crawler.crawl(&root).await.unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url, root);
    assert_eq!(pages[0].title, "Root");
    assert_eq!(pages[0].extracted_link_count, 3);
    assert_eq!(pages[0].link_type, LinkType::Onion);

    let state = crawler.state();
    let queued = state.frontier_snapshot();
    assert_eq!(queued.len(), 2);
    assert!(queued.iter().all(|link| link.depth == 1));
    assert_eq!(queued[0].url, left);
    assert_eq!(queued[1].url, right);

    let external = state.external_snapshot();
    assert_eq!(external.len(), 1);
    assert_eq!(external[0].url, CLEARNET);
    assert_eq!(external[0].link_type, LinkType::Clearnet);
    assert_eq!(state.failed_len(), 0);
    assert_eq!(fetcher.calls(), vec![root]);
}

#[tokio::test]
async fn test_full_crawl_follows_onion_links() {
    let root = onion("root");
    let (left, right, shared) = (onion("left"), onion("right"), onion("shared"));
    let fetcher = ScriptedFetcher::new(vec![
        (root.clone(), Reply::Page(page("Root", &[&left, &right]))),
        (left.clone(), Reply::Page(page("Left", &[&shared, &root]))),
        (right.clone(), Reply::Page(page("Right", &[&shared]))),
        (shared.clone(), Reply::Page(page("Shared", &[]))),
    ]);
    let crawler = Crawler::with_fetcher(test_config(2), fetcher.clone());

    let pages = crawler.crawl(&root).await.unwrap();

    assert_eq!(pages.len(), 4);
    for url in [&root, &left, &right, &shared] {
        assert_eq!(fetcher.calls_to(url), 1, "{} fetched more than once", url);
        assert!(crawler.state().is_visited(url));
    }
    assert_eq!(crawler.state().visited_len(), 4);
    assert_eq!(crawler.state().frontier_len(), 0);
    assert!(!crawler.is_crawling());
    assert_eq!(crawler.in_progress(), 0);

    let shared_page = pages.iter().find(|p| p.url == shared).unwrap();
    assert_eq!(shared_page.depth, 2);
}

#[tokio::test]
async fn test_http_error_is_terminal() {
    let root = onion("broken");
    let fetcher = ScriptedFetcher::new(vec![(root.clone(), Reply::Status(500))]);
    let crawler = Crawler::with_fetcher(test_config(1), fetcher.clone());
    let mut events = crawler.subscribe();

    let pages = crawler.crawl(&root).await.unwrap();

    assert!(pages.is_empty());
    assert_eq!(fetcher.calls_to(&root), 1);
    let failed = crawler.state().failed_snapshot();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url, root);
    assert!(crawler.state().is_visited(&root));
    assert_eq!(crawler.state().visited_len(), 1);

    let mut saw_http_error = false;
    let mut saw_failed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            CrawlEvent::HttpError { status, .. } => {
                assert_eq!(status, 500);
                saw_http_error = true;
            }
            CrawlEvent::Failed { reason, .. } => {
                assert!(matches!(reason, FetchFailure::Status { status: 500, .. }));
                saw_failed = true;
            }
            _ => {}
        }
    }
    assert!(saw_http_error);
    assert!(saw_failed);
}

#[tokio::test]
async fn test_zero_queue_capacity_enqueues_nothing() {
    let root = onion("root");
    let fetcher = ScriptedFetcher::new(vec![(
        root.clone(),
        Reply::Page(page("Root", &[&onion("left"), &onion("right"), CLEARNET])),
    )]);
    let mut config = test_config(1);
    config.crawler.max_in_queue = 0;
    config.include = with_clearnet();
    let crawler = Crawler::with_fetcher(config, fetcher.clone());

    let pages = crawler.crawl(&root).await.unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].extracted_link_count, 3);
    assert_eq!(crawler.state().frontier_len(), 0);
    assert_eq!(crawler.state().external_len(), 1);
    assert_eq!(crawler.state().failed_len(), 0);
    assert_eq!(fetcher.calls(), vec![root]);
}

#[tokio::test]
async fn test_single_worker_is_never_exceeded() {
    let root = onion("root");
    let children: Vec<String> = ["one", "two", "three", "four"]
        .iter()
        .map(|label| onion(label))
        .collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    let fetcher = ScriptedFetcher::with_delay(
        vec![(root.clone(), Reply::Page(page("Root", &child_refs)))],
        Duration::from_millis(20),
    );
    let crawler = Crawler::with_fetcher(test_config(1), fetcher.clone());

    let pages = crawler.crawl(&root).await.unwrap();

    assert_eq!(pages.len(), 5);
    assert_eq!(fetcher.max_in_flight(), 1);
}

#[tokio::test]
async fn test_worker_pool_is_bounded() {
    let root = onion("root");
    let children: Vec<String> = (2..=7).map(|n| onion(&format!("child{}", n))).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    let fetcher = ScriptedFetcher::with_delay(
        vec![(root.clone(), Reply::Page(page("Root", &child_refs)))],
        Duration::from_millis(20),
    );
    let crawler = Crawler::with_fetcher(test_config(3), fetcher.clone());

    let pages = crawler.crawl(&root).await.unwrap();

    assert_eq!(pages.len(), 7);
    assert!(fetcher.max_in_flight() <= 3);
}

#[tokio::test]
async fn test_depth_zero_fetches_only_root() {
    let root = onion("root");
    let fetcher = ScriptedFetcher::new(vec![(
        root.clone(),
        Reply::Page(page("Root", &[&onion("left"), &onion("right")])),
    )]);
    let mut config = test_config(2);
    config.crawler.max_depth = 0;
    let crawler = Crawler::with_fetcher(config, fetcher.clone());

    let pages = crawler.crawl(&root).await.unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].extracted_link_count, 2);
    assert_eq!(fetcher.calls(), vec![root]);
    assert_eq!(crawler.state().frontier_len(), 0);
}

#[tokio::test]
async fn test_batch_flush_mid_crawl() {
    let root = onion("root");
    let (left, right) = (onion("left"), onion("right"));
    let fetcher = ScriptedFetcher::new(vec![(
        root.clone(),
        Reply::Page(page("Root", &[&left, &right, CLEARNET])),
    )]);
    let mut config = test_config(1);
    config.crawler.batch_size = 1;
    config.include = with_clearnet();
    let sink = Arc::new(RecordingSink::default());
    let crawler = Crawler::with_fetcher(config, fetcher).with_sink(sink.clone());

    let pages = crawler.crawl(&root).await.unwrap();

    // root and left are flushed together; right stays in the last batch
    assert_eq!(sink.batches(), vec![(2, 0, 1)]);
    assert_eq!(crawler.saved_batches(), 1);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url, right);
    assert_eq!(crawler.state().external_len(), 0);
    assert_eq!(crawler.state().total_pages(), 3);
    assert_eq!(crawler.report().total_pages, 3);
}

#[tokio::test]
async fn test_batches_written_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let pages_path = dir.path().join("pages.csv");
    let external_path = dir.path().join("external.csv");

    let root = onion("root");
    let fetcher = ScriptedFetcher::new(vec![(
        root.clone(),
        Reply::Page(page("Root, the first", &[&onion("left"), &onion("right"), CLEARNET])),
    )]);
    let mut config = test_config(1);
    config.crawler.batch_size = 1;
    config.include = with_clearnet();
    config.output.pages_path = Some(pages_path.clone());
    config.output.external_path = Some(external_path.clone());
    let crawler = Crawler::with_fetcher(config, fetcher);

    crawler.crawl(&root).await.unwrap();
    assert_eq!(crawler.flush().unwrap(), 1);
    assert_eq!(crawler.saved_batches(), 2);
    assert_eq!(crawler.state().pages_len(), 0);

    let pages_csv = std::fs::read_to_string(&pages_path).unwrap();
    let lines: Vec<&str> = pages_csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Url,Title,Description,Type");
    assert!(lines[1].starts_with(&format!("{},Root  the first,", root)));
    assert_eq!(pages_csv.matches("Url,Title").count(), 1);

    let external_csv = std::fs::read_to_string(&external_path).unwrap();
    assert_eq!(external_csv.lines().count(), 2);
}

#[tokio::test]
async fn test_failed_links_write_error_does_not_duplicate_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pages_path = dir.path().join("pages.csv");

    let root = onion("root");
    let (dead, a, b, c) = (onion("dead"), onion("pagea"), onion("pageb"), onion("pagec"));
    let fetcher = ScriptedFetcher::new(vec![
        (root.clone(), Reply::Page(page("Root", &[&dead, &a, &b, &c]))),
        (dead.clone(), Reply::Status(500)),
    ]);
    let mut config = test_config(1);
    config.crawler.batch_size = 1;
    config.output.pages_path = Some(pages_path.clone());
    // A directory cannot be opened for appending
    config.output.failed_path = Some(dir.path().to_path_buf());
    let crawler = Crawler::with_fetcher(config, fetcher);

    crawler.crawl(&root).await.unwrap();
    assert!(matches!(crawler.flush(), Err(CrawlError::Output(_))));

    let pages_csv = std::fs::read_to_string(&pages_path).unwrap();
    let rows: Vec<&str> = pages_csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows.iter().filter(|row| row.starts_with(&root)).count(), 1);

    let state = crawler.state();
    assert_eq!(state.pages_len(), 0);
    assert_eq!(state.failed_len(), 1);
    assert_eq!(state.total_pages(), 4);
    assert_eq!(crawler.saved_batches(), 0);
}

#[tokio::test]
async fn test_stop_cancels_in_flight_fetch() {
    let root = onion("slow");
    let fetcher = ScriptedFetcher::new(vec![(root.clone(), Reply::Hang)]);
    let crawler = Arc::new(Crawler::with_fetcher(test_config(1), fetcher));
    let mut events = crawler.subscribe();

    let task = tokio::spawn({
        let crawler = Arc::clone(&crawler);
        let root = root.clone();
        async move { crawler.crawl(&root).await }
    });

    loop {
        if let CrawlEvent::Processing(_) = events.recv().await.unwrap() {
            break;
        }
    }
    crawler.stop();

    let pages = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("crawl did not stop")
        .unwrap()
        .unwrap();

    assert!(pages.is_empty());
    let failed = crawler.state().failed_snapshot();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].retry_count, 0);
    assert!(crawler.state().is_visited(&root));
    assert!(!crawler.is_crawling());
}

#[tokio::test]
async fn test_invalid_config_fails_fast() {
    let fetcher = ScriptedFetcher::default();
    let mut config = test_config(1);
    config.crawler.max_threads = 0;
    let crawler = Crawler::with_fetcher(config, fetcher.clone());

    let result = crawler.crawl(&onion("root")).await;

    assert!(matches!(
        result,
        Err(CrawlError::Config(ConfigError::Validation(_)))
    ));
    assert!(fetcher.calls().is_empty());
    assert_eq!(crawler.state().frontier_len(), 0);
}

#[tokio::test]
async fn test_external_links_are_never_fetched() {
    let root = onion("root");
    let i2p = "http://forum.i2p/";
    let fetcher = ScriptedFetcher::new(vec![(
        root.clone(),
        Reply::Page(page("Root", &[CLEARNET, i2p])),
    )]);
    let mut config = test_config(1);
    config.include = IncludeConfig {
        onion: true,
        clearnet: true,
        i2p: true,
        ip: false,
    };
    let crawler = Crawler::with_fetcher(config, fetcher.clone());
    let mut events = crawler.subscribe();

    crawler.crawl(&root).await.unwrap();

    assert_eq!(fetcher.calls(), vec![root.clone()]);
    assert_eq!(crawler.state().external_len(), 2);
    while let Ok(event) = events.try_recv() {
        if let CrawlEvent::Processing(link) = event {
            assert_eq!(link.url, root);
        }
    }
}

#[tokio::test]
async fn test_event_sequence() {
    let root = onion("root");
    let child = onion("child");
    let fetcher = ScriptedFetcher::new(vec![(
        root.clone(),
        Reply::Page(page("Root", &[&child])),
    )]);
    let crawler = Crawler::with_fetcher(test_config(1), fetcher);
    let mut events = crawler.subscribe();

    crawler.crawl(&root).await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert!(matches!(&received[0], CrawlEvent::Queued(links) if links.len() == 1 && links[0].url == root));
    assert!(matches!(&received[1], CrawlEvent::Processing(link) if link.url == root));
    assert!(matches!(&received[2], CrawlEvent::Queued(links) if links[0].url == child));
    assert!(matches!(&received[3], CrawlEvent::PageFetched(page) if page.url == root));
    assert!(matches!(received.last(), Some(CrawlEvent::Finished(pages)) if pages.len() == 2));
}

#[tokio::test]
async fn test_crawler_is_reusable_after_stop() {
    let first = onion("first");
    let second = onion("second");
    let fetcher = ScriptedFetcher::new(vec![
        (first.clone(), Reply::Page(page("First", &[]))),
        (second.clone(), Reply::Page(page("Second", &[]))),
    ]);
    let crawler = Crawler::with_fetcher(test_config(1), fetcher);

    crawler.crawl(&first).await.unwrap();
    crawler.stop();
    let pages = crawler.crawl(&second).await.unwrap();

    // stores persist across crawls on the same crawler
    assert_eq!(pages.len(), 2);
    assert!(crawler.state().is_visited(&first));
    assert!(crawler.state().is_visited(&second));
}
