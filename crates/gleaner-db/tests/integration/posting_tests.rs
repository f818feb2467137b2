use gleaner_core::models::NewJobPosting;
use gleaner_core::scoring::CompletionState;
use gleaner_db::{ConfigRepository, JobPostingRepository};

use crate::common::setup_test_db;

fn posting(url: &str, title: &str, data_hash: &str) -> NewJobPosting {
    NewJobPosting {
        url: url.into(),
        data: serde_json::json!({"title": title, "companyName": "Acme Corp"}),
        completion_state: CompletionState::Partial,
        score: 0.6,
        config_id: None,
        content_hash: "c".repeat(64),
        data_hash: data_hash.into(),
    }
}

#[tokio::test]
async fn save_and_retrieve_posting() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobPostingRepository::new(pool);

    let id = repo
        .save(&posting("https://jobs.acme.com/1", "Engineer", "d1"))
        .await
        .unwrap();
    assert!(!id.is_nil());

    let latest = repo
        .get_latest("https://jobs.acme.com/1")
        .await
        .unwrap()
        .expect("Should find the posting");

    assert_eq!(latest.id, id);
    assert_eq!(latest.data["title"], "Engineer");
    assert_eq!(latest.completion_state, CompletionState::Partial);
    assert!((latest.score - 0.6).abs() < f64::EPSILON);
    assert_eq!(latest.config_id, None);
}

#[tokio::test]
async fn latest_and_history_are_newest_first() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobPostingRepository::new(pool);
    let url = "https://jobs.acme.com/2";

    for (i, title) in ["First", "Second", "Third"].iter().enumerate() {
        repo.save(&posting(url, title, &format!("d{i}"))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    repo.save(&posting("https://jobs.acme.com/other", "Other", "dx"))
        .await
        .unwrap();

    let latest = repo.get_latest(url).await.unwrap().unwrap();
    assert_eq!(latest.data["title"], "Third");

    let history = repo.get_history(url, 2).await.unwrap();
    let titles: Vec<&str> = history
        .iter()
        .filter_map(|p| p.data["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Third", "Second"]);
}

#[tokio::test]
async fn unknown_url_has_no_latest() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobPostingRepository::new(pool);

    assert!(repo.get_latest("https://nowhere.example").await.unwrap().is_none());
    assert!(repo.get_history("https://nowhere.example", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn posting_references_stored_config() {
    let (pool, _container) = setup_test_db().await;
    let configs = ConfigRepository::new(pool.clone());
    let repo = JobPostingRepository::new(pool);

    let config = gleaner_core::models::ExtractionConfig::new(
        "jobs.acme.com",
        vec![gleaner_core::models::MatchPattern::UrlPattern {
            pattern: "acme".into(),
        }],
        Default::default(),
    );
    let stored = configs.insert(&config).await.unwrap().unwrap();

    let mut new = posting("https://jobs.acme.com/3", "Engineer", "d3");
    new.config_id = Some(stored.id);
    repo.save(&new).await.unwrap();

    let latest = repo.get_latest("https://jobs.acme.com/3").await.unwrap().unwrap();
    assert_eq!(latest.config_id, Some(stored.id));
}
