use std::collections::BTreeMap;

use gleaner_core::job::JobField;
use gleaner_core::models::{ExtractionConfig, ExtractionRule, MatchPattern};
use gleaner_core::traits::ConfigStore;
use gleaner_db::ConfigRepository;

use crate::common::setup_test_db;

fn acme_config() -> ExtractionConfig {
    ExtractionConfig::new(
        "jobs.acme.com",
        vec![
            MatchPattern::UrlPattern {
                pattern: r"^https?://(?:www\.)?jobs\.acme\.com(?:[:/?#]|$)".into(),
            },
            MatchPattern::CssExists {
                selector: r#"script[type="application/ld+json"]"#.into(),
                contains: Some("JobPosting".into()),
            },
        ],
        BTreeMap::from([
            (
                JobField::Title,
                vec![
                    ExtractionRule::JsonLd {
                        path: "title".into(),
                    },
                    ExtractionRule::Css {
                        selector: "h1.posting-title".into(),
                        attribute: None,
                    },
                ],
            ),
            (
                JobField::SalaryMin,
                vec![ExtractionRule::Regex {
                    pattern: r"from \$([\d,]+)".into(),
                    group: 1,
                }],
            ),
        ]),
    )
}

#[tokio::test]
async fn insert_and_list_config() {
    let (pool, _container) = setup_test_db().await;
    let repo = ConfigRepository::new(pool);
    let config = acme_config();

    let stored = repo
        .insert(&config)
        .await
        .unwrap()
        .expect("First insert should store the config");
    assert_eq!(stored.id, config.id);

    let all = repo.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, config.id);
    assert_eq!(all[0].name, "jobs.acme.com");
    assert_eq!(all[0].match_patterns, config.match_patterns);
    assert_eq!(all[0].match_hash, config.match_hash);
    assert_eq!(all[0].extract_rules, config.extract_rules);
}

#[tokio::test]
async fn duplicate_hash_and_version_is_ignored() {
    let (pool, _container) = setup_test_db().await;
    let repo = ConfigRepository::new(pool);
    let config = acme_config();
    repo.insert(&config).await.unwrap();

    // Same patterns, fresh id: same (match_hash, version).
    let twin = acme_config();
    assert_eq!(twin.match_hash, config.match_hash);
    assert!(repo.insert(&twin).await.unwrap().is_none());
    assert_eq!(repo.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn newer_versions_list_first() {
    let (pool, _container) = setup_test_db().await;
    let repo = ConfigRepository::new(pool);

    let v1 = acme_config();
    let v2 = v1.next_version(BTreeMap::from([(
        JobField::Title,
        vec![ExtractionRule::Meta {
            name: "og:title".into(),
        }],
    )]));
    let other = ExtractionConfig::new(
        "careers.globex.com",
        vec![MatchPattern::ContentContains {
            pattern: "Globex".into(),
            regex: false,
        }],
        BTreeMap::new(),
    );

    for config in [&v1, &other, &v2] {
        assert!(repo.insert(config).await.unwrap().is_some());
    }

    let order: Vec<(String, i32)> = repo
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.version))
        .collect();
    assert_eq!(order[0], ("jobs.acme.com".to_string(), 2));
    assert_eq!(order.len(), 3);

    let versions = repo.get_versions(&v1.match_hash).await.unwrap();
    assert_eq!(
        versions.iter().map(|c| c.version).collect::<Vec<_>>(),
        vec![2, 1]
    );
}

async fn count_through_trait<S: ConfigStore>(store: &S) -> usize {
    store.list_all().await.unwrap().len()
}

#[tokio::test]
async fn repository_implements_config_store() {
    let (pool, _container) = setup_test_db().await;
    let repo = ConfigRepository::new(pool);

    assert_eq!(count_through_trait(&repo).await, 0);
    ConfigStore::insert(&repo, &acme_config()).await.unwrap();
    assert_eq!(count_through_trait(&repo).await, 1);
}
