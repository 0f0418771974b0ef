use std::sync::Arc;

use mockito::Matcher;
use section_recommender::config::SourcesConfig;
use section_recommender::sources::timeline::TimelineSource;
use section_recommender::sources::top_stories::TopStoriesSource;
use section_recommender::{Category, Document, Error, Recommender, TrainingPipeline};

fn model() -> Arc<section_recommender::ModelBundle> {
    let mut docs = Vec::new();
    for text in ["museum gallery painting", "gallery exhibit sculpture", "painting exhibit opera"] {
        docs.push(Document::labeled(text, Category::Arts.code()));
    }
    for text in ["recipe kitchen dinner", "chef restaurant recipe", "kitchen chef dessert"] {
        docs.push(Document::labeled(text, Category::Food.code()));
    }
    let (bundle, _) = TrainingPipeline::default().run(&docs).unwrap();
    Arc::new(bundle)
}

fn config(base: &str) -> SourcesConfig {
    SourcesConfig {
        top_stories_url: base.to_string(),
        timeline_url: base.to_string(),
        max_retries: 2,
        retry_base_ms: 1,
        ..SourcesConfig::default()
    }
}

#[test]
fn recommends_from_remote_timeline_and_top_stories() {
    let mut server = mockito::Server::new();
    let _user = server
        .mock("GET", "/2/users/by/username/foodie")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": {"id": "99"}}"#)
        .create();
    let _posts = server
        .mock("GET", "/2/users/99/tweets")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"text": "RT new dessert recipe tonight"}, {"text": "the chef kitchen was amazing"}]}"#)
        .create();
    let stories = server
        .mock("GET", "/dining.json")
        .match_query(Matcher::UrlEncoded("api-key".into(), "key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"results": [
                {"title": "Market Report", "abstract": "Prices rise.", "url": "https://example.com/m",
                 "section": "food", "subsection": "", "des_facet": "", "org_facet": "", "per_facet": ""},
                {"title": "Dessert Season", "abstract": "A chef shares a recipe.", "url": "https://example.com/d",
                 "section": "food", "subsection": "", "des_facet": ["Desserts"], "org_facet": [], "per_facet": []}
            ]}"#,
        )
        .create();

    let config = config(&server.url());
    let recommender = Recommender::new(model(), TopStoriesSource::new(&config, "key").unwrap());
    let timeline = TimelineSource::new(&config, "token").unwrap();

    let outcomes = recommender.recommend_for_user(&timeline, "@Foodie", 10, 1).unwrap();
    let rec = outcomes[0].recommendation().unwrap();
    assert_eq!(rec.category, Category::Food);
    assert_eq!(rec.title, "Dessert Season");
    assert_eq!(rec.url, "https://example.com/d");
    stories.assert();
}

#[test]
fn unavailable_article_service_is_reported() {
    let mut server = mockito::Server::new();
    let stories = server
        .mock("GET", "/arts.json")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(2)
        .create();

    let recommender = Recommender::new(model(), TopStoriesSource::new(&config(&server.url()), "key").unwrap());
    let err = recommender.recommend(&["gallery painting exhibit"], 1).unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
    stories.assert();
}
