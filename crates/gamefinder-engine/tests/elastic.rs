use gamefinder_core::{codec, Facet, SearchError, TotalRelation};
use gamefinder_engine::{ElasticEngine, FacetEnumerator, SearchEngine, SearchGateway};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine(server: &MockServer) -> ElasticEngine {
    ElasticEngine::new(&server.uri(), "boardgames", Duration::from_secs(2)).unwrap()
}

fn hit(id: u32, name: &str, sort: JsonValue) -> JsonValue {
    json!({
        "_index": "boardgames",
        "_id": id.to_string(),
        "_score": 12.5,
        "_source": {"id": id, "name": name, "slug": name.to_lowercase(), "rank": id, "rating": 7.25},
        "sort": sort,
    })
}

fn composite(buckets: &[(u32, &str)], after: Option<(u32, &str)>) -> JsonValue {
    let mut tags = json!({
        "buckets": buckets
            .iter()
            .map(|(id, name)| json!({"key": {"id": id, "name": name}, "doc_count": 3}))
            .collect::<Vec<_>>(),
    });
    if let Some((id, name)) = after {
        tags["after_key"] = json!({"id": id, "name": name});
    }
    json!({
        "hits": {"total": {"value": 120, "relation": "eq"}, "hits": []},
        "aggregations": {"facet": {"doc_count": 40, "tags": tags}},
    })
}

#[tokio::test]
async fn search_page_carries_last_hit_sort_as_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/boardgames/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 3,
            "hits": {
                "total": {"value": 10000, "relation": "gte"},
                "hits": [
                    hit(13, "Catan", json!([12.5, 13, 13])),
                    hit(822, "Carcassonne", json!([9.75, 822, 822])),
                ],
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = SearchGateway::new(Arc::new(engine(&server)));
    let page = gateway
        .search(&codec::decode("keywords=ca"), &[])
        .await
        .unwrap();

    assert_eq!(page.hits.len(), 2);
    assert_eq!(page.hits[0].name, "Catan");
    assert_eq!(page.total.relation, TotalRelation::Gte);
    assert!(page.has_more(2));
    assert_eq!(
        page.next_cursor,
        Some(vec!["9.75".to_string(), "822".to_string(), "822".to_string()])
    );
}

#[tokio::test]
async fn request_body_boosts_tags_and_resumes_after_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/boardgames/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"total": {"value": 0, "relation": "eq"}, "hits": []},
        })))
        .mount(&server)
        .await;

    let gateway = SearchGateway::new(Arc::new(engine(&server)));
    let cursor = vec!["8.5".to_string(), "4.25".to_string(), "17".to_string(), "17".to_string()];
    let page = gateway
        .search(&codec::decode("sort=rating&mechanics=2004&rank=1-100"), &cursor)
        .await
        .unwrap();
    assert!(page.hits.is_empty());
    assert_eq!(page.next_cursor, None);

    let requests = server.received_requests().await.unwrap();
    let body: JsonValue = requests[0].body_json().unwrap();
    assert_eq!(body["size"], json!(10));
    assert_eq!(body["query"]["bool"]["minimum_should_match"], json!(0));
    assert_eq!(
        body["query"]["bool"]["should"][0]["nested"]["query"]["term"]["mechanics.id"],
        json!(2004)
    );
    assert_eq!(
        body["query"]["bool"]["filter"][0]["bool"]["should"][0]["range"]["rank"],
        json!({"gte": 1.0, "lte": 100.0})
    );
    assert_eq!(
        body["sort"][0],
        json!({"rating": {"order": "desc", "missing": "_last"}})
    );
    assert_eq!(body["search_after"], json!([8.5, 4.25, 17, "17"]));
}

#[tokio::test]
async fn upstream_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("cluster unavailable"))
        .mount(&server)
        .await;

    let err = SearchGateway::new(Arc::new(engine(&server)))
        .search(&Default::default(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Upstream(ref msg) if msg.contains("503")));
}

#[tokio::test]
async fn garbage_body_is_an_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = engine(&server)
        .search(&gamefinder_core::compile(&Default::default(), &[], 10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_response");
}

#[tokio::test]
async fn slow_engine_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let engine = ElasticEngine::new(&server.uri(), "boardgames", Duration::from_millis(50)).unwrap();
    let err = engine
        .query_string("catan", 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Timeout));
}

#[tokio::test]
async fn facet_walk_follows_after_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"aggs": {"facet": {"aggs": {"tags": {"composite": {
            "after": {"id": 2, "name": "Bluffing"}
        }}}}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(composite(
            &[(3, "Area Control"), (4, "Trading")],
            Some((4, "Trading")),
        )))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"aggs": {"facet": {"aggs": {"tags": {"composite": {
            "after": {"id": 4, "name": "Trading"}
        }}}}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(composite(&[], None)))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"aggs": {"facet": {"nested": {"path": "mechanics"}}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(composite(
            &[(1, "Auction"), (2, "Bluffing")],
            Some((2, "Bluffing")),
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let enumerator = FacetEnumerator::with_page_size(Arc::new(engine(&server)), 2);
    let tags = enumerator.enumerate(Facet::Mechanics).await.unwrap();
    let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Area Control", "Auction", "Bluffing", "Trading"]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    let first: JsonValue = requests[0].body_json().unwrap();
    assert_eq!(first["size"], json!(0));
    let composite = &first["aggs"]["facet"]["aggs"]["tags"]["composite"];
    assert_eq!(composite["size"], json!(2));
    assert!(composite.get("after").is_none());
    assert_eq!(
        composite["sources"][1]["name"]["terms"]["field"],
        json!("mechanics.name.keyword")
    );
}

#[tokio::test]
async fn facet_failure_names_the_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = FacetEnumerator::new(Arc::new(engine(&server)))
        .enumerate(Facet::Themes)
        .await
        .unwrap_err();
    match err {
        SearchError::FacetEnumeration { facet, page, source } => {
            assert_eq!(facet, Facet::Themes);
            assert_eq!(page, 1);
            assert_eq!(source.kind(), "upstream");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn query_string_sends_offset_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "from": 20,
            "size": 5,
            "query": {"query_string": {"query": "name:catan", "default_field": "name"}},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"total": {"value": 21, "relation": "eq"}, "hits": [hit(13, "Catan", json!([]))]},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = engine(&server).query_string("name:catan", 20, 5).await.unwrap();
    assert_eq!(page.total.value, 21);
    assert_eq!(page.hits[0].game.id, 13);
    assert_eq!(page.hits[0].score, 12.5);
}
