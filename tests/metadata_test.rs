use std::{sync::Arc, time::Duration};

use serde_json::json;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use cinepath::{
    db::Cache,
    error::AppError,
    models::{DetailsQuery, MediaType, MetadataSource},
    services::metadata::{MetadataLookup, MetadataProvider, OmdbProvider, TmdbProvider},
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn tmdb(server: &MockServer, region: &str) -> Arc<dyn MetadataProvider> {
    Arc::new(
        TmdbProvider::new(
            "tmdb-key".to_string(),
            server.uri(),
            region.to_string(),
            Cache::disabled(),
            TIMEOUT,
        )
        .unwrap(),
    )
}

fn omdb(server: &MockServer) -> Arc<dyn MetadataProvider> {
    Arc::new(OmdbProvider::new("omdb-key".to_string(), server.uri(), Cache::disabled(), TIMEOUT).unwrap())
}

fn heat_details() -> serde_json::Value {
    json!({
        "id": 949,
        "title": "Heat",
        "release_date": "1995-12-15",
        "overview": "Obsessive master thief McCauley leads a crew.",
        "poster_path": "/heat.jpg",
        "genres": [{ "id": 28, "name": "Action" }, { "id": 80, "name": "Crime" }],
        "runtime": 170,
        "vote_average": 7.94,
        "imdb_id": "tt0113277",
        "credits": {
            "cast": [
                { "name": "Al Pacino", "character": "Lt. Vincent Hanna" },
                { "name": "Robert De Niro", "character": "Neil McCauley" }
            ],
            "crew": [{ "name": "Michael Mann", "job": "Director" }]
        },
        "watch/providers": {
            "results": {
                "US": {
                    "flatrate": [{ "provider_name": "Netflix" }],
                    "ads": [{ "provider_name": "Tubi" }, { "provider_name": "Netflix" }]
                },
                "GB": { "flatrate": [{ "provider_name": "Prime Video" }] }
            }
        }
    })
}

#[tokio::test]
async fn test_tmdb_details_by_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .and(query_param("api_key", "tmdb-key"))
        .and(query_param("query", "Heat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": 1, "media_type": "movie", "title": "Heat", "release_date": "1986-07-03" },
                { "id": 949, "media_type": "movie", "title": "Heat", "release_date": "1995-12-15" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/949"))
        .and(query_param("append_to_response", "credits,watch/providers,external_ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(heat_details()))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = MetadataLookup::new(vec![tmdb(&server, "US")]);
    let query = DetailsQuery {
        title: Some("Heat".to_string()),
        year: Some(1995),
        ..Default::default()
    };

    let outcome = lookup.fetch_details(&query).await.unwrap();
    assert!(outcome.found);
    assert_eq!(outcome.source, MetadataSource::Primary);

    let details = outcome.data.unwrap();
    assert_eq!(details.title, "Heat");
    assert_eq!(details.year, Some(1995));
    assert_eq!(details.director.as_deref(), Some("Michael Mann"));
    assert_eq!(details.rating, Some(7.9));
    assert_eq!(details.runtime_minutes, Some(170));
    assert_eq!(details.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/heat.jpg"));
    assert_eq!(details.cast.len(), 2);
    assert_eq!(details.providers.len(), 1);
    assert_eq!(details.providers["US"], vec!["Netflix", "Tubi"]);
}

#[tokio::test]
async fn test_tmdb_resolves_imdb_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/find/tt0113277"))
        .and(query_param("external_source", "imdb_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "movie_results": [{ "id": 949, "title": "Heat" }],
            "tv_results": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/949"))
        .respond_with(ResponseTemplate::new(200).set_body_json(heat_details()))
        .expect(1)
        .mount(&server)
        .await;

    // No region filter: every country is reported
    let lookup = MetadataLookup::new(vec![tmdb(&server, "")]);
    let query = DetailsQuery {
        imdb_id: Some("tt0113277".to_string()),
        ..Default::default()
    };

    let details = lookup.fetch_details(&query).await.unwrap().data.unwrap();
    assert_eq!(details.tmdb_id, Some(949));
    assert_eq!(details.providers.len(), 2);
}

#[tokio::test]
async fn test_falls_back_to_omdb_when_tmdb_fails() {
    let tmdb_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&tmdb_server)
        .await;

    let omdb_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("apikey", "omdb-key"))
        .and(query_param("t", "Heat"))
        .and(query_param("y", "1995"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "True",
            "Title": "Heat",
            "Year": "1995",
            "Runtime": "170 min",
            "Genre": "Action, Crime, Drama",
            "Director": "Michael Mann",
            "Actors": "Al Pacino, Robert De Niro, Val Kilmer",
            "Plot": "A group of high-end professional thieves.",
            "Poster": "N/A",
            "imdbRating": "8.3",
            "imdbID": "tt0113277"
        })))
        .expect(1)
        .mount(&omdb_server)
        .await;

    let lookup = MetadataLookup::new(vec![tmdb(&tmdb_server, "US"), omdb(&omdb_server)]);
    let query = DetailsQuery {
        title: Some("Heat".to_string()),
        year: Some(1995),
        ..Default::default()
    };

    let outcome = lookup.fetch_details(&query).await.unwrap();
    assert_eq!(outcome.source, MetadataSource::Secondary);

    let details = outcome.data.unwrap();
    assert_eq!(details.poster, None);
    assert_eq!(details.genres, vec!["Action", "Crime", "Drama"]);
    assert_eq!(details.cast.len(), 3);
    assert_eq!(details.rating, Some(8.3));
}

#[tokio::test]
async fn test_omdb_unknown_title_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "False",
            "Error": "Movie not found!"
        })))
        .mount(&server)
        .await;

    let lookup = MetadataLookup::new(vec![omdb(&server)]);
    let query = DetailsQuery {
        title: Some("Nonexistent Film".to_string()),
        ..Default::default()
    };

    let outcome = lookup.fetch_details(&query).await.unwrap();
    assert!(!outcome.found);
    assert!(outcome.configured);
    assert_eq!(outcome.source, MetadataSource::None);
}

#[tokio::test]
async fn test_search_falls_through_empty_results() {
    let tmdb_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&tmdb_server)
        .await;

    let omdb_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("s", "rififi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "True",
            "Search": [
                { "Title": "Rififi", "Year": "1955", "imdbID": "tt0048021", "Type": "movie", "Poster": "N/A" }
            ]
        })))
        .expect(1)
        .mount(&omdb_server)
        .await;

    let lookup = MetadataLookup::new(vec![tmdb(&tmdb_server, "US"), omdb(&omdb_server)]);
    let outcome = lookup.search("rififi").await.unwrap();

    assert_eq!(outcome.source, MetadataSource::Secondary);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].id, "tt0048021");
    assert_eq!(outcome.results[0].year, Some(1955));
    assert_eq!(outcome.results[0].media_type, Some(MediaType::Movie));
}

#[tokio::test]
async fn test_search_error_surfaces_when_every_provider_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let lookup = MetadataLookup::new(vec![tmdb(&server, "US")]);
    let err = lookup.search("heat").await.unwrap_err();
    assert!(matches!(err, AppError::ExternalApi(_)));
}
