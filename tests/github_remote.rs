//! `GitHubRemote` and `GitHubClient` against a mock GitHub server.

use pr_pulse::config::{GitHubSettings, SyncConfig};
use pr_pulse::error::{AppError, ErrorKind};
use pr_pulse::models::PageRequest;
use pr_pulse::services::github_client::{GitHubClient, GitHubClientConfig};
use pr_pulse::services::{GitHubRemote, RemoteDataSource, RepositoryRequest};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_for(server: &MockServer) -> GitHubRemote {
    GitHubRemote::new(GitHubSettings {
        api_url: server.uri(),
        graphql_url: format!("{}/graphql", server.uri()),
        timeout_secs: 5,
        user_agent: "pr-pulse-tests".to_string(),
    })
}

fn request(page: u32) -> RepositoryRequest {
    let config = SyncConfig {
        base_branch: Some("main".to_string()),
        ..Default::default()
    };
    RepositoryRequest::new(7, "octo", "widgets", "ghp_mock", PageRequest::new(page, 25), &config)
}

#[tokio::test]
async fn test_list_pull_requests_maps_fields_and_sends_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls"))
        .and(query_param("state", "closed"))
        .and(query_param("base", "main"))
        .and(query_param("sort", "created"))
        .and(query_param("direction", "desc"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "25"))
        .and(header("authorization", "Bearer ghp_mock"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "number": 42,
                "title": "feat: add widgets",
                "user": { "login": "alice", "avatar_url": "https://avatars.example/alice" },
                "state": "closed",
                "created_at": "2024-01-01T00:00:00Z",
                "merged_at": "2024-01-02T00:00:00Z"
            },
            {
                "number": 41,
                "title": "fix: ghost",
                "user": null,
                "state": "closed"
            }
        ])))
        .mount(&server)
        .await;

    let prs = remote_for(&server)
        .get_pull_requests(&request(2))
        .await
        .unwrap();

    assert_eq!(prs.len(), 2);
    assert_eq!(prs[0].number, 42);
    assert_eq!(prs[0].author, "alice");
    assert_eq!(
        prs[0].avatar_url.as_deref(),
        Some("https://avatars.example/alice")
    );
    assert_eq!(prs[1].author, "ghost");
}

#[tokio::test]
async fn test_empty_page_is_empty_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = remote_for(&server)
        .get_pull_requests(&request(9))
        .await
        .unwrap_err();
    assert!(err.is_empty());
}

#[tokio::test]
async fn test_status_mapping() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/1"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let remote = remote_for(&server);

    let err = remote.get_pull_requests(&request(1)).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Unauthorized {
            repository_id: Some(7),
            ..
        }
    ));

    let err = remote
        .get_review_comment_count(&request(1), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Server { status_code: 502, .. }));
    assert_eq!(err.kind(), ErrorKind::ServerError);

    let err = remote
        .get_review_comment_count(&request(1), 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::GitHubApi {
            status_code: Some(404),
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Error);

    let err = remote
        .get_review_comment_count(&request(1), 3)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let remote = GitHubRemote::new(GitHubSettings {
        api_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
        ..Default::default()
    });

    let err = remote.get_pull_requests(&request(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoInternet);
}

#[tokio::test]
async fn test_approvals_only_include_approved_reviews() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/5/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "user": { "login": "bob", "avatar_url": null }, "state": "COMMENTED", "submitted_at": "2024-01-01T00:00:00Z" },
            { "id": 2, "user": { "login": "carol", "avatar_url": null }, "state": "APPROVED", "submitted_at": "2024-01-02T00:00:00Z" },
            { "id": 3, "user": { "login": "dave", "avatar_url": null }, "state": "CHANGES_REQUESTED", "submitted_at": null }
        ])))
        .mount(&server)
        .await;

    let approvals = remote_for(&server)
        .get_approvals(&request(1), 5)
        .await
        .unwrap();

    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].reviewer, "carol");
    assert_eq!(approvals[0].repository_id, 7);
    assert_eq!(approvals[0].pull_request_id, 5);
    assert_eq!(approvals[0].submitted_at.as_deref(), Some("2024-01-02T00:00:00Z"));
}

#[tokio::test]
async fn test_review_comment_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 6,
            "merged": true,
            "review_comments": 11,
            "title": "fix: thing"
        })))
        .mount(&server)
        .await;

    let detail = remote_for(&server)
        .get_review_comment_count(&request(1), 6)
        .await
        .unwrap();

    assert!(detail.merged);
    assert_eq!(detail.review_comments, 11);
}

#[tokio::test]
async fn test_code_owners_from_contributors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/contributors"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "login": "alice", "avatar_url": null, "contributions": 120 },
            { "login": "bob", "avatar_url": null, "contributions": 3 }
        ])))
        .mount(&server)
        .await;

    let owners = remote_for(&server)
        .get_code_owners(&request(1))
        .await
        .unwrap();
    assert_eq!(owners, vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test]
async fn test_repository_without_commits_has_no_contributors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/contributors"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let owners = remote_for(&server)
        .get_code_owners(&request(1))
        .await
        .unwrap();
    assert!(owners.is_empty());
}

#[tokio::test]
async fn test_reviews_follow_link_pagination() {
    let server = MockServer::start().await;
    let next = format!(
        "<{}/repos/octo/widgets/pulls/8/reviews?page=2&per_page=100>; rel=\"next\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/8/reviews"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!([
                    { "id": 1, "user": { "login": "bob", "avatar_url": null }, "state": "APPROVED", "submitted_at": null }
                ])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/8/reviews"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2, "user": { "login": "carol", "avatar_url": null }, "state": "APPROVED", "submitted_at": null }
        ])))
        .mount(&server)
        .await;

    let approvals = remote_for(&server)
        .get_approvals(&request(1), 8)
        .await
        .unwrap();
    let reviewers: Vec<&str> = approvals.iter().map(|a| a.reviewer.as_str()).collect();
    assert_eq!(reviewers, vec!["bob", "carol"]);
}

#[tokio::test]
async fn test_viewer_contributions_graphql() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer ghp_mock"))
        .and(body_string_contains("contributionsCollection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "viewer": {
                    "login": "alice",
                    "contributionsCollection": {
                        "totalCommitContributions": 120,
                        "totalPullRequestContributions": 30,
                        "totalPullRequestReviewContributions": 45,
                        "totalIssueContributions": 5
                    }
                }
            }
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::new(GitHubClientConfig {
        api_url: server.uri(),
        graphql_url: format!("{}/graphql", server.uri()),
        token: "ghp_mock".to_string(),
        ..Default::default()
    })
    .unwrap();

    let summary = client.viewer_contributions().await.unwrap();
    assert_eq!(summary.login, "alice");
    assert_eq!(summary.commits, 120);
    assert_eq!(summary.pull_request_reviews, 45);
    assert_eq!(summary.total(), 200);
}

#[tokio::test]
async fn test_graphql_errors_are_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Field 'viewer' is missing" }]
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::new(GitHubClientConfig {
        graphql_url: format!("{}/graphql", server.uri()),
        token: "ghp_mock".to_string(),
        ..Default::default()
    })
    .unwrap();

    let err = client.viewer_contributions().await.unwrap_err();
    assert!(matches!(err, AppError::GitHubApi { .. }));
}
