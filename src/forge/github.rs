//! GitHub REST adapter
//!
//! Endpoints used:
//! - GET  /search/issues
//! - POST /repos/{repo}/issues
//! - GET  /repos/{repo}/pulls?head=owner:branch&state=all
//! - GET  /repos/{repo}/git/ref/heads/{branch}
//! - POST /repos/{repo}/git/refs
//! - GET  /repos/{repo}/contents/{path}?ref=branch
//! - PUT  /repos/{repo}/contents/{path}
//! - POST /repos/{repo}/pulls

use crate::error::RemoteError;
use crate::forge::{
    FileUpdate, ForgeClient, HttpClient, IssueRef, NewPullRequest, PullRequestRef, RemoteFile,
};
use crate::manifest::encode_content;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<IssueRef>,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

/// GitHub implementation of [`ForgeClient`]
pub struct GitHubClient {
    client: HttpClient,
}

impl GitHubClient {
    /// Create a new GitHub adapter
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn owner(repository: &str) -> &str {
        repository.split('/').next().unwrap_or(repository)
    }
}

/// 422 is also returned for unknown SHAs and malformed ref names
fn is_existing_ref(error: &RemoteError) -> bool {
    error.status == Some(422) && error.message.contains("Reference already exists")
}

#[async_trait]
impl ForgeClient for GitHubClient {
    async fn search_issues(
        &self,
        repository: &str,
        title: &str,
    ) -> Result<Vec<IssueRef>, RemoteError> {
        let query = format!(
            "repo:{} is:issue in:title \"{}\"",
            repository,
            title.replace('"', "")
        );
        let response: SearchResponse = self
            .client
            .get_json("/search/issues", &[("q", query.as_str()), ("per_page", "100")])
            .await?;
        debug!("Search returned {} issues", response.items.len());
        Ok(response.items)
    }

    async fn create_issue(
        &self,
        repository: &str,
        title: &str,
        body: &str,
    ) -> Result<IssueRef, RemoteError> {
        self.client
            .send_json(
                Method::POST,
                &format!("/repos/{}/issues", repository),
                &json!({ "title": title, "body": body }),
            )
            .await
    }

    async fn find_pull_request(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Option<PullRequestRef>, RemoteError> {
        let head = format!("{}:{}", Self::owner(repository), branch);
        let pulls: Vec<PullRequestRef> = self
            .client
            .get_json(
                &format!("/repos/{}/pulls", repository),
                &[("head", head.as_str()), ("state", "all")],
            )
            .await?;
        Ok(pulls.into_iter().next())
    }

    async fn branch_sha(&self, repository: &str, branch: &str) -> Result<String, RemoteError> {
        let git_ref: GitRef = self
            .client
            .get_json(
                &format!("/repos/{}/git/ref/heads/{}", repository, branch),
                &[],
            )
            .await?;
        Ok(git_ref.object.sha)
    }

    async fn create_branch(
        &self,
        repository: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), RemoteError> {
        let result = self
            .client
            .send_json_unit(
                Method::POST,
                &format!("/repos/{}/git/refs", repository),
                &json!({ "ref": format!("refs/heads/{}", branch), "sha": sha }),
            )
            .await;

        match result {
            Err(e) if is_existing_ref(&e) => {
                debug!("Branch {} already exists", branch);
                Ok(())
            }
            other => other,
        }
    }

    async fn get_file(
        &self,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<RemoteFile, RemoteError> {
        let response: ContentsResponse = self
            .client
            .get_json(
                &format!("/repos/{}/contents/{}", repository, path),
                &[("ref", branch)],
            )
            .await?;
        Ok(RemoteFile {
            content: response.content,
            sha: response.sha,
        })
    }

    async fn update_file(
        &self,
        repository: &str,
        update: FileUpdate<'_>,
    ) -> Result<(), RemoteError> {
        self.client
            .send_json_unit(
                Method::PUT,
                &format!("/repos/{}/contents/{}", repository, update.path),
                &json!({
                    "message": update.message,
                    "content": encode_content(update.content),
                    "sha": update.sha,
                    "branch": update.branch,
                }),
            )
            .await
    }

    async fn create_pull_request(
        &self,
        repository: &str,
        pr: NewPullRequest<'_>,
    ) -> Result<PullRequestRef, RemoteError> {
        self.client
            .send_json(
                Method::POST,
                &format!("/repos/{}/pulls", repository),
                &json!({
                    "title": pr.title,
                    "body": pr.body,
                    "head": pr.head,
                    "base": pr.base,
                }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one request with a fixed status and JSON body
    async fn stub_server(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: &str) -> GitHubClient {
        GitHubClient::new(HttpClient::with_base_url(base_url, Some("t".to_string())).unwrap())
    }

    #[tokio::test]
    async fn test_create_branch_tolerates_existing_ref() {
        let url = stub_server(
            "422 Unprocessable Entity",
            r#"{"message":"Reference already exists"}"#,
        )
        .await;
        let result = client_for(&url)
            .create_branch("o/r", "arm/update-x-1-0-0", "abc123")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_branch_surfaces_other_validation_errors() {
        let url = stub_server(
            "422 Unprocessable Entity",
            r#"{"message":"Object does not exist"}"#,
        )
        .await;
        let err = client_for(&url)
            .create_branch("o/r", "arm/update-x-1-0-0", "deadbeef")
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(422));
        assert_eq!(err.message, "Object does not exist");
    }

    #[test]
    fn test_is_existing_ref() {
        assert!(is_existing_ref(&RemoteError::status(
            422,
            "Reference already exists"
        )));
        assert!(!is_existing_ref(&RemoteError::status(422, "Invalid request")));
        assert!(!is_existing_ref(&RemoteError::new("Reference already exists")));
    }

    #[test]
    fn test_owner() {
        assert_eq!(GitHubClient::owner("acme/app"), "acme");
    }

    #[test]
    fn test_parse_git_ref() {
        let r: GitRef = serde_json::from_str(
            r#"{"ref": "refs/heads/main", "object": {"sha": "abc123", "type": "commit"}}"#,
        )
        .unwrap();
        assert_eq!(r.object.sha, "abc123");
    }

    #[test]
    fn test_parse_search_response() {
        let r: SearchResponse = serde_json::from_str(
            r#"{"total_count": 1, "items": [{"number": 5, "title": "Update express (Node.js) from 4.17.1 to 4.22.1", "html_url": "https://github.com/o/g/issues/5", "body": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(r.items.len(), 1);
        assert_eq!(r.items[0].number, 5);
    }
}
