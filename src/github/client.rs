// GitHubクライアント
//
// 検索・ツリー一覧・ファイル取得の3つの読み取り専用APIを扱う。
// 失敗は FetchError として返し、スキップするかどうかは呼び出し側が決める。

use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use log::{debug, warn};
use reqwest::{StatusCode, Url, header};
use serde::Serialize;
use thiserror::Error;

use super::schemas::{
    ContentResponse, RepoDescriptor, SearchPage, SearchResponse, TreeEntry, TreeResponse,
};

const USER_AGENT: &str = concat!("dart-dataset-harvester/", env!("CARGO_PKG_VERSION"));

/// 起動時に一度だけ組み立てる接続設定
#[derive(Clone, Debug)]
pub struct GitHubConfig {
    /// APIトークン（検証はしない。不正なら各リクエストが失敗する）
    pub token: String,
    /// APIのベースURL
    pub api_url: String,
}

/// リモート操作の失敗
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}: {body}")]
    Remote { status: StatusCode, body: String },

    #[error("デコードエラー: {detail}")]
    Decode { detail: String },

    #[error("応答に `{what}` がありません")]
    MissingData { what: &'static str },

    #[error("リクエストエラー: {0}")]
    Transport(#[from] reqwest::Error),
}

/// データセット生成が必要とするリポジトリ操作
pub trait RepositorySource {
    async fn search(&self, query: &str, page_size: u32, page: u32)
    -> Result<SearchPage, FetchError>;

    async fn list_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<TreeEntry>, FetchError>;

    async fn fetch_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<String>, FetchError>;
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    per_page: u32,
    page: u32,
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: Url,
    auth_header: String,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .with_context(|| format!("APIのURLが不正です: {}", config.api_url))?;
        if base_url.cannot_be_a_base() {
            bail!("APIのURLをベースにできません: {}", config.api_url);
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .context("HTTPクライアントの作成に失敗しました")?;

        Ok(GitHubClient {
            client,
            base_url,
            auth_header: format!("token {}", config.token),
        })
    }

    // ベースURLにパスセグメントを追加する（各セグメントはエンコードされる）
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        // new() で cannot-be-a-base は弾いているので失敗しない
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn search_url(&self) -> Url {
        self.endpoint(["search", "repositories"])
    }

    fn tree_url(&self, owner: &str, repo: &str, branch: &str) -> Url {
        let segments = ["repos", owner, repo, "git", "trees"]
            .into_iter()
            .chain(branch.split('/'));
        self.endpoint(segments)
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> Url {
        let segments = ["repos", owner, repo, "contents"]
            .into_iter()
            .chain(path.split('/'));
        self.endpoint(segments)
    }

    async fn get(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, FetchError> {
        let response = request
            .header(header::AUTHORIZATION, &self.auth_header)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Remote { status, body });
        }

        Ok(response)
    }
}

impl RepositorySource for GitHubClient {
    async fn search(
        &self,
        query: &str,
        page_size: u32,
        page: u32,
    ) -> Result<SearchPage, FetchError> {
        let params = SearchParams {
            q: query,
            per_page: page_size,
            page,
        };
        let request = self.client.get(self.search_url()).query(&params);
        let data: SearchResponse = self.get(request).await?.json().await?;

        let items = data.items.ok_or(FetchError::MissingData { what: "items" })?;
        Ok(SearchPage {
            repositories: items.into_iter().map(RepoDescriptor::from).collect(),
        })
    }

    async fn list_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<TreeEntry>, FetchError> {
        let request = self
            .client
            .get(self.tree_url(owner, repo, branch))
            .query(&[("recursive", "1")]);
        let data: TreeResponse = self.get(request).await?.json().await?;

        if data.truncated {
            warn!("⚠️ ツリーが途中で打ち切られています: {}/{} ({})", owner, repo, branch);
        }

        data.tree.ok_or(FetchError::MissingData { what: "tree" })
    }

    async fn fetch_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<String>, FetchError> {
        let request = self.client.get(self.contents_url(owner, repo, path));
        let data: ContentResponse = self.get(request).await?.json().await?;
        decode_content(data)
    }
}

/// contents API の応答を本文テキストに変換する
///
/// base64 以外のエンコーディングや本文なしの場合は `Ok(None)`。
/// 不正なUTF-8は置換文字に置き換える。
pub fn decode_content(data: ContentResponse) -> Result<Option<String>, FetchError> {
    match (data.content, data.encoding.as_deref()) {
        (Some(content), Some("base64")) => {
            // GitHubは60文字ごとに改行を入れて返す
            let compact: String = content.split_ascii_whitespace().collect();
            let decoded = BASE64
                .decode(compact.as_bytes())
                .map_err(|e| FetchError::Decode {
                    detail: e.to_string(),
                })?;
            Ok(Some(String::from_utf8_lossy(&decoded).into_owned()))
        }
        (_, encoding) => {
            debug!("本文なし、または未対応のエンコーディング: {:?}", encoding);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use serde_json::json;

    use super::*;

    fn client(api_url: &str) -> GitHubClient {
        GitHubClient::new(GitHubConfig {
            token: "t".to_string(),
            api_url: api_url.to_string(),
        })
        .unwrap()
    }

    fn content(content: Option<&str>, encoding: Option<&str>) -> ContentResponse {
        ContentResponse {
            content: content.map(str::to_string),
            encoding: encoding.map(str::to_string),
        }
    }

    #[test]
    fn builds_endpoint_urls() {
        let gh = client("https://api.github.com");
        assert_eq!(
            gh.search_url().as_str(),
            "https://api.github.com/search/repositories"
        );
        assert_eq!(
            gh.tree_url("o", "r", "main").as_str(),
            "https://api.github.com/repos/o/r/git/trees/main"
        );
        assert_eq!(
            gh.contents_url("o", "r", "lib/src/x.dart").as_str(),
            "https://api.github.com/repos/o/r/contents/lib/src/x.dart"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() {
        let gh = client("https://ghe.example.com/api/v3/");
        assert_eq!(
            gh.contents_url("o", "r", "lib/my file.dart").as_str(),
            "https://ghe.example.com/api/v3/repos/o/r/contents/lib/my%20file.dart"
        );
    }

    #[test]
    fn rejects_invalid_api_url() {
        let result = GitHubClient::new(GitHubConfig {
            token: "t".to_string(),
            api_url: "not a url".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn decodes_wrapped_base64() {
        // "void main() {}\n" を改行入りで分割
        let data = content(Some("dm9pZCBtYWlu\nKCkge30K\n"), Some("base64"));
        let text = decode_content(data).unwrap();
        assert_eq!(text.as_deref(), Some("void main() {}\n"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        // 0xff 0x41
        let data = content(Some("/0E="), Some("base64"));
        let text = decode_content(data).unwrap().unwrap();
        assert_eq!(text, "\u{FFFD}A");
    }

    #[test]
    fn missing_or_unknown_encoding_yields_none() {
        assert!(decode_content(content(None, Some("base64"))).unwrap().is_none());
        assert!(decode_content(content(Some("abc"), Some("none"))).unwrap().is_none());
        assert!(decode_content(content(Some("abc"), None)).unwrap().is_none());
    }

    #[test]
    fn invalid_base64_is_decode_failure() {
        let err = decode_content(content(Some("@@@"), Some("base64"))).unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    // 用意した応答を順番に返すだけのHTTPサーバ。受け取ったリクエストを返す
    fn serve(responses: Vec<(u16, String)>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                requests.push(read_request(&mut stream));
                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
            requests
        });

        (url, handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&buf).to_lowercase()
    }

    #[tokio::test]
    async fn talks_to_github_over_http() {
        let (url, server) = serve(vec![
            (
                200,
                json!({
                    "items": [{
                        "name": "app",
                        "owner": { "login": "octo" },
                        "default_branch": "main",
                        "description": "demo"
                    }]
                })
                .to_string(),
            ),
            (200, json!({ "message": "Validation Failed" }).to_string()),
            (403, "rate limited".to_string()),
            (
                200,
                json!({
                    "tree": [{ "path": "lib/a b.dart", "type": "blob" }],
                    "truncated": true
                })
                .to_string(),
            ),
            (200, json!({ "sha": "abc" }).to_string()),
            (
                200,
                json!({ "content": "dm9pZCBtYWlu\nKCkge30K\n", "encoding": "base64" }).to_string(),
            ),
        ]);

        let gh = GitHubClient::new(GitHubConfig {
            token: "tok".to_string(),
            api_url: url,
        })
        .unwrap();

        let page = gh.search("flutter", 10, 2).await.unwrap();
        assert_eq!(
            page.repositories,
            vec![RepoDescriptor {
                owner: "octo".to_string(),
                name: "app".to_string(),
                default_branch: "main".to_string(),
                description: "demo".to_string(),
            }]
        );

        let err = gh.search("flutter", 10, 3).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingData { what: "items" }));

        match gh.search("flutter", 10, 4).await.unwrap_err() {
            FetchError::Remote { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // 打ち切られたツリーも警告だけでそのまま返す
        let tree = gh.list_tree("o", "r", "main").await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "lib/a b.dart");

        let err = gh.list_tree("o", "r", "dev").await.unwrap_err();
        assert!(matches!(err, FetchError::MissingData { what: "tree" }));

        let text = gh.fetch_file_content("o", "r", "lib/a b.dart").await.unwrap();
        assert_eq!(text.as_deref(), Some("void main() {}\n"));

        let requests = server.join().unwrap();
        let request_lines: Vec<&str> = requests
            .iter()
            .map(|r| r.lines().next().unwrap_or_default())
            .collect();
        assert_eq!(
            request_lines,
            vec![
                "get /search/repositories?q=flutter&per_page=10&page=2 http/1.1",
                "get /search/repositories?q=flutter&per_page=10&page=3 http/1.1",
                "get /search/repositories?q=flutter&per_page=10&page=4 http/1.1",
                "get /repos/o/r/git/trees/main?recursive=1 http/1.1",
                "get /repos/o/r/git/trees/dev?recursive=1 http/1.1",
                "get /repos/o/r/contents/lib/a%20b.dart http/1.1",
            ]
        );
        for request in &requests {
            assert!(request.contains("\r\nauthorization: token tok\r\n"), "{request}");
            assert!(request.contains("\r\naccept: application/vnd.github.v3+json\r\n"));
            assert!(request.contains("\r\nuser-agent: dart-dataset-harvester/"));
        }
    }
}
