// GitHub API 応答のスキーマ定義

use serde::Deserialize;

/// 未設定・null の説明文に使うプレースホルダ
pub const DESCRIPTION_PLACEHOLDER: &str = "No description";

/// ブランチ名が返らなかった場合のフォールバック
pub const FALLBACK_BRANCH: &str = "master";

/// リポジトリ検索APIの応答
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// 検索結果（キーが無い場合は None）
    pub items: Option<Vec<SearchItem>>,
}

/// 検索結果の1リポジトリ
#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub name: String,
    pub owner: RepoOwner,
    pub default_branch: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

/// 検索1ページ分のリポジトリ一覧
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchPage {
    pub repositories: Vec<RepoDescriptor>,
}

/// データセット生成に必要なリポジトリ情報
#[derive(Clone, Debug, PartialEq)]
pub struct RepoDescriptor {
    /// リポジトリオーナー名
    pub owner: String,
    /// リポジトリ名
    pub name: String,
    /// デフォルトブランチ
    pub default_branch: String,
    /// リポジトリの説明
    pub description: String,
}

impl From<SearchItem> for RepoDescriptor {
    fn from(item: SearchItem) -> Self {
        RepoDescriptor {
            owner: item.owner.login,
            name: item.name,
            default_branch: item
                .default_branch
                .unwrap_or_else(|| FALLBACK_BRANCH.to_string()),
            description: item
                .description
                .unwrap_or_else(|| DESCRIPTION_PLACEHOLDER.to_string()),
        }
    }
}

/// リポジトリのファイルツリー情報
#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    /// ツリー内のアイテム一覧
    pub tree: Option<Vec<TreeEntry>>,
    /// GitHub側で一覧が打ち切られたかどうか
    #[serde(default)]
    pub truncated: bool,
}

/// リポジトリツリー内のアイテム
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TreeEntry {
    /// ファイルパス
    pub path: String,
    /// アイテムタイプ
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    // サブモジュール（commit）など
    #[serde(other)]
    Other,
}

impl TreeEntry {
    /// 拡張子が一致するファイル（blob）かどうか
    pub fn is_blob_with_suffix(&self, suffix: &str) -> bool {
        self.kind == EntryKind::Blob && self.path.ends_with(suffix)
    }
}

/// GitHubファイルコンテンツ
#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    /// ファイルコンテンツ（通常はBase64エンコードされている）
    pub content: Option<String>,
    /// エンコーディング（"base64"など）
    pub encoding: Option<String>,
}
