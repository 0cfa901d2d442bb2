// 学習用レコードの組み立て

use crate::github::schemas::RepoDescriptor;

pub const CODE_START_MARKER: &str = "### CODE STARTS HERE";
pub const CODE_END_MARKER: &str = "### CODE ENDS HERE";

/// ヘッダ（リポジトリ情報と指示文）とコード本文を1つの文字列にまとめる
pub fn compose_record(repo: &RepoDescriptor, path: &str, body: &str) -> String {
    let prompt = format!(
        "# Repository: {}/{}\n\
         # Branch: {}\n\
         # Description: {}\n\
         # File: {}\n\
         # Review the code below and work out what it does:\n\
         {}\n",
        repo.owner, repo.name, repo.default_branch, repo.description, path, CODE_START_MARKER
    );
    let completion = format!("{}\n{}", body, CODE_END_MARKER);

    prompt + &completion
}
