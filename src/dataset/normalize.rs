// コメント除去と空行の整理
//
// 正規表現による単純な置換で、言語の構文は解釈しない。
// 文字列リテラル内の `//` や `/*` もコメントとして削除される。

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment pattern"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//.*").expect("valid line comment pattern"));

/// ブロックコメント・行コメントを取り除き、空行を詰める
pub fn normalize(code: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(code, "");
    let without_lines = LINE_COMMENT.replace_all(&without_blocks, "");

    without_lines
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
