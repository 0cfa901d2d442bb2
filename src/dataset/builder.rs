// データセット生成
//
// 検索ページ → リポジトリ → ファイル の順に逐次処理し、
// 取得できたファイルだけを CSV の "text" 列に1行ずつ追記する。
// リモートの失敗はその場でログに出してスキップし、上には伝播させない。

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::time;

use super::normalize::normalize;
use super::pacing::{PacePoint, PacingPolicy};
use super::record::compose_record;
use crate::github::RepositorySource;
use crate::github::schemas::{RepoDescriptor, TreeEntry};

/// CSVのヘッダ行
pub const TEXT_COLUMN: &str = "text";

/// 収集対象の設定
#[derive(Clone, Debug)]
pub struct HarvestConfig {
    /// 検索キーワード
    pub query: String,
    /// 1ページあたりのリポジトリ数
    pub per_page: u32,
    /// 取得するページ数
    pub total_pages: u32,
    /// 対象ファイルの拡張子
    pub extension: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            query: "flutter".to_string(),
            per_page: 10,
            total_pages: 1,
            extension: ".dart".to_string(),
        }
    }
}

/// 実行結果の集計
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub repositories_seen: usize,
    pub repositories_skipped: usize,
    pub files_matched: usize,
    pub records_written: usize,
    pub files_skipped: usize,
}

impl RunSummary {
    fn start() -> Self {
        let now = Utc::now();
        RunSummary {
            started_at: now,
            finished_at: now,
            pages_fetched: 0,
            pages_skipped: 0,
            repositories_seen: 0,
            repositories_skipped: 0,
            files_matched: 0,
            records_written: 0,
            files_skipped: 0,
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// ツリーから対象拡張子のファイル（blob）だけを取り出す
pub fn select_entries<'a>(
    entries: &'a [TreeEntry],
    suffix: &'a str,
) -> impl Iterator<Item = &'a TreeEntry> + 'a {
    entries
        .iter()
        .filter(move |entry| entry.is_blob_with_suffix(suffix))
}

pub struct DatasetBuilder<'a, S, P> {
    source: &'a S,
    pacing: P,
    config: HarvestConfig,
}

impl<'a, S, P> DatasetBuilder<'a, S, P>
where
    S: RepositorySource,
    P: PacingPolicy,
{
    pub fn new(source: &'a S, pacing: P, config: HarvestConfig) -> Self {
        DatasetBuilder {
            source,
            pacing,
            config,
        }
    }

    /// 出力ファイルを作成してデータセットを書き出す
    ///
    /// ファイルはループの前に開き、途中でエラーになってもスコープを抜けた時点で閉じられる。
    pub async fn build_file(&self, output: &Path) -> Result<RunSummary> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_path(output)
            .with_context(|| format!("出力ファイルを作成できません: {}", output.display()))?;

        let summary = self.build(&mut writer).await?;

        writer
            .flush()
            .with_context(|| format!("出力ファイルへの書き込みに失敗: {}", output.display()))?;
        Ok(summary)
    }

    /// ヘッダ行と各レコードを writer に書き出す
    pub async fn build<W: io::Write>(&self, writer: &mut csv::Writer<W>) -> Result<RunSummary> {
        let mut summary = RunSummary::start();
        writer.write_record([TEXT_COLUMN])?;

        for page in 1..=self.config.total_pages {
            info!("🔍 ページ {} を取得中...", page);

            match self
                .source
                .search(&self.config.query, self.config.per_page, page)
                .await
            {
                Ok(result) => {
                    summary.pages_fetched += 1;
                    debug!("ページ {}: {} 件のリポジトリ", page, result.repositories.len());
                    for repo in &result.repositories {
                        self.process_repository(repo, writer, &mut summary).await?;
                    }
                }
                Err(e) => {
                    error!("❌ リポジトリ検索エラー (ページ {}): {}", page, e);
                    summary.pages_skipped += 1;
                }
            }

            self.pace(PacePoint::AfterPage).await;
        }

        summary.finished_at = Utc::now();
        Ok(summary)
    }

    async fn process_repository<W: io::Write>(
        &self,
        repo: &RepoDescriptor,
        writer: &mut csv::Writer<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        info!(
            "📦 リポジトリ処理中: {}/{} (branch: {})",
            repo.owner, repo.name, repo.default_branch
        );
        summary.repositories_seen += 1;

        match self
            .source
            .list_tree(&repo.owner, &repo.name, &repo.default_branch)
            .await
        {
            Ok(tree) if tree.is_empty() => {
                warn!("⚠️ ツリーが空です: {}/{}", repo.owner, repo.name);
                summary.repositories_skipped += 1;
            }
            Ok(tree) => {
                for entry in select_entries(&tree, &self.config.extension) {
                    self.process_file(repo, entry, writer, summary).await?;
                }
            }
            Err(e) => {
                error!("❌ ツリー取得エラー: {}/{} - {}", repo.owner, repo.name, e);
                summary.repositories_skipped += 1;
            }
        }

        self.pace(PacePoint::AfterRepository).await;
        Ok(())
    }

    async fn process_file<W: io::Write>(
        &self,
        repo: &RepoDescriptor,
        entry: &TreeEntry,
        writer: &mut csv::Writer<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        info!("  ⬇️ ファイル取得中: {}", entry.path);
        summary.files_matched += 1;

        match self
            .source
            .fetch_file_content(&repo.owner, &repo.name, &entry.path)
            .await
        {
            Ok(Some(code)) if !code.is_empty() => {
                let body = normalize(&code);
                let record = compose_record(repo, &entry.path, &body);
                writer.write_record([record.as_str()])?;
                summary.records_written += 1;
            }
            Ok(_) => {
                debug!("本文なしのためスキップ: {}", entry.path);
                summary.files_skipped += 1;
            }
            Err(e) => {
                error!(
                    "⚠️ ファイル取得失敗: {}/{} - {} - {}",
                    repo.owner, repo.name, entry.path, e
                );
                summary.files_skipped += 1;
            }
        }

        self.pace(PacePoint::AfterFile).await;
        Ok(())
    }

    async fn pace(&self, point: PacePoint) {
        let delay = self.pacing.delay(point);
        if !delay.is_zero() {
            time::sleep(delay).await;
        }
    }
}
