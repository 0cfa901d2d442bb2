// dart-dataset-harvester - GitHubのDartコードからファインチューニング用データセットを作るツール

mod dataset;
mod github;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use log::{LevelFilter, info};
use simple_logger::SimpleLogger;

use dataset::{DatasetBuilder, FixedPacing, HarvestConfig, NoPacing, PacingPolicy};
use github::{GitHubClient, GitHubConfig};

// コマンドライン引数の定義

#[derive(Parser, Debug)]
#[clap(
    name = "dart-dataset-harvester",
    about = "GitHubのコードを収集してCSVデータセットを作成するツール",
    version
)]
struct Args {
    /// GitHubのアクセストークン
    #[clap(
        long,
        env = "GITHUB_TOKEN",
        default_value = "Github-Token",
        hide_env_values = true
    )]
    github_token: String,

    /// GitHub APIのベースURL
    #[clap(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    api_url: String,

    /// リポジトリ検索のキーワード
    #[clap(long, default_value = "flutter")]
    query: String,

    /// 1ページあたりのリポジトリ数
    #[clap(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=100))]
    per_page: u32,

    /// 取得するページ数
    #[clap(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,

    /// 対象ファイルの拡張子
    #[clap(long, default_value = ".dart")]
    extension: String,

    /// 出力CSVファイル
    #[clap(long, default_value = "flutter_code_finetune_data.csv")]
    output: PathBuf,

    /// ファイル取得ごとの待機時間（ミリ秒）
    #[clap(long, default_value = "500")]
    file_delay_ms: u64,

    /// リポジトリごとの待機時間（ミリ秒）
    #[clap(long, default_value = "1000")]
    repo_delay_ms: u64,

    /// ページごとの待機時間（ミリ秒）
    #[clap(long, default_value = "2000")]
    page_delay_ms: u64,

    /// 待機を一切行わない
    #[clap(long)]
    no_pacing: bool,

    /// ログレベル (off, error, warn, info, debug, trace)
    #[clap(long, default_value = "info", value_parser = clap::value_parser!(LevelFilter))]
    log_level: LevelFilter,
}

impl Args {
    fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            token: self.github_token.clone(),
            api_url: self.api_url.clone(),
        }
    }

    fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig {
            query: self.query.clone(),
            per_page: self.per_page,
            total_pages: self.pages,
            extension: self.extension.clone(),
        }
    }

    fn pacing(&self) -> Box<dyn PacingPolicy> {
        if self.no_pacing {
            return Box::new(NoPacing);
        }
        Box::new(FixedPacing {
            after_file: Duration::from_millis(self.file_delay_ms),
            after_repository: Duration::from_millis(self.repo_delay_ms),
            after_page: Duration::from_millis(self.page_delay_ms),
        })
    }
}

// メイン関数
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .envファイルを読み込み
    dotenv().ok();

    // コマンドライン引数を解析
    let args = Args::parse();

    // ロガー初期化
    SimpleLogger::new().with_level(args.log_level).init()?;

    let github_client = GitHubClient::new(args.github_config())?;
    let harvest = args.harvest_config();

    info!("🚀 データセット収集開始");
    info!(
        "検索キーワード: {} / ページ数: {} / ページあたり: {}",
        harvest.query, harvest.total_pages, harvest.per_page
    );

    let builder = DatasetBuilder::new(&github_client, args.pacing(), harvest);
    let summary = builder.build_file(&args.output).await?;

    info!(
        "📊 ページ: {} 成功 / {} スキップ, リポジトリ: {} 件 ({} スキップ), ファイル: {} 件 ({} スキップ)",
        summary.pages_fetched,
        summary.pages_skipped,
        summary.repositories_seen,
        summary.repositories_skipped,
        summary.files_matched,
        summary.files_skipped
    );
    info!(
        "✅ {} 件のレコードを {} に保存しました（所要時間 {}秒）",
        summary.records_written,
        args.output.display(),
        summary.elapsed().num_seconds()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_run() {
        let args = Args::try_parse_from(["dart-dataset-harvester"]).unwrap();
        let harvest = args.harvest_config();
        assert_eq!(harvest.query, "flutter");
        assert_eq!(harvest.per_page, 10);
        assert_eq!(harvest.total_pages, 1);
        assert_eq!(harvest.extension, ".dart");
        assert_eq!(args.output, PathBuf::from("flutter_code_finetune_data.csv"));
    }

    #[test]
    fn rejects_zero_pages_and_oversized_pages() {
        assert!(Args::try_parse_from(["h", "--pages", "0"]).is_err());
        assert!(Args::try_parse_from(["h", "--per-page", "0"]).is_err());
        assert!(Args::try_parse_from(["h", "--per-page", "101"]).is_err());
    }

    #[test]
    fn log_level_is_checked_by_clap() {
        let args = Args::try_parse_from(["h"]).unwrap();
        assert_eq!(args.log_level, LevelFilter::Info);

        let args = Args::try_parse_from(["h", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, LevelFilter::Debug);

        assert!(Args::try_parse_from(["h", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn pacing_flags() {
        use dataset::pacing::PacePoint;

        let args = Args::try_parse_from(["h", "--file-delay-ms", "10"]).unwrap();
        assert_eq!(args.pacing().delay(PacePoint::AfterFile), Duration::from_millis(10));
        assert_eq!(args.pacing().delay(PacePoint::AfterPage), Duration::from_secs(2));

        let args = Args::try_parse_from(["h", "--no-pacing"]).unwrap();
        assert_eq!(args.pacing().delay(PacePoint::AfterRepository), Duration::ZERO);
    }
}
