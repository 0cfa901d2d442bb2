// GitHubモジュール - リポジトリ検索とファイル取得をまとめたモジュール

pub mod client;
pub mod schemas;

pub use client::{GitHubClient, GitHubConfig, RepositorySource};
