// データセットモジュール - 取得したコードを学習用レコードに変換して保存する

pub mod builder;
pub mod normalize;
pub mod pacing;
pub mod record;

pub use builder::{DatasetBuilder, HarvestConfig};
pub use pacing::{FixedPacing, NoPacing, PacingPolicy};
