// APIのレート制限を避けるための待機ポリシー

use std::time::Duration;

/// 待機を挟むタイミング
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacePoint {
    /// ファイル1件の取得後
    AfterFile,
    /// リポジトリ1件の処理後
    AfterRepository,
    /// 検索1ページの処理後
    AfterPage,
}

/// 次のリクエストまでの待ち時間を決める
pub trait PacingPolicy {
    fn delay(&self, point: PacePoint) -> Duration;
}

/// 状況に関係なく固定時間だけ待つ
#[derive(Clone, Debug)]
pub struct FixedPacing {
    pub after_file: Duration,
    pub after_repository: Duration,
    pub after_page: Duration,
}

impl Default for FixedPacing {
    fn default() -> Self {
        FixedPacing {
            after_file: Duration::from_millis(500),
            after_repository: Duration::from_secs(1),
            after_page: Duration::from_secs(2),
        }
    }
}

impl PacingPolicy for FixedPacing {
    fn delay(&self, point: PacePoint) -> Duration {
        match point {
            PacePoint::AfterFile => self.after_file,
            PacePoint::AfterRepository => self.after_repository,
            PacePoint::AfterPage => self.after_page,
        }
    }
}

/// 待機しない（テストや --no-pacing 用）
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPacing;

impl PacingPolicy for NoPacing {
    fn delay(&self, _point: PacePoint) -> Duration {
        Duration::ZERO
    }
}

impl<P: PacingPolicy + ?Sized> PacingPolicy for Box<P> {
    fn delay(&self, point: PacePoint) -> Duration {
        (**self).delay(point)
    }
}

impl<P: PacingPolicy + ?Sized> PacingPolicy for &P {
    fn delay(&self, point: PacePoint) -> Duration {
        (**self).delay(point)
    }
}
