//! ゲノム処理パイプラインのクライアントコア。
//! アップロード → ステータスポーリング → 成果物ダウンロードの
//! ジョブライフサイクルをバックエンドの権威ステータスと整合させる。

pub mod domain;
pub mod infra;
pub mod usecase;
