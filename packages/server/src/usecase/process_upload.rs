//! UseCase: 動画アップロード処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ProcessUploadUseCase::execute() / post_process() メソッド
//! - ファイル名の検証、保存、サムネイル生成と再生時間取得
//!
//! ### なぜこのテストが必要か
//! - パストラバーサルを含むファイル名で保存先の外に書き込まない
//! - 変換ツールが失敗してもアップロード自体は成功扱いになる
//!
//! ### どのような状況を想定しているか
//! - 正常系：保存とサムネイル生成・再生時間取得
//! - 異常系：不正なファイル名、変換ツールの失敗

use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::{
    domain::{MediaFileName, Transcoder},
    infrastructure::media::LocalVideoStore,
};

use super::error::UploadError;

/// サムネイルを切り出す再生位置
pub const THUMBNAIL_OFFSET: &str = "00:00:05";

/// 後処理の結果。失敗した項目はログに残して続行する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostProcessReport {
    pub thumbnail_generated: bool,
    pub transcoded: bool,
    /// 秒
    pub duration: Option<f64>,
}

/// 動画アップロードのユースケース
pub struct ProcessUploadUseCase {
    store: LocalVideoStore,
    transcoder: Arc<dyn Transcoder>,
    /// アップロード後に Web 向けの再エンコードも行うか
    transcode_on_upload: bool,
}

impl ProcessUploadUseCase {
    /// 新しい ProcessUploadUseCase を作成
    pub fn new(
        store: LocalVideoStore,
        transcoder: Arc<dyn Transcoder>,
        transcode_on_upload: bool,
    ) -> Self {
        Self {
            store,
            transcoder,
            transcode_on_upload,
        }
    }

    /// アップロードされた動画を保存する
    ///
    /// # Returns
    ///
    /// * `Ok(MediaFileName)` - 保存したファイル名
    /// * `Err(UploadError)` - ファイル名が不正、または書き込みに失敗
    pub async fn execute<R>(&self, filename: String, reader: R) -> Result<MediaFileName, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let name = MediaFileName::new(filename)?;
        self.store.save(&name, reader).await?;
        tracing::info!("Video uploaded: {}", name);
        Ok(name)
    }

    /// サムネイル生成と再生時間の取得（失敗しても警告のみ）
    pub async fn post_process(&self, name: &MediaFileName) -> PostProcessReport {
        let input = self.store.video_path(name);
        let mut report = PostProcessReport::default();

        let thumbnail = self.store.thumbnail_path_for_video(name);
        match self
            .transcoder
            .generate_thumbnail(&input, &thumbnail, THUMBNAIL_OFFSET)
            .await
        {
            Ok(()) => report.thumbnail_generated = true,
            Err(e) => tracing::warn!("Could not generate thumbnail for {}: {}", name, e),
        }

        match self.transcoder.probe_duration(&input).await {
            Ok(duration) => {
                tracing::info!("Video duration of {}: {:.2} seconds", name, duration);
                report.duration = Some(duration);
            }
            Err(e) => tracing::warn!("Could not get video duration of {}: {}", name, e),
        }

        if self.transcode_on_upload {
            let output = self
                .store
                .videos_dir()
                .join(format!("{}.web.mp4", name.stem()));
            match self.transcoder.transcode(&input, &output).await {
                Ok(()) => report.transcoded = true,
                Err(e) => tracing::warn!("Could not transcode {}: {}", name, e),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::{MockTranscoder, TranscodeError, ValueObjectError};

    struct TempStore {
        root: PathBuf,
        store: LocalVideoStore,
    }

    impl TempStore {
        async fn new() -> Self {
            let root =
                std::env::temp_dir().join(format!("watchparty-upload-{}", uuid::Uuid::new_v4()));
            let store = LocalVideoStore::new(root.join("videos"), root.join("thumbnails"));
            store.ensure_dirs().await.unwrap();
            Self { root, store }
        }
    }

    impl Drop for TempStore {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    fn failure(tool: &str) -> TranscodeError {
        TranscodeError::Failed {
            tool: tool.to_string(),
            status: "exit status: 1".to_string(),
            output: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_is_saved_and_post_processed() {
        // テスト項目: 保存後にサムネイル生成と再生時間取得が行われる
        // given (前提条件):
        let temp = TempStore::new().await;
        let video = temp.store.videos_dir().join("trip.mp4");
        let thumbnail = temp.store.thumbnails_dir().join("trip.jpg");
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_generate_thumbnail()
            .withf(move |input, output, offset| {
                input == video.as_path() && output == thumbnail.as_path() && offset == "00:00:05"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        transcoder
            .expect_probe_duration()
            .times(1)
            .returning(|_| Ok(93.5));
        transcoder.expect_transcode().never();
        let usecase = ProcessUploadUseCase::new(temp.store.clone(), Arc::new(transcoder), false);

        // when (操作):
        let name = usecase
            .execute("trip.mp4".to_string(), &b"fake video"[..])
            .await
            .unwrap();
        let report = usecase.post_process(&name).await;

        // then (期待する結果):
        let saved = tokio::fs::read(temp.store.videos_dir().join("trip.mp4"))
            .await
            .unwrap();
        assert_eq!(saved, b"fake video");
        assert_eq!(
            report,
            PostProcessReport {
                thumbnail_generated: true,
                transcoded: false,
                duration: Some(93.5),
            }
        );
    }

    #[tokio::test]
    async fn test_tool_failures_do_not_fail_the_upload() {
        // テスト項目: 変換ツールが全て失敗してもアップロードは成功する
        // given (前提条件):
        let temp = TempStore::new().await;
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_generate_thumbnail()
            .returning(|_, _, _| Err(failure("ffmpeg")));
        transcoder
            .expect_probe_duration()
            .returning(|_| Err(failure("ffprobe")));
        let input = temp.store.videos_dir().join("clip.mov");
        let output = temp.store.videos_dir().join("clip.web.mp4");
        transcoder
            .expect_transcode()
            .withf(move |i, o| i == input.as_path() && o == output.as_path())
            .times(1)
            .returning(|_, _| Err(failure("ffmpeg")));
        let usecase = ProcessUploadUseCase::new(temp.store.clone(), Arc::new(transcoder), true);

        // when (操作):
        let result = usecase.execute("clip.mov".to_string(), &b"data"[..]).await;
        let report = usecase.post_process(result.as_ref().unwrap()).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(report, PostProcessReport::default());
    }

    #[tokio::test]
    async fn test_path_traversal_name_is_rejected() {
        // テスト項目: パストラバーサルを含むファイル名は保存されない
        // given (前提条件):
        let temp = TempStore::new().await;
        let usecase =
            ProcessUploadUseCase::new(temp.store.clone(), Arc::new(MockTranscoder::new()), false);

        // when (操作):
        let result = usecase
            .execute("../escape.mp4".to_string(), &b"data"[..])
            .await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(UploadError::InvalidName(ValueObjectError::PathTraversal(_)))
        ));
        assert!(!tokio::fs::try_exists(temp.root.join("escape.mp4")).await.unwrap());
    }

    #[tokio::test]
    async fn test_interrupted_body_is_reported_and_not_kept() {
        // テスト項目: 途中で切れたボディは Interrupted になり、動画は保存されず後処理も走らない
        // given (前提条件):
        let temp = TempStore::new().await;
        let mut transcoder = MockTranscoder::new();
        transcoder.expect_generate_thumbnail().never();
        transcoder.expect_probe_duration().never();
        let usecase = ProcessUploadUseCase::new(temp.store.clone(), Arc::new(transcoder), false);
        let chunks: Vec<std::io::Result<&'static [u8]>> = vec![
            Ok(b"partial".as_slice()),
            Err(std::io::Error::other("stream reset")),
        ];
        let body = tokio_util::io::StreamReader::new(futures_util::stream::iter(chunks));

        // when (操作):
        let result = usecase.execute("big.mp4".to_string(), body).await;

        // then (期待する結果):
        assert!(matches!(result, Err(UploadError::Interrupted(_))));
        assert!(
            !tokio::fs::try_exists(temp.store.videos_dir().join("big.mp4"))
                .await
                .unwrap()
        );
    }
}
