use crate::downloader::test_helpers::{
    test_downloader, test_listing, wait_for_status, MockFetcher,
};
use crate::fetcher::VideoMetadata;
use crate::types::JobStatus;

#[tokio::test]
async fn list_recent_jobs_honours_explicit_and_default_limits() {
    let fetcher = MockFetcher::new();
    let (downloader, _dir) = test_downloader(fetcher.clone()).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(
            downloader
                .download_video(&format!("https://example.com/v{i}"))
                .await
                .unwrap(),
        );
    }
    for id in &ids {
        wait_for_status(&downloader, id, JobStatus::Completed).await;
    }

    let limited = downloader.list_recent_jobs(Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);

    // Default limit is 20, so all five come back
    let all = downloader.list_recent_jobs(None).await.unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn video_metadata_reports_live_fields_and_caps_description() {
    let fetcher = MockFetcher::new();
    fetcher.set_metadata(
        "https://example.com/v1",
        VideoMetadata {
            title: "Probed".to_string(),
            description: "d".repeat(2000),
            duration_secs: Some(99),
            uploader: Some("chan".to_string()),
            view_count: Some(12345),
            ..VideoMetadata::default()
        },
    );
    let (downloader, _dir) = test_downloader(fetcher.clone()).await;

    let report = downloader
        .video_metadata("https://example.com/v1")
        .await
        .unwrap();

    assert_eq!(report.title, "Probed");
    assert_eq!(report.duration_secs, Some(99));
    assert_eq!(report.uploader.as_deref(), Some("chan"));
    assert_eq!(report.view_count, Some(12345));
    assert_eq!(
        report.description.chars().count(),
        crate::utils::MAX_REPORT_DESCRIPTION_LEN,
        "metadata reports cap the description harder than storage does"
    );
    assert!(!report.downloaded, "nothing has been downloaded yet");
    assert!(report.file_path.is_none());
}

#[tokio::test]
async fn video_metadata_marks_urls_recorded_by_a_completed_job() {
    let fetcher = MockFetcher::new();
    fetcher.set_metadata(
        "https://example.com/v1",
        VideoMetadata {
            title: "Mine".to_string(),
            ..VideoMetadata::default()
        },
    );
    let (downloader, _dir) = test_downloader(fetcher.clone()).await;

    let id = downloader
        .download_video("https://example.com/v1")
        .await
        .unwrap();
    wait_for_status(&downloader, &id, JobStatus::Completed).await;

    let report = downloader
        .video_metadata("https://example.com/v1")
        .await
        .unwrap();
    assert!(report.downloaded);
    let path = report.file_path.expect("downloaded reports carry the path");
    assert!(path.to_string_lossy().ends_with("Mine.mp4"));
}

#[tokio::test]
async fn video_metadata_ignores_rows_from_failed_jobs() {
    let fetcher = MockFetcher::new();
    fetcher.fail_fetch_for("https://example.com/v1");
    let (downloader, _dir) = test_downloader(fetcher.clone()).await;

    let id = downloader
        .download_video("https://example.com/v1")
        .await
        .unwrap();
    wait_for_status(&downloader, &id, JobStatus::Failed).await;

    let report = downloader
        .video_metadata("https://example.com/v1")
        .await
        .unwrap();
    assert!(
        !report.downloaded,
        "a row whose job failed is not a download"
    );
}

#[tokio::test]
async fn video_metadata_propagates_probe_errors() {
    let fetcher = MockFetcher::new();
    fetcher.fail_probes();
    let (downloader, _dir) = test_downloader(fetcher.clone()).await;

    let err = downloader
        .video_metadata("https://example.com/v1")
        .await
        .unwrap_err();
    assert!(
        matches!(err, crate::error::Error::ExternalTool(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn playlist_metadata_joins_live_listing_with_recorded_members() {
    let fetcher = MockFetcher::new();
    fetcher.set_playlist(
        "https://example.com/list",
        test_listing(
            "My Mix",
            &["https://example.com/m1", "https://example.com/m2"],
        ),
    );
    let (downloader, _dir) = test_downloader(fetcher.clone()).await;

    let id = downloader
        .download_playlist("https://example.com/list", None)
        .await
        .unwrap();
    wait_for_status(&downloader, &id, JobStatus::Completed).await;

    let report = downloader
        .playlist_metadata("https://example.com/list")
        .await
        .unwrap();

    assert_eq!(report.title, "My Mix");
    assert_eq!(report.member_count, 2);
    assert_eq!(report.downloaded_items.len(), 2);
    assert_eq!(report.downloaded_items[0].position, 1);
    assert_eq!(report.downloaded_items[1].position, 2);
}

#[tokio::test]
async fn playlist_metadata_with_no_local_rows_has_empty_items() {
    let fetcher = MockFetcher::new();
    fetcher.set_playlist(
        "https://example.com/list",
        test_listing("Fresh", &["https://example.com/m1"]),
    );
    let (downloader, _dir) = test_downloader(fetcher.clone()).await;

    let report = downloader
        .playlist_metadata("https://example.com/list")
        .await
        .unwrap();
    assert_eq!(report.title, "Fresh");
    assert!(report.downloaded_items.is_empty());
}

#[tokio::test]
async fn job_status_of_unknown_job_is_not_found() {
    let (downloader, _dir) = test_downloader(MockFetcher::new()).await;

    let err = downloader
        .job_status(&crate::types::JobId::from("ghost"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            crate::error::Error::Job(crate::error::JobError::NotFound { .. })
        ),
        "got {err:?}"
    );
}
