use std::io::Write;
use std::time::Duration;

use epg_live::{
    Annotator,
    config::Config,
    errors::{AppError, SourceError},
    utils::parse_clock_override,
};

const GUIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv>
  <channel id="ES1"><display-name>Example Sports One</display-name></channel>
  <programme start="20251223131000 +0000" stop="20251223150000 +0000" channel="ES1">
    <title>Team A vs Team B</title>
  </programme>
</tv>
"#;

const PLAYLIST: &str = "#EXTM3U\n#EXTINF:-1,ExampleSports 1\nhttp://example.invalid/es1\n";

fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(bytes).unwrap();
    path.to_str().unwrap().to_string()
}

#[cfg(feature = "compression-gzip")]
#[tokio::test]
async fn test_gzipped_guide_from_disk() {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let dir = tempfile::tempdir().unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(GUIDE.as_bytes()).unwrap();

    let mut config = Config::default();
    config.sources.epg = write_file(&dir, "guide.xml.gz", &encoder.finish().unwrap());
    config.sources.playlist = write_file(&dir, "playlist.m3u", PLAYLIST.as_bytes());
    config.sources.fetch_timeout = Duration::from_secs(5);

    let annotator = Annotator::new(&config).unwrap();
    let now = parse_clock_override("2025-12-23 20:00", annotator.timezone()).unwrap();
    let annotation = annotator
        .load_and_annotate(&config.sources, Some(now))
        .await
        .unwrap();

    assert_eq!(annotation.now, now);
    assert!(annotation.playlist.contains("group-title=\"LIVE NOW 23 DECEMBER 2025\""));
    assert!(annotation.playlist.contains("🔴 LIVE • 20:10 WIB • Team A vs Team B"));
    assert_eq!(annotation.diagnostics.emitted_entries, 1);
}

#[tokio::test]
async fn test_plain_guide_from_disk() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.sources.epg = write_file(&dir, "guide.xml", GUIDE.as_bytes());
    config.sources.playlist = write_file(&dir, "playlist.m3u", PLAYLIST.as_bytes());

    let annotator = Annotator::new(&config).unwrap();
    let now = parse_clock_override("2025-12-23T13:00:00Z", annotator.timezone()).unwrap();
    let annotation = annotator
        .load_and_annotate(&config.sources, Some(now))
        .await
        .unwrap();

    assert_eq!(annotation.diagnostics.emitted_entries, 1);
}

#[tokio::test]
async fn test_missing_playlist_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.sources.epg = write_file(&dir, "guide.xml", GUIDE.as_bytes());
    config.sources.playlist = dir.path().join("absent.m3u").to_str().unwrap().to_string();

    let annotator = Annotator::new(&config).unwrap();
    let result = annotator.load_and_annotate(&config.sources, None).await;

    assert!(matches!(
        result,
        Err(AppError::Source(SourceError::Fetch { .. }))
    ));
}

#[tokio::test]
async fn test_broken_guide_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.sources.epg = write_file(&dir, "guide.xml", b"<tv><channel id=\"x\"></tv>");
    config.sources.playlist = write_file(&dir, "playlist.m3u", PLAYLIST.as_bytes());

    let annotator = Annotator::new(&config).unwrap();
    let result = annotator.load_and_annotate(&config.sources, None).await;

    assert!(matches!(
        result,
        Err(AppError::Source(SourceError::ParseError { .. }))
    ));
}

#[tokio::test]
async fn test_empty_epg_location_uses_playlist_header() {
    let dir = tempfile::tempdir().unwrap();
    let guide = write_file(&dir, "guide.xml", GUIDE.as_bytes());
    let playlist = format!("#EXTM3U url-tvg=\"{guide}\"\n#EXTINF:-1,ExampleSports 1\nhttp://example.invalid/es1\n");

    let mut config = Config::default();
    config.sources.epg = String::new();
    config.sources.playlist = write_file(&dir, "playlist.m3u", playlist.as_bytes());

    let annotator = Annotator::new(&config).unwrap();
    let now = parse_clock_override("2025-12-23 20:00", annotator.timezone()).unwrap();
    let annotation = annotator
        .load_and_annotate(&config.sources, Some(now))
        .await
        .unwrap();

    assert!(annotation.playlist.starts_with(&format!("#EXTM3U url-tvg=\"{guide}\"\n")));
    assert_eq!(annotation.diagnostics.emitted_entries, 1);
}

#[tokio::test]
async fn test_empty_epg_location_without_header_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.sources.epg = String::new();
    config.sources.playlist = write_file(&dir, "playlist.m3u", PLAYLIST.as_bytes());

    let annotator = Annotator::new(&config).unwrap();
    let result = annotator.load_and_annotate(&config.sources, None).await;

    assert!(matches!(result, Err(AppError::Configuration { .. })));
}

#[tokio::test]
async fn test_latin1_playlist_title_does_not_abort_run() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.sources.epg = write_file(&dir, "guide.xml", GUIDE.as_bytes());
    config.sources.playlist = write_file(
        &dir,
        "playlist.m3u",
        b"#EXTM3U\n#EXTINF:-1,ExampleSports 1 \xe9\nhttp://example.invalid/es1\n",
    );

    let annotator = Annotator::new(&config).unwrap();
    let now = parse_clock_override("2025-12-23 20:00", annotator.timezone()).unwrap();
    let annotation = annotator
        .load_and_annotate(&config.sources, Some(now))
        .await
        .unwrap();

    assert_eq!(annotation.diagnostics.emitted_entries, 1);
    assert!(annotation.playlist.contains("http://example.invalid/es1"));
}
