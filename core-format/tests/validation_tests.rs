//! Integration tests for structural validation
//!
//! These tests verify:
//! - Well-formed files validate with full confidence
//! - Missing mandatory structures are reported with typed errors
//! - A format mismatch zeroes the confidence
//! - In-memory validation leaves no scratch files behind

mod common;

use common::*;
use core_format::{
    AudioFormat, FormatError, IntegrityError, IssueKind, Severity, StructuralError,
};
use std::collections::HashSet;
use tempfile::TempDir;

#[tokio::test]
async fn test_flac_with_stream_info_is_valid() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("flac", 1));
    let path = write(&dir, "song.flac", &flac(true));

    let result = service.validate(&path, AudioFormat::Flac).await.unwrap();
    assert!(result.is_valid, "{:?}", result.issues);
    assert!((result.confidence - 1.0).abs() < 1e-9);
    assert_eq!(result.detected_format, AudioFormat::Flac);
    assert!(result.issues.is_empty());
}

#[tokio::test]
async fn test_flac_without_stream_info_is_invalid() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("flac", 1));
    let path = write(&dir, "broken.flac", &flac(false));

    let result = service.validate(&path, AudioFormat::Flac).await.unwrap();
    assert!(!result.is_valid);
    assert_eq!(result.detected_format, AudioFormat::Flac);
    assert_eq!(
        result.structural.error,
        Some(StructuralError::MissingBlock("STREAMINFO".to_string()))
    );
    assert!(result
        .errors()
        .iter()
        .any(|err| matches!(err, FormatError::StructuralMismatch(_))));
}

#[tokio::test]
async fn test_tag_only_mp3_has_too_few_frames() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, unplayable_prober());

    let mut data = vec![0u8; 2];
    data.extend_from_slice(&id3v1("Test", "", 0, 255));
    let path = write(&dir, "tag_only.mp3", &data);

    let result = service.validate(&path, AudioFormat::Mp3).await.unwrap();
    assert!(!result.is_valid);

    let structural = result.structural.error.as_ref().unwrap();
    assert_eq!(
        structural.to_string(),
        "insufficient frames, found 0, expected ≥10"
    );
    assert_eq!(
        result.integrity.error,
        Some(IntegrityError::TooSmall { size: 130, minimum: 1024 })
    );
    assert!(result
        .issues
        .iter()
        .any(|issue| issue.kind == IssueKind::Id3v1Trailer && issue.severity == Severity::Info));
}

#[tokio::test]
async fn test_mp3_stream_is_valid() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("mp3", 1));
    let path = write(&dir, "song.mp3", &mp3_frames(40));

    let result = service.validate(&path, AudioFormat::Mp3).await.unwrap();
    assert!(result.is_valid, "{:?}", result.issues);
    assert!(result.structural.units >= 10);
    assert!(result.confidence > 0.5);
}

#[tokio::test]
async fn test_format_mismatch_zeroes_confidence() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("flac", 1));
    let path = write(&dir, "song.flac", &flac(true));

    let result = service.validate(&path, AudioFormat::Mp3).await.unwrap();
    assert!(!result.is_valid);
    assert_eq!(result.confidence, 0.0);
    assert!(result.has_issue(|kind| matches!(
        kind,
        IssueKind::FormatMismatch {
            expected: AudioFormat::Mp3,
            detected: AudioFormat::Flac,
        }
    )));
}

#[tokio::test]
async fn test_container_formats_validate() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("alac", 2));

    let alac = write(&dir, "lossless.m4a", &m4a(b"alac"));
    let result = service.validate(&alac, AudioFormat::Alac).await.unwrap();
    assert!(result.is_valid, "{:?}", result.issues);

    // ALAC sits inside the M4A container, so that expectation matches too.
    let result = service.validate(&alac, AudioFormat::M4a).await.unwrap();
    assert!(result.is_valid, "{:?}", result.issues);
}

#[tokio::test]
async fn test_unplayable_mp4_is_not_confirmed() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, unplayable_prober());
    let path = write(&dir, "song.m4a", &m4a(b"mp4a"));

    let result = service.validate(&path, AudioFormat::M4a).await.unwrap();
    assert!(!result.is_valid);
    assert!(matches!(
        result.structural.error,
        Some(StructuralError::CodecUnverified(_))
    ));
}

#[tokio::test]
async fn test_playable_mp4_without_tracks_is_not_confirmed() {
    let dir = TempDir::new().unwrap();
    let mut prober = MockProber::new();
    prober
        .expect_introspect()
        .returning(|_| Ok(bridge_traits::IntrospectionReport::playable(Vec::new())));
    let service = service(&dir, prober);
    let path = write(&dir, "song.m4a", &m4a(b"mp4a"));

    let result = service.validate(&path, AudioFormat::M4a).await.unwrap();
    assert!(matches!(
        result.structural.error,
        Some(StructuralError::CodecUnverified(_))
    ));
}

#[tokio::test]
async fn test_ogg_pages_are_counted() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("vorbis", 1));
    let path = write(&dir, "song.ogg", &ogg_vorbis(10));

    let result = service.validate(&path, AudioFormat::Ogg).await.unwrap();
    assert!(result.is_valid, "{:?}", result.issues);
    assert_eq!(result.structural.units, 10);
}

#[tokio::test]
async fn test_wav_and_aiff_validate() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("pcm_s16le", 2));

    let wav_path = write(&dir, "song.wav", &wav());
    let result = service.validate(&wav_path, AudioFormat::Wav).await.unwrap();
    assert!(result.is_valid, "{:?}", result.issues);

    let aiff_path = write(&dir, "song.aiff", &aiff());
    let result = service.validate(&aiff_path, AudioFormat::Aiff).await.unwrap();
    assert!(result.is_valid, "{:?}", result.issues);
    assert_eq!(result.structural.confidence, 0.8);
}

#[tokio::test]
async fn test_unknown_expected_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, silent_prober());
    let path = write(&dir, "song.flac", &flac(true));

    let err = service
        .validate(&path, AudioFormat::Unknown)
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn test_validate_bytes_cleans_up() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("flac", 1));

    let result = service
        .validate_bytes(flac(true), AudioFormat::Flac)
        .await
        .unwrap();
    assert!(result.is_valid, "{:?}", result.issues);

    let leftovers = std::fs::read_dir(dir.path().join("scratch")).unwrap().count();
    assert_eq!(leftovers, 0);
    assert_eq!(service.cache_stats().await.detection.entries, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_validate_batch_keeps_order() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir, playable_prober("flac", 3));

    let paths = vec![
        write(&dir, "one.flac", &flac(true)),
        write(&dir, "two.flac", &flac(false)),
        write(&dir, "three.flac", &flac(true)),
    ];

    let entries = service.validate_batch(paths.clone(), AudioFormat::Flac).await;
    let validity: Vec<bool> = entries
        .iter()
        .map(|entry| entry.result.as_ref().unwrap().is_valid)
        .collect();
    assert_eq!(validity, vec![true, false, true]);
    for (entry, path) in entries.iter().zip(&paths) {
        assert_eq!(&entry.path, path);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_validate_batch_of_fifty() {
    let dir = TempDir::new().unwrap();
    // Missing files fail before the introspector is reached.
    let service = service(&dir, playable_prober("mp3", 45));

    let mut paths: Vec<_> = (0..45)
        .map(|i| write(&dir, &format!("track{i:02}.mp3"), &mp3_frames(30)))
        .collect();
    paths.extend((45..50).map(|i| dir.path().join(format!("missing{i}.mp3"))));

    let entries = service.validate_batch(paths, AudioFormat::Mp3).await;
    assert_eq!(entries.len(), 50);

    let unique: HashSet<_> = entries.iter().map(|entry| entry.path.clone()).collect();
    assert_eq!(unique.len(), 50);
    assert_eq!(entries.iter().filter(|entry| entry.is_ok()).count(), 45);
    assert!(entries[..45]
        .iter()
        .all(|entry| entry.result.as_ref().unwrap().is_valid));
    assert!(entries[45..]
        .iter()
        .all(|entry| matches!(entry.result, Err(FormatError::NotFound(_)))));
}
