//! Integration tests for the tempo detection engine

use tempo_dsp::{
    estimate_tempo, scan_source, DetectorConfig, ResultAggregator, ScanConfig, SliceSource,
    TempoDetector, TempoError,
};

/// Synthetic click track: evenly spaced decaying impulses at `bpm`,
/// with an accent every fourth click.
fn make_click_track(bpm: f64, sample_rate: f64, duration_seconds: f64) -> Vec<f32> {
    let sample_count = (sample_rate * duration_seconds) as usize;
    let beat_interval = (((60.0 / bpm) * sample_rate) as usize).max(1);
    let click_length = ((sample_rate * 0.015) as usize).max(1);

    let mut samples = vec![0.0f32; sample_count];
    let mut beat_index = 0usize;
    let mut sample_index = 0usize;

    while sample_index < sample_count {
        let accent: f32 = if beat_index % 4 == 0 { 1.0 } else { 0.75 };
        for click_offset in 0..click_length {
            let idx = sample_index + click_offset;
            if idx >= sample_count {
                break;
            }
            let envelope = (-(click_offset as f64) / (sample_rate * 0.003)).exp();
            samples[idx] += envelope as f32 * accent;
        }
        beat_index += 1;
        sample_index += beat_interval;
    }

    samples
}

fn best_family_error(observed_bpm: f64, source_bpm: f64) -> f64 {
    [source_bpm / 2.0, source_bpm, source_bpm * 2.0]
        .iter()
        .map(|&f| (observed_bpm - f).abs())
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn test_detected_tempo_near_expected_family() {
    let sample_rate = 48000.0f32;

    for source_bpm in [60.0, 90.0, 140.0] {
        let samples = make_click_track(source_bpm, sample_rate as f64, 40.0);
        let mut detector = TempoDetector::new(sample_rate, DetectorConfig::default());
        let detected = detector.estimate_tempo_of_samples(&samples);

        let error = best_family_error(detected, source_bpm);
        assert!(
            error <= 1.5,
            "expected family error <= 1.5 for {}, got {}",
            source_bpm,
            detected
        );
    }
}

#[test]
fn test_streaming_and_batch_are_consistent() {
    let sample_rate = 48000.0f32;
    let samples = make_click_track(96.0, sample_rate as f64, 35.0);

    let mut batch = TempoDetector::new(sample_rate, DetectorConfig::default());
    let batch_bpm = batch.estimate_tempo_of_samples(&samples);

    let mut streaming = TempoDetector::new(sample_rate, DetectorConfig::default());
    for chunk in samples.chunks(4096) {
        streaming.process(chunk);
    }
    let stream_bpm = streaming.estimate_tempo();

    assert!(
        (batch_bpm - stream_bpm).abs() < 0.75,
        "batch {} vs streaming {}",
        batch_bpm,
        stream_bpm
    );
}

#[test]
fn test_streaming_agrees_across_chunk_sizes() {
    let sample_rate = 48000.0f32;
    let samples = make_click_track(120.0, sample_rate as f64, 30.0);

    let mut reference = TempoDetector::new(sample_rate, DetectorConfig::default());
    for chunk in samples.chunks(4096) {
        reference.process(chunk);
    }
    let reference_bpm = reference.estimate_tempo();

    for chunk_size in [64usize, 523, 1000, 48000] {
        let mut detector = TempoDetector::new(sample_rate, DetectorConfig::default());
        for chunk in samples.chunks(chunk_size) {
            detector.process(chunk);
        }
        let bpm = detector.estimate_tempo();
        assert!(
            (bpm - reference_bpm).abs() < 0.25,
            "chunk size {}: {} vs reference {}",
            chunk_size,
            bpm,
            reference_bpm
        );
    }
}

#[test]
fn test_bpm_range_constrains_output() {
    let sample_rate = 48000.0f32;
    let config = DetectorConfig {
        min_bpm: 80.0,
        max_bpm: 100.0,
        ..Default::default()
    };
    let samples = make_click_track(60.0, sample_rate as f64, 30.0);

    let mut detector = TempoDetector::new(sample_rate, config.clone());
    let detected = detector.estimate_tempo_of_samples(&samples) as f32;

    assert!(
        detected == 0.0 || (detected >= config.min_bpm && detected <= config.max_bpm),
        "detected {} outside [{}, {}]",
        detected,
        config.min_bpm,
        config.max_bpm
    );

    for candidate in detector.tempo_candidates() {
        let bpm = candidate.bpm as f32;
        assert!(
            bpm >= config.min_bpm && bpm <= config.max_bpm,
            "candidate {} outside range",
            bpm
        );
    }
}

#[test]
fn test_reset_clears_tempo_candidates() {
    let sample_rate = 48000.0f32;
    let samples = make_click_track(120.0, sample_rate as f64, 25.0);

    let mut detector = TempoDetector::new(sample_rate, DetectorConfig::default());
    detector.process(&samples);
    let _ = detector.estimate_tempo();
    assert!(!detector.tempo_candidates().is_empty());

    detector.reset();
    assert!(detector.tempo_candidates().is_empty());
}

#[test]
fn test_estimate_tempo_twice_is_idempotent() {
    let sample_rate = 48000.0f32;
    let samples = make_click_track(133.0, sample_rate as f64, 30.0);

    let mut detector = TempoDetector::new(sample_rate, DetectorConfig::default());
    detector.process(&samples);

    let first = detector.estimate_tempo();
    let first_candidates = detector.tempo_candidate_bpms();
    let second = detector.estimate_tempo();

    assert_eq!(first, second);
    assert_eq!(first_candidates, detector.tempo_candidate_bpms());
}

#[test]
fn test_default_config_values() {
    let config = DetectorConfig::default();
    assert_eq!(config.min_bpm, 40.0);
    assert_eq!(config.max_bpm, 300.0);
    assert_eq!(config.beats_per_bar, 4);
    assert_eq!(config.perceptual_weighting_amount, 0.0);
    assert_eq!(config.template_blend, 0.35);
}

#[test]
fn test_aggregator_early_stop_and_mode() {
    let mut with_threshold = ResultAggregator::new(Some(4));
    assert!(!with_threshold.append(60.0));
    assert!(!with_threshold.append(60.0));
    assert!(!with_threshold.append(60.0));
    assert!(with_threshold.append(60.0));
    assert_eq!(with_threshold.most_likely(), Some(60.0));

    let mut without_threshold = ResultAggregator::new(None);
    for value in [1.0, 2.0, 2.0, 3.0] {
        assert!(!without_threshold.append(value));
    }
    assert_eq!(without_threshold.most_likely(), Some(2.0));
}

#[test]
fn test_batch_entry_point_errors() {
    assert_eq!(
        estimate_tempo(&[], 48000.0, DetectorConfig::default()),
        Err(TempoError::NoAudioData)
    );

    let silence = vec![0.0f32; 48000 * 10];
    assert_eq!(
        estimate_tempo(&silence, 48000.0, DetectorConfig::default()),
        Err(TempoError::DetectionFailed)
    );
}

#[test]
fn test_scan_long_recording_early_stop() {
    let sample_rate = 48000.0f32;
    let source_bpm = 128.0;
    let samples = make_click_track(source_bpm, sample_rate as f64, 90.0);
    let mut source = SliceSource::new(&samples, sample_rate, 9600);

    let mut last_progress = 0.0f64;
    let bpm = scan_source(
        &mut source,
        &ScanConfig::default(),
        |p| last_progress = p,
        || false,
    )
    .expect("scan should converge on a long click track");

    assert!(
        best_family_error(bpm, source_bpm) <= 1.5,
        "expected 128 family, got {}",
        bpm
    );
    // Early stop: the scan should not have needed the whole recording.
    assert!(last_progress < 1.0, "no early stop, progress {}", last_progress);
}

#[test]
fn test_scan_cancellation() {
    let sample_rate = 48000.0f32;
    let samples = make_click_track(120.0, sample_rate as f64, 30.0);
    let mut source = SliceSource::new(&samples, sample_rate, 4096);

    let mut polls = 0u32;
    let result = scan_source(
        &mut source,
        &ScanConfig::default(),
        |_| {},
        move || {
            polls += 1;
            polls > 5
        },
    );
    assert_eq!(result, Err(TempoError::Cancelled));
}

#[test]
fn test_trailing_partial_block_boundaries() {
    // Near-empty final blocks must never panic or corrupt the estimate.
    let sample_rate = 48000.0f32;
    let base = make_click_track(120.0, sample_rate as f64, 20.0);

    for extra in [1usize, 7, 100, 260, 261, 522] {
        let mut samples = base.clone();
        samples.extend(std::iter::repeat(0.0f32).take(extra));

        let mut detector = TempoDetector::new(sample_rate, DetectorConfig::default());
        detector.process(&samples);
        let bpm = detector.estimate_tempo();
        assert!(
            bpm == 0.0 || best_family_error(bpm, 120.0) <= 1.5,
            "trailing {} samples perturbed estimate to {}",
            extra,
            bpm
        );
    }
}

#[test]
fn test_very_short_input_degrades_to_sentinel() {
    let sample_rate = 48000.0f32;

    for nsamples in [0usize, 1, 10, 200, 523] {
        let samples = vec![0.25f32; nsamples];
        let mut detector = TempoDetector::new(sample_rate, DetectorConfig::default());
        detector.process(&samples);
        let bpm = detector.estimate_tempo();
        assert_eq!(bpm, 0.0, "short input of {} samples should yield 0", nsamples);
        assert!(detector.tempo_candidates().is_empty());
    }
}
