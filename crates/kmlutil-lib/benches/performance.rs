//! Performance benchmarks for kmlutil-lib
//!
//! Run with: cargo bench --package kmlutil-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kmlutil_lib::{Config, Coordinate, Document, Region, RegionMatcher, classify, simplify};

/// Generate a wiggly track with the specified number of points
fn generate_track(num_points: usize, base_lat: f64, base_lon: f64) -> Vec<Coordinate> {
    (0..num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            let lat = base_lat + t * 0.1 + (t * 50.0).sin() * 0.001;
            let lon = base_lon + t * 0.1 + (t * 30.0).cos() * 0.001;
            Coordinate::new(lon, lat)
        })
        .collect()
}

/// Square boundary with `n` vertices per side
fn generate_region(name: &str, min_lon: f64, min_lat: f64, size: f64, n: usize) -> Region {
    let step = size / n as f64;
    let mut ring = Vec::with_capacity(4 * n + 1);
    for i in 0..n {
        ring.push(Coordinate::new(min_lon + i as f64 * step, min_lat));
    }
    for i in 0..n {
        ring.push(Coordinate::new(min_lon + size, min_lat + i as f64 * step));
    }
    for i in 0..n {
        ring.push(Coordinate::new(min_lon + size - i as f64 * step, min_lat + size));
    }
    for i in 0..n {
        ring.push(Coordinate::new(min_lon, min_lat + size - i as f64 * step));
    }
    ring.push(Coordinate::new(min_lon, min_lat));
    // Region::new only fails for an empty ring
    Region::new(name, ring).unwrap()
}

/// KML document with `num_paths` paths sharing a handful of duplicate styles
fn generate_document(num_paths: usize, points_per_path: usize) -> String {
    let mut kml = String::from("<kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>");
    for i in 0..num_paths {
        kml.push_str(&format!(
            "<Style id=\"s{i}\"><LineStyle><color>ff{:02x}0000</color><width>3</width></LineStyle></Style>",
            i % 4
        ));
    }
    for i in 0..num_paths {
        let coords: Vec<String> = generate_track(points_per_path, 51.5 + i as f64 * 0.01, -0.1)
            .iter()
            .map(|c| format!("{},{}", c.lon, c.lat))
            .collect();
        kml.push_str(&format!(
            "<Placemark><name>Path {i}</name><styleUrl>#s{i}</styleUrl><LineString><coordinates>{}</coordinates></LineString></Placemark>",
            coords.join(" ")
        ));
    }
    kml.push_str("</Document></kml>");
    kml
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_simplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplify");
    let config = Config::default();

    for &size in &[1_000usize, 50_000] {
        let track = generate_track(size, 51.5, -0.1);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("high_quality", size), &track, |b, track| {
            b.iter(|| simplify(track, config.simplify.tolerance, true));
        });
        group.bench_with_input(BenchmarkId::new("fast", size), &track, |b, track| {
            b.iter(|| simplify(track, config.simplify.tolerance, false));
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    // Track of 50k points against a 400-vertex boundary covering half of it
    let track = generate_track(50_000, 51.5, -0.1);
    let region = generate_region("Half", -0.1, 51.5, 0.05, 100);
    group.throughput(Throughput::Elements(track.len() as u64));
    group.bench_function("single_region_50k", |b| {
        b.iter(|| classify(&track, &region));
    });

    // Best of 16 boundaries for 100 short tracks
    let regions: Vec<Region> = (0..16)
        .map(|i| {
            let lon = -0.1 + (i % 4) as f64 * 0.05;
            let lat = 51.5 + (i / 4) as f64 * 0.05;
            generate_region(&format!("R{i}"), lon, lat, 0.05, 25)
        })
        .collect();
    let matcher = RegionMatcher::new(regions, Config::default().folderize.threshold);
    let tracks: Vec<Vec<Coordinate>> = (0..100)
        .map(|i| generate_track(1_000, 51.5 + (i % 10) as f64 * 0.02, -0.1 + (i / 10) as f64 * 0.02))
        .collect();
    group.sample_size(20);
    group.throughput(Throughput::Elements(100 * 1_000));
    group.bench_function("matcher_100x1k", |b| {
        b.iter(|| {
            tracks
                .iter()
                .filter_map(|t| matcher.best_match(t))
                .count()
        });
    });

    group.finish();
}

fn bench_styles(c: &mut Criterion) {
    let mut group = c.benchmark_group("styles");
    group.sample_size(20);

    let kml = generate_document(500, 20);
    let config = Config::default();
    group.bench_function("deduplicate_500", |b| {
        b.iter(|| {
            let mut doc = Document::parse(&kml).unwrap();
            kmlutil_lib::deduplicate_styles(&mut doc, &config.style)
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_simplify, bench_classify, bench_styles);

criterion_main!(benches);
