//! Basic example of checking road coverage on a single tile.
//!
//! Run with: cargo run --example basic_compare

use highway_compare::{reduce_feature, reduce_tile, Bounds, LineFeature, MatchOptions, Verdict};

fn road(id: &str, coords: &[(f64, f64)]) -> LineFeature {
    LineFeature::from_coords(Some(id), coords).with_property("highway", "residential")
}

fn main() {
    // Ground truth (Zurich area)
    let main_street = road("gt-1", &[(8.5400, 47.3700), (8.5400, 47.3720), (8.5400, 47.3740)])
        .with_property("name", "Hauptstrasse");
    let side_street = road("gt-2", &[(8.5450, 47.3700), (8.5450, 47.3740)]);
    let lost_lane = road("gt-3", &[(8.5500, 47.3700), (8.5500, 47.3740)]);

    // Candidates: main street mapped without a name, half of the side street,
    // nothing for the lane
    let osm_main = road("way/1", &[(8.5400, 47.3700), (8.5400, 47.3740)]);
    let osm_side = road("way/2", &[(8.5450, 47.3700), (8.5450, 47.3720)]);

    let options = MatchOptions::default();
    println!("Highway Compare Examples\n");
    println!(
        "Options: tolerance={}km, max angle={}°, err={}\n",
        options.tolerance_km, options.max_angle_deg, options.err
    );

    let candidates = vec![osm_main, osm_side];

    for feature in [&main_street, &side_street, &lost_lane] {
        let outcome = reduce_feature(feature, &candidates, &options);
        let verdict = match outcome.verdict {
            Verdict::Matched => "matched",
            Verdict::PartialMissing => "partially missing",
            Verdict::Missing => "missing",
        };
        println!(
            "{}: {} (coverage {:.2}, {} residual segments, candidates {:?})",
            feature.id.as_deref().unwrap_or("?"),
            verdict,
            outcome.coverage,
            outcome.residual.len(),
            outcome.matched_candidates
        );
    }

    // Whole tile at once
    let tile = Bounds::new(8.53, 47.36, 8.56, 47.38);
    let ground_truth = vec![main_street, side_street, lost_lane];
    let result = reduce_tile(&ground_truth, &candidates, &tile, &options);

    println!("\nTile summary:");
    println!("  Ground truth:      {}", result.ground_truth.len());
    println!("  Candidates:        {}", result.candidates.len());
    println!("  Partially missing: {}", result.partial_missing.len());
    println!("  Missing:           {}", result.missing.len());
    for update in &result.updates {
        println!(
            "  Update {}: {:?}",
            update.id.as_deref().unwrap_or("?"),
            update.fields
        );
    }
}
